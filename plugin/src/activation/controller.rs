// src/activation/controller.rs

use crate::activation::{ActivationState, ActivationTarget, InstallContext, SecondaryInstaller};
use crate::config::types::InstallRetry;
use crate::fe_log;
use anyhow::anyhow;
use crossbeam::atomic::AtomicCell;
use log::Level;
use std::{
    cell::Cell,
    panic::{self, AssertUnwindSafe},
    sync::atomic::{AtomicBool, AtomicU32, Ordering},
};

thread_local! {
    static IN_RECHECK: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as running a recheck pass. A load issued by an
/// installer on the same thread then skips its own recheck instead of
/// re-entering the registry lock.
struct RecheckGuard;

impl RecheckGuard {
    fn enter() -> Option<Self> {
        IN_RECHECK.with(|flag| {
            if flag.get() {
                None
            } else {
                flag.set(true);
                Some(RecheckGuard)
            }
        })
    }
}

impl Drop for RecheckGuard {
    fn drop(&mut self) {
        IN_RECHECK.with(|flag| flag.set(false));
    }
}

/// One activation unit.
pub struct Activation {
    installer: Box<dyn SecondaryInstaller>,
    state:     AtomicCell<ActivationState>,
    in_flight: AtomicBool,
    attempts:  AtomicU32,
    abandoned: AtomicBool,
}

impl Activation {
    pub fn new(installer: Box<dyn SecondaryInstaller>) -> Self {
        Self {
            installer,
            state:     AtomicCell::new(ActivationState::NotLoaded),
            in_flight: AtomicBool::new(false),
            attempts:  AtomicU32::new(0),
            abandoned: AtomicBool::new(false),
        }
    }

    pub fn target(&self) -> ActivationTarget {
        self.installer.target()
    }

    pub fn state(&self) -> ActivationState {
        self.state.load()
    }

    /// Installer runs so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Acquire)
    }

    pub fn is_abandoned(&self) -> bool {
        self.abandoned.load(Ordering::Acquire)
    }

    fn recheck(&self, cx: &InstallContext<'_>, retry: InstallRetry) {
        match self.state.load() {
            ActivationState::HooksInstalled => return,
            ActivationState::NotLoaded => {
                let module = self.installer.trigger_module();
                if !cx.platform.is_module_resident(module) {
                    return;
                }
                if self
                    .state
                    .compare_exchange(ActivationState::NotLoaded, ActivationState::Loaded)
                    .is_ok()
                {
                    fe_log!(Level::Info, "activation", "{} resident, activating {}", module, self.target());
                }
            }
            ActivationState::Loaded => {}
        }

        if self.is_abandoned() {
            return;
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        // Another thread may have finished between the state load and the
        // flag acquisition.
        if self.state.load() == ActivationState::HooksInstalled || self.is_abandoned() {
            self.in_flight.store(false, Ordering::Release);
            return;
        }

        self.run_installer(cx, retry);
        self.in_flight.store(false, Ordering::Release);
    }

    fn run_installer(&self, cx: &InstallContext<'_>, retry: InstallRetry) {
        let attempt = self.attempts.fetch_add(1, Ordering::AcqRel) + 1;
        let target = self.target();

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.installer.install(cx)))
            .unwrap_or_else(|_| Err(anyhow!("installer panicked")));

        match result {
            Ok(()) => {
                self.state.store(ActivationState::HooksInstalled);
                metrics::counter!("fe_secondary_installs_total", "target" => target.label(), "result" => "ok")
                    .increment(1);
                fe_log!(Level::Info, "activation", "{} hooks installed", target);
            }
            Err(e) => {
                metrics::counter!("fe_secondary_installs_total", "target" => target.label(), "result" => "error")
                    .increment(1);
                fe_log!(Level::Error, "activation", "Failed to install {} hooks (attempt {}): {:#}", target, attempt, e);
                if !retry.allows_retry(attempt) {
                    self.abandoned.store(true, Ordering::Release);
                    fe_log!(Level::Warn, "activation", "{} stays inactive", target);
                }
            }
        }
    }
}

/// All activation units of the process.
pub struct ActivationController {
    units: Vec<Activation>,
    retry: InstallRetry,
}

impl ActivationController {
    pub fn new(installers: Vec<Box<dyn SecondaryInstaller>>, retry: InstallRetry) -> Self {
        Self { units: installers.into_iter().map(Activation::new).collect(), retry }
    }

    /// Check every unit against the current module set. Non-blocking: a
    /// unit whose installer is already running elsewhere is skipped, and a
    /// nested call on the same thread returns at once.
    pub fn recheck_all(&self, cx: &InstallContext<'_>) {
        let Some(_guard) = RecheckGuard::enter() else {
            return;
        };
        for unit in &self.units {
            unit.recheck(cx, self.retry);
        }
    }

    pub fn unit(&self, target: ActivationTarget) -> Option<&Activation> {
        self.units.iter().find(|u| u.target() == target)
    }

    pub fn state(&self, target: ActivationTarget) -> Option<ActivationState> {
        self.unit(target).map(Activation::state)
    }

    pub fn states(&self) -> Vec<(ActivationTarget, ActivationState)> {
        self.units.iter().map(|u| (u.target(), u.state())).collect()
    }
}
