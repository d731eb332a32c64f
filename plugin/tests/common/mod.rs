//! Scripted process for integration tests.
//!
//! - [`MockPlatform`]: a module set and export table the test controls.
//! - [`MockBackend`]: a detour backend that rewrites slots on commit and can
//!   be told to fail individual slots or whole transactions.
//! - [`CountingInstaller`]: a secondary installer that counts its runs.

#![allow(dead_code)]

use fe::activation::{ActivationTarget, InstallContext, SecondaryInstaller};
use fe::config::Settings;
use fe::context::Context;
use fe::hooks::{FnAddr, HookBackend, HookError, Trampoline};
use fe::platform::Platform;
use std::{
    collections::{HashMap, HashSet},
    ffi::c_void,
    ptr,
    sync::{
        atomic::{AtomicBool, AtomicPtr, AtomicU32, AtomicUsize, Ordering},
        Arc, Mutex, OnceLock,
    },
    thread,
    time::Duration,
};

// ───── platform ─────

#[derive(Default)]
struct PlatformState {
    resident:   Mutex<HashSet<String>>,
    exports:    Mutex<HashMap<(String, String), FnAddr>>,
    last_error: AtomicU32,
}

#[derive(Clone, Default)]
pub struct MockPlatform {
    state: Arc<PlatformState>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, module: &str) {
        self.state.resident.lock().unwrap().insert(module.to_lowercase());
    }

    pub fn export(&self, module: &str, symbol: &str, addr: usize) {
        self.state
            .exports
            .lock()
            .unwrap()
            .insert((module.to_lowercase(), symbol.to_owned()), FnAddr::from_raw(addr));
    }
}

impl Platform for MockPlatform {
    fn is_module_resident(&self, module: &str) -> bool {
        self.state.resident.lock().unwrap().contains(&module.to_lowercase())
    }

    fn resolve_export(&self, module: &str, symbol: &str) -> Option<FnAddr> {
        if !self.is_module_resident(module) {
            return None;
        }
        self.state.exports.lock().unwrap().get(&(module.to_lowercase(), symbol.to_owned())).copied()
    }

    fn last_error(&self) -> u32 {
        self.state.last_error.load(Ordering::SeqCst)
    }

    fn set_last_error(&self, code: u32) {
        self.state.last_error.store(code, Ordering::SeqCst)
    }
}

// ───── hook backend ─────

/// Address the backend writes into a slot it detoured.
pub const TRAMPOLINE_BASE: usize = 0x7000_0000;

#[derive(Default)]
struct BackendState {
    queued:      Mutex<Vec<&'static AtomicPtr<c_void>>>,
    reject:      Mutex<Vec<usize>>,
    ignore:      Mutex<Vec<usize>>,
    fail_commit: AtomicBool,
    commits:     AtomicUsize,
    patched:     AtomicUsize,
}

#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<BackendState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// `attach` on this slot returns an error.
    pub fn reject(&self, slot: &'static AtomicPtr<c_void>) {
        self.state.reject.lock().unwrap().push(slot.as_ptr() as usize);
    }

    /// `attach` succeeds but commit leaves this slot untouched.
    pub fn ignore(&self, slot: &'static AtomicPtr<c_void>) {
        self.state.ignore.lock().unwrap().push(slot.as_ptr() as usize);
    }

    pub fn heal(&self) {
        self.state.reject.lock().unwrap().clear();
        self.state.ignore.lock().unwrap().clear();
        self.state.fail_commit.store(false, Ordering::SeqCst);
    }

    pub fn fail_commit(&self) {
        self.state.fail_commit.store(true, Ordering::SeqCst);
    }

    pub fn commits(&self) -> usize {
        self.state.commits.load(Ordering::SeqCst)
    }

    /// Slots rewritten so far.
    pub fn patched(&self) -> usize {
        self.state.patched.load(Ordering::SeqCst)
    }

    pub fn boxed(&self) -> Box<dyn HookBackend> {
        Box::new(self.clone())
    }
}

impl HookBackend for MockBackend {
    fn attach(&mut self, slot: &'static AtomicPtr<c_void>, _replacement: FnAddr) -> Result<(), HookError> {
        if self.state.reject.lock().unwrap().contains(&(slot.as_ptr() as usize)) {
            return Err(HookError::Backend(-1));
        }
        self.state.queued.lock().unwrap().push(slot);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), HookError> {
        self.state.commits.fetch_add(1, Ordering::SeqCst);
        let queued: Vec<_> = self.state.queued.lock().unwrap().drain(..).collect();
        if self.state.fail_commit.load(Ordering::SeqCst) {
            return Err(HookError::Backend(-2));
        }
        let ignore = self.state.ignore.lock().unwrap().clone();
        for slot in queued {
            if ignore.contains(&(slot.as_ptr() as usize)) {
                continue;
            }
            let n = self.state.patched.fetch_add(1, Ordering::SeqCst);
            slot.store((TRAMPOLINE_BASE + n * 0x10) as *mut c_void, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// A fresh `'static` slot already pointing at `original`.
pub fn bound_slot(original: usize) -> &'static AtomicPtr<c_void> {
    Box::leak(Box::new(AtomicPtr::new(original as *mut c_void)))
}

pub fn unbound_slot() -> &'static AtomicPtr<c_void> {
    Box::leak(Box::new(AtomicPtr::new(ptr::null_mut())))
}

pub fn trampoline() -> &'static Trampoline<fn()> {
    Box::leak(Box::new(Trampoline::new()))
}

// ───── installers ─────

#[derive(Default)]
pub struct InstallerProbe {
    pub calls:     AtomicU32,
    pub successes: AtomicU32,
}

impl InstallerProbe {
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

type OnInstall = Box<dyn Fn(&InstallContext<'_>) + Send + Sync>;

pub struct CountingInstaller {
    target:     ActivationTarget,
    module:     &'static str,
    probe:      Arc<InstallerProbe>,
    fail_first: u32,
    panics:     bool,
    delay:      Duration,
    on_install: Option<OnInstall>,
}

impl CountingInstaller {
    pub fn new(target: ActivationTarget, module: &'static str) -> (Self, Arc<InstallerProbe>) {
        let probe = Arc::new(InstallerProbe::default());
        let installer = Self {
            target,
            module,
            probe: probe.clone(),
            fail_first: 0,
            panics: false,
            delay: Duration::ZERO,
            on_install: None,
        };
        (installer, probe)
    }

    /// Fail the first `n` runs.
    pub fn failing(mut self, n: u32) -> Self {
        self.fail_first = n;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn on_install(mut self, f: impl Fn(&InstallContext<'_>) + Send + Sync + 'static) -> Self {
        self.on_install = Some(Box::new(f));
        self
    }

    pub fn boxed(self) -> Box<dyn SecondaryInstaller> {
        Box::new(self)
    }
}

impl SecondaryInstaller for CountingInstaller {
    fn target(&self) -> ActivationTarget {
        self.target
    }

    fn trigger_module(&self) -> &'static str {
        self.module
    }

    fn install(&self, cx: &InstallContext<'_>) -> anyhow::Result<()> {
        let call = self.probe.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        if let Some(f) = &self.on_install {
            f(cx);
        }
        if self.panics {
            panic!("installer blew up");
        }
        if call <= self.fail_first {
            anyhow::bail!("attempt {} failed", call);
        }
        self.probe.successes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ───── context ─────

pub struct Harness {
    pub cx:       Arc<Context>,
    pub platform: MockPlatform,
    pub backend:  MockBackend,
}

pub fn harness(settings: Settings, installers: Vec<Box<dyn SecondaryInstaller>>) -> Harness {
    let platform = MockPlatform::new();
    let backend = MockBackend::new();
    let cx = Context::new(settings, backend.boxed(), Box::new(platform.clone()), installers);
    Harness { cx: Arc::new(cx), platform, backend }
}

/// Late-bound handle to a context, for installers that call back into it.
pub type ContextCell = Arc<OnceLock<Arc<Context>>>;
