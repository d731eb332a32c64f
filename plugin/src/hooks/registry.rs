// src/hooks/registry.rs

//! # Hook Registry
//!
//! Records `(original slot → replacement)` overrides and installs them
//! through a [`HookBackend`] in one transaction per pass.
//!
//! Key responsibilities:
//! - Reject a second registration of the same slot.
//! - Install only pending entries; an entry is never patched twice.
//! - Report per-entry failures by name. Failed entries stay pending and are
//!   retried by the next install pass that covers them.

use crate::fe_log;
use crate::hooks::{FnAddr, HookError};
use log::Level;
use std::{
    ffi::c_void,
    ptr,
    sync::{
        atomic::{AtomicPtr, Ordering},
        Mutex, MutexGuard,
    },
};

/// Low-level redirection primitive. On Windows this is the host's detour
/// capability; tests use a scripted implementation.
pub trait HookBackend: Send {
    /// Queue a detour of the function whose address is currently stored in
    /// `slot`. On commit a successful backend rewrites `slot` so it reaches
    /// the original code.
    fn attach(&mut self, slot: &'static AtomicPtr<c_void>, replacement: FnAddr) -> Result<(), HookError>;

    /// Apply everything queued since the last commit.
    fn commit(&mut self) -> Result<(), HookError>;
}

#[derive(Debug)]
struct HookEntry {
    name:        &'static str,
    slot:        &'static AtomicPtr<c_void>,
    replacement: FnAddr,
    installed:   bool,
}

/// Result of one install pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallReport {
    Complete { installed: usize },
    Partial { installed: usize, failed: Vec<&'static str> },
    /// Nothing was pending.
    AlreadyInstalled,
}

impl InstallReport {
    pub fn is_success(&self) -> bool {
        !matches!(self, InstallReport::Partial { .. })
    }
}

struct Inner {
    backend: Box<dyn HookBackend>,
    entries: Vec<HookEntry>,
}

pub struct HookRegistry {
    inner: Mutex<Inner>,
}

impl HookRegistry {
    pub fn new(backend: Box<dyn HookBackend>) -> Self {
        Self { inner: Mutex::new(Inner { backend, entries: Vec::new() }) }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record an override. The slot must already hold the target address.
    pub fn register(
        &self,
        name: &'static str,
        slot: &'static AtomicPtr<c_void>,
        replacement: FnAddr,
    ) -> Result<(), HookError> {
        if slot.load(Ordering::Acquire).is_null() {
            return Err(HookError::UnboundSlot(name));
        }
        let mut inner = self.lock();
        if inner.entries.iter().any(|e| ptr::eq(e.slot, slot)) {
            return Err(HookError::AlreadyRegistered(name));
        }
        inner.entries.push(HookEntry { name, slot, replacement, installed: false });
        fe_log!(Level::Debug, "hooks", "Registered {}", name);
        Ok(())
    }

    pub fn contains(&self, slot: &'static AtomicPtr<c_void>) -> bool {
        self.lock().entries.iter().any(|e| ptr::eq(e.slot, slot))
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.lock().entries.iter().any(|e| e.name == name && e.installed)
    }

    pub fn pending(&self) -> Vec<&'static str> {
        self.lock().entries.iter().filter(|e| !e.installed).map(|e| e.name).collect()
    }

    pub fn is_installed_slot(&self, slot: &'static AtomicPtr<c_void>) -> bool {
        self.lock().entries.iter().any(|e| ptr::eq(e.slot, slot) && e.installed)
    }

    /// Install every pending entry in one backend transaction.
    pub fn install(&self) -> InstallReport {
        self.install_matching(|_| true)
    }

    /// Install the pending entries among `slots`. Pending entries of other
    /// owners are neither attached nor reported.
    pub fn install_slots(&self, slots: &[&'static AtomicPtr<c_void>]) -> InstallReport {
        self.install_matching(|slot| slots.iter().any(|s| ptr::eq(*s, slot)))
    }

    fn install_matching(&self, selected: impl Fn(&'static AtomicPtr<c_void>) -> bool) -> InstallReport {
        let mut guard = self.lock();
        let Inner { backend, entries } = &mut *guard;

        let pending: Vec<usize> =
            (0..entries.len()).filter(|&i| !entries[i].installed && selected(entries[i].slot)).collect();
        if pending.is_empty() {
            return InstallReport::AlreadyInstalled;
        }

        let mut failed = Vec::new();
        let mut queued = Vec::with_capacity(pending.len());
        for i in pending {
            let entry = &entries[i];
            let before = entry.slot.load(Ordering::Acquire);
            match backend.attach(entry.slot, entry.replacement) {
                Ok(()) => queued.push((i, before)),
                Err(e) => {
                    fe_log!(Level::Warn, "hooks", "Attach {} failed: {}", entry.name, e);
                    failed.push(entry.name);
                }
            }
        }

        if let Err(e) = backend.commit() {
            fe_log!(Level::Error, "hooks", "Hook transaction failed: {}", e);
            failed.extend(queued.drain(..).map(|(i, _)| entries[i].name));
        }

        let mut installed = 0;
        for (i, before) in queued {
            let entry = &mut entries[i];
            // The backend rewrites the slot to the trampoline; an untouched
            // slot means the detour did not take.
            if entry.slot.load(Ordering::Acquire) != before {
                entry.installed = true;
                installed += 1;
            } else {
                fe_log!(Level::Warn, "hooks", "{} was not redirected", entry.name);
                failed.push(entry.name);
            }
        }

        if failed.is_empty() {
            fe_log!(Level::Info, "hooks", "Detours installed ({})", installed);
            InstallReport::Complete { installed }
        } else {
            fe_log!(Level::Error, "hooks", "Detours partially installed, failed: {:?}", failed);
            InstallReport::Partial { installed, failed }
        }
    }
}
