//! Hook registration and installation.

pub mod registry;
pub mod trampoline;

pub use registry::{HookBackend, HookRegistry, InstallReport};
pub use trampoline::{FnAddr, Trampoline};

use crate::fe_log;
use crate::platform::Platform;
use log::Level;
use std::{
    ffi::c_void,
    sync::atomic::{AtomicPtr, Ordering},
};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HookError {
    #[error("{0} is already registered")]
    AlreadyRegistered(&'static str),

    #[error("{0} has no original address bound")]
    UnboundSlot(&'static str),

    #[error("{module}!{symbol} is not exported")]
    MissingExport { module: &'static str, symbol: &'static str },

    #[error("hook backend returned {0}")]
    Backend(i32),
}

impl HookError {
    /// Hook the error is about, if any.
    pub fn hook_name(&self) -> Option<&'static str> {
        match self {
            HookError::AlreadyRegistered(name) | HookError::UnboundSlot(name) => Some(name),
            HookError::MissingExport { symbol, .. } => Some(symbol),
            HookError::Backend(_) => None,
        }
    }
}

/// An export of a system module to redirect to `replacement`.
#[derive(Debug, Clone, Copy)]
pub struct ExportHook {
    pub symbol:      &'static str,
    pub slot:        &'static AtomicPtr<c_void>,
    pub replacement: FnAddr,
}

impl ExportHook {
    pub fn new<F: Copy>(symbol: &'static str, trampoline: &'static Trampoline<F>, replacement: FnAddr) -> Self {
        Self { symbol, slot: trampoline.slot(), replacement }
    }

    pub fn slots(hooks: &[ExportHook]) -> Vec<&'static AtomicPtr<c_void>> {
        hooks.iter().map(|h| h.slot).collect()
    }
}

/// Resolve, bind and register every hook of `module` that is not yet
/// registered. Returns the errors of the hooks that could not be registered;
/// the others are left pending for the next [`HookRegistry::install_slots`].
pub fn register_exports(
    registry: &HookRegistry,
    platform: &dyn Platform,
    module: &'static str,
    hooks: &[ExportHook],
) -> Vec<HookError> {
    let mut errors = Vec::new();
    for hook in hooks {
        if registry.contains(hook.slot) {
            continue;
        }
        let Some(original) = platform.resolve_export(module, hook.symbol) else {
            fe_log!(Level::Warn, "hooks", "{}!{} not found", module, hook.symbol);
            errors.push(HookError::MissingExport { module, symbol: hook.symbol });
            continue;
        };
        hook.slot.store(original.as_ptr(), Ordering::Release);
        if let Err(e) = registry.register(hook.symbol, hook.slot, hook.replacement) {
            errors.push(e);
        }
    }
    errors
}
