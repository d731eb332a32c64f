//! OS services used by the interception core.
//!
//! The decision logic only ever talks to the process through [`Platform`],
//! so it runs unchanged against the Win32 implementation in `win` and
//! against scripted processes in tests.

use crate::hooks::FnAddr;

pub trait Platform: Send + Sync {
    /// Whether `module` is already mapped in the process. Must not load it.
    fn is_module_resident(&self, module: &str) -> bool;

    /// Address of `symbol` in the resident `module`.
    fn resolve_export(&self, module: &str, symbol: &str) -> Option<FnAddr>;

    /// The calling thread's last-error value.
    fn last_error(&self) -> u32;

    fn set_last_error(&self, code: u32);
}

/// Host-visible error codes the shims report on denial.
pub mod codes {
    /// `ERROR_ACCESS_DENIED`
    pub const ERROR_ACCESS_DENIED: u32 = 5;
    /// `ERROR_MOD_NOT_FOUND`
    pub const ERROR_MOD_NOT_FOUND: u32 = 126;
    /// `WSAEACCES`
    pub const WSAEACCES: u32 = 10013;
    /// `WSAECONNREFUSED`
    pub const WSAECONNREFUSED: u32 = 10061;
    /// `WSAHOST_NOT_FOUND`
    pub const WSAHOST_NOT_FOUND: u32 = 11001;
}
