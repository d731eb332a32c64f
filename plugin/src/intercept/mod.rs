//! Platform-neutral bodies of the wrapped entry points.
//!
//! Each `intercept_*` function takes the decoded arguments, a "denied" value
//! in the shape the native call returns on failure, and a closure that calls
//! the original. The closure runs exactly once on the allow path and never
//! on the deny path.

pub mod module_load;
pub mod network;
pub mod window;

use crate::policy::{FilterError, Verdict};
use std::panic::{self, AssertUnwindSafe};

/// A string argument as the host passed it.
#[derive(Debug, Clone, Copy)]
pub enum TextArg<'a> {
    Null,
    /// ANSI / UTF-8 bytes, without the terminating NUL.
    Narrow(&'a [u8]),
    /// UTF-16 code units, without the terminating NUL.
    Wide(&'a [u16]),
}

impl TextArg<'_> {
    /// Lossy decode; `None` for a null argument.
    pub fn to_string_lossy(&self) -> Option<String> {
        match self {
            TextArg::Null => None,
            TextArg::Narrow(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            TextArg::Wide(units) => Some(String::from_utf16_lossy(units)),
        }
    }
}

/// Run a policy evaluation, turning a panic into `EvaluationFailed`.
pub(crate) fn guarded(evaluate: impl FnOnce() -> Verdict) -> Verdict {
    panic::catch_unwind(AssertUnwindSafe(evaluate))
        .unwrap_or(Verdict::EvaluationFailed(FilterError::Internal))
}
