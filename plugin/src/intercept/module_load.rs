// src/intercept/module_load.rs

//! # Module Load Interceptor
//!
//! Shared body of `LoadLibraryA/W` and `LoadLibraryExA/W`. The four shims
//! differ only in how they decode their path argument and which original
//! they forward to.

use crate::context::Context;
use crate::fe_log;
use crate::intercept::{guarded, TextArg};
use crate::platform::codes::ERROR_MOD_NOT_FOUND;
use crate::policy::{file_name_component, BlockList, FilterError, Verdict};
use log::Level;

/// Block-list check for library loads.
#[derive(Debug, Default)]
pub struct ModuleLoadInterceptor {
    blocked: BlockList,
}

impl ModuleLoadInterceptor {
    pub fn new(blocked: BlockList) -> Self {
        Self { blocked }
    }

    pub fn blocked(&self) -> &BlockList {
        &self.blocked
    }

    /// Decide on a requested library path. Only the file-name component
    /// matters; an undecodable file name is an evaluation failure.
    pub fn evaluate(&self, path: TextArg<'_>) -> Verdict {
        let Some(text) = path.to_string_lossy() else {
            return Verdict::EvaluationFailed(FilterError::NullArgument("lpLibFileName"));
        };
        if file_name_component(&text).contains(char::REPLACEMENT_CHARACTER) {
            return Verdict::EvaluationFailed(FilterError::InvalidEncoding("module file name"));
        }
        guarded(|| self.blocked.evaluate(&text))
    }
}

/// Filter → original → activation recheck.
///
/// On deny the original is not called, the last error becomes
/// `ERROR_MOD_NOT_FOUND` and `denied` (a null handle) is returned. On allow
/// the original's result and last error reach the caller unchanged, whatever
/// the recheck does in between.
pub fn intercept_load<H>(
    cx: &Context,
    path: TextArg<'_>,
    denied: H,
    forward: impl FnOnce() -> H,
) -> H {
    let verdict = cx.modules.evaluate(path);
    metrics::counter!("fe_module_loads_total", "verdict" => verdict.label()).increment(1);

    match &verdict {
        Verdict::Deny => {
            fe_log!(
                Level::Info,
                "loader",
                "Blocking load: {}",
                path.to_string_lossy().unwrap_or_default()
            );
            cx.platform().set_last_error(ERROR_MOD_NOT_FOUND);
            return denied;
        }
        Verdict::EvaluationFailed(e) => {
            fe_log!(Level::Warn, "loader", "Exception while filtering library: {}", e);
        }
        Verdict::Allow => {}
    }

    let handle = forward();
    let last_error = cx.platform().last_error();
    cx.recheck();
    cx.platform().set_last_error(last_error);
    handle
}
