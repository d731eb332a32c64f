// src/win/mod.rs

//! Win32 side of the plugin: the exported entry point, the OS-backed
//! [`Platform`](crate::platform::Platform) and the `extern "system"`
//! replacement functions.
//!
//! A replacement cannot take extra arguments, so the shims reach the
//! [`Context`] through the one process-global below. Before it is set (or if
//! attach failed) every shim forwards straight to the original.

mod entry;
mod loader;
mod net;
mod platform;
mod window;

use crate::context::Context;
use crate::intercept::TextArg;
use once_cell::sync::OnceCell;
use std::ffi::CStr;

static CONTEXT: OnceCell<Context> = OnceCell::new();

fn context() -> Option<&'static Context> {
    CONTEXT.get()
}

/// Longest string we are willing to scan for a terminator.
const MAX_TEXT_UNITS: usize = 32 * 1024;

/// Borrow a NUL-terminated ANSI string argument.
///
/// # Safety
/// `p` must be null or point to a NUL-terminated string that outlives `'a`.
unsafe fn narrow_arg<'a>(p: *const u8) -> TextArg<'a> {
    if p.is_null() {
        return TextArg::Null;
    }
    // SAFETY: non-null and NUL-terminated per the caller.
    TextArg::Narrow(unsafe { CStr::from_ptr(p.cast()) }.to_bytes())
}

/// Borrow a NUL-terminated UTF-16 string argument.
///
/// # Safety
/// `p` must be null or point to a NUL-terminated wide string that outlives
/// `'a`.
unsafe fn wide_arg<'a>(p: *const u16) -> TextArg<'a> {
    if p.is_null() {
        return TextArg::Null;
    }
    let mut len = 0;
    // SAFETY: every unit up to and including the terminator is readable.
    while len < MAX_TEXT_UNITS && unsafe { *p.add(len) } != 0 {
        len += 1;
    }
    TextArg::Wide(unsafe { std::slice::from_raw_parts(p, len) })
}

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}
