// src/win/platform.rs

use crate::hooks::FnAddr;
use crate::platform::Platform;
use crate::win::to_wide;
use std::ffi::CString;
use windows_sys::Win32::Foundation::{GetLastError, SetLastError};
use windows_sys::Win32::System::LibraryLoader::{GetModuleHandleW, GetProcAddress};

/// [`Platform`] over the live process.
#[derive(Debug, Default)]
pub struct Win32Platform;

impl Platform for Win32Platform {
    fn is_module_resident(&self, module: &str) -> bool {
        let name = to_wide(module);
        // GetModuleHandleW never loads; it only looks up mapped modules.
        !unsafe { GetModuleHandleW(name.as_ptr()) }.is_null()
    }

    fn resolve_export(&self, module: &str, symbol: &str) -> Option<FnAddr> {
        let name = to_wide(module);
        let handle = unsafe { GetModuleHandleW(name.as_ptr()) };
        if handle.is_null() {
            return None;
        }
        let symbol = CString::new(symbol).ok()?;
        let proc = unsafe { GetProcAddress(handle, symbol.as_ptr().cast()) }?;
        Some(FnAddr::from_raw(proc as usize))
    }

    fn last_error(&self) -> u32 {
        unsafe { GetLastError() }
    }

    fn set_last_error(&self, code: u32) {
        unsafe { SetLastError(code) }
    }
}
