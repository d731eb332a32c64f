// src/win/loader.rs

//! `LoadLibraryA/W` and `LoadLibraryExA/W` replacements.

use crate::hooks::{ExportHook, FnAddr, Trampoline};
use crate::intercept::module_load::intercept_load;
use crate::platform::codes::ERROR_MOD_NOT_FOUND;
use crate::win::{context, narrow_arg, wide_arg};
use std::ptr;
use windows_sys::Win32::Foundation::{HANDLE, HMODULE, SetLastError};

pub const MODULE: &str = "kernel32.dll";

type LoadLibraryAFn = unsafe extern "system" fn(*const u8) -> HMODULE;
type LoadLibraryWFn = unsafe extern "system" fn(*const u16) -> HMODULE;
type LoadLibraryExAFn = unsafe extern "system" fn(*const u8, HANDLE, u32) -> HMODULE;
type LoadLibraryExWFn = unsafe extern "system" fn(*const u16, HANDLE, u32) -> HMODULE;

static LOAD_LIBRARY_A: Trampoline<LoadLibraryAFn> = Trampoline::new();
static LOAD_LIBRARY_W: Trampoline<LoadLibraryWFn> = Trampoline::new();
static LOAD_LIBRARY_EX_A: Trampoline<LoadLibraryExAFn> = Trampoline::new();
static LOAD_LIBRARY_EX_W: Trampoline<LoadLibraryExWFn> = Trampoline::new();

pub fn base_hooks() -> Vec<ExportHook> {
    vec![
        ExportHook::new("LoadLibraryA", &LOAD_LIBRARY_A, FnAddr::from_raw(load_library_a as usize)),
        ExportHook::new("LoadLibraryW", &LOAD_LIBRARY_W, FnAddr::from_raw(load_library_w as usize)),
        ExportHook::new("LoadLibraryExA", &LOAD_LIBRARY_EX_A, FnAddr::from_raw(load_library_ex_a as usize)),
        ExportHook::new("LoadLibraryExW", &LOAD_LIBRARY_EX_W, FnAddr::from_raw(load_library_ex_w as usize)),
    ]
}

/// Shape of a load that could not reach the original.
fn unbound() -> HMODULE {
    unsafe { SetLastError(ERROR_MOD_NOT_FOUND) };
    ptr::null_mut()
}

extern "system" fn load_library_a(file: *const u8) -> HMODULE {
    let Some(original) = (unsafe { LOAD_LIBRARY_A.get() }) else {
        return unbound();
    };
    let Some(cx) = context() else {
        return unsafe { original(file) };
    };
    intercept_load(cx, unsafe { narrow_arg(file) }, ptr::null_mut(), || unsafe { original(file) })
}

extern "system" fn load_library_w(file: *const u16) -> HMODULE {
    let Some(original) = (unsafe { LOAD_LIBRARY_W.get() }) else {
        return unbound();
    };
    let Some(cx) = context() else {
        return unsafe { original(file) };
    };
    intercept_load(cx, unsafe { wide_arg(file) }, ptr::null_mut(), || unsafe { original(file) })
}

extern "system" fn load_library_ex_a(file: *const u8, reserved: HANDLE, flags: u32) -> HMODULE {
    let Some(original) = (unsafe { LOAD_LIBRARY_EX_A.get() }) else {
        return unbound();
    };
    let Some(cx) = context() else {
        return unsafe { original(file, reserved, flags) };
    };
    intercept_load(cx, unsafe { narrow_arg(file) }, ptr::null_mut(), || unsafe {
        original(file, reserved, flags)
    })
}

extern "system" fn load_library_ex_w(file: *const u16, reserved: HANDLE, flags: u32) -> HMODULE {
    let Some(original) = (unsafe { LOAD_LIBRARY_EX_W.get() }) else {
        return unbound();
    };
    let Some(cx) = context() else {
        return unsafe { original(file, reserved, flags) };
    };
    intercept_load(cx, unsafe { wide_arg(file) }, ptr::null_mut(), || unsafe {
        original(file, reserved, flags)
    })
}
