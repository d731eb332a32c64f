// src/win/entry.rs

//! Host ABI and the exported `Initialize`.

use crate::activation::{ApiFamily, LoggingPipeline};
use crate::bootstrap::{self, PluginError};
use crate::fe_log;
use crate::hooks::{FnAddr, HookBackend, HookError};
use crate::win::{context, loader, net, platform::Win32Platform, wide_arg, window, CONTEXT};
use log::Level;
use std::{
    ffi::{c_char, c_void, CString},
    panic::{self, AssertUnwindSafe},
    path::PathBuf,
    sync::{atomic::AtomicPtr, Arc},
};

/// ABI revision this build understands.
pub const HOST_ABI_VERSION: u32 = 1;

pub type HostLogFn = unsafe extern "C" fn(*const c_char, ...);

/// What the plugin host hands to `Initialize`.
#[repr(C)]
pub struct HostApi {
    pub abi_version:    u32,
    /// 0 unknown, 1 D3D9, 2 DXGI
    pub api_family:     u32,
    /// NUL-terminated UTF-16 directory of the host executable.
    pub executable_dir: *const u16,
    pub hooks:          *const HostHooks,
    pub log:            Option<HostLogFn>,
}

/// The host's detour capability.
#[repr(C)]
pub struct HostHooks {
    pub ctx:      *mut c_void,
    /// Queue a detour of `*slot` to `replacement`; 0 on success.
    pub register: unsafe extern "C" fn(ctx: *mut c_void, slot: *mut *mut c_void, replacement: *mut c_void) -> i32,
    /// Apply everything queued; 0 on success.
    pub install:  unsafe extern "C" fn(ctx: *mut c_void) -> i32,
}

/// [`HookBackend`] over [`HostHooks`].
struct HostBackend {
    ctx:      usize,
    register: unsafe extern "C" fn(*mut c_void, *mut *mut c_void, *mut c_void) -> i32,
    install:  unsafe extern "C" fn(*mut c_void) -> i32,
}

impl HostBackend {
    fn new(hooks: &HostHooks) -> Self {
        Self { ctx: hooks.ctx as usize, register: hooks.register, install: hooks.install }
    }
}

impl HookBackend for HostBackend {
    fn attach(&mut self, slot: &'static AtomicPtr<c_void>, replacement: FnAddr) -> Result<(), HookError> {
        match unsafe { (self.register)(self.ctx as *mut c_void, slot.as_ptr(), replacement.as_ptr()) } {
            0 => Ok(()),
            code => Err(HookError::Backend(code)),
        }
    }

    fn commit(&mut self) -> Result<(), HookError> {
        match unsafe { (self.install)(self.ctx as *mut c_void) } {
            0 => Ok(()),
            code => Err(HookError::Backend(code)),
        }
    }
}

/// Forward formatted records to the host's own log.
fn host_sink(log: HostLogFn) -> fern::Output {
    fern::Output::call(move |record| {
        let line = format!("[FE] {}", record.args()).replace('\0', " ");
        if let Ok(line) = CString::new(line) {
            unsafe { log(c"%s\n".as_ptr(), line.as_ptr()) };
        }
    })
}

fn initialize(host: *const HostApi) -> Result<(), PluginError> {
    // 1 ─ Host ABI
    let host = unsafe { host.as_ref() }.ok_or(PluginError::NullHost("host API"))?;
    if host.abi_version != HOST_ABI_VERSION {
        return Err(PluginError::AbiMismatch { expected: HOST_ABI_VERSION, found: host.abi_version });
    }
    let hooks = unsafe { host.hooks.as_ref() }.ok_or(PluginError::NullHost("hook table"))?;
    if context().is_some() {
        return Err(PluginError::AlreadyInitialized);
    }
    let exe_dir = unsafe { wide_arg(host.executable_dir) }
        .to_string_lossy()
        .map(PathBuf::from)
        .ok_or(PluginError::NullHost("executable directory"))?;

    // 2 ─ Config & logging
    let settings = bootstrap::load_settings(&exe_dir, host.log.map(host_sink));

    // 3 ─ Context
    let mut installers = net::installers(&settings.net);
    installers.extend(window::installers(&settings.window));
    let cx = bootstrap::build_context(
        settings,
        ApiFamily::from_raw(host.api_family),
        Arc::new(LoggingPipeline),
        Box::new(HostBackend::new(hooks)),
        Box::new(Win32Platform),
        installers,
    );
    CONTEXT.set(cx).map_err(|_| PluginError::AlreadyInitialized)?;

    // 4 ─ Load interception + first recheck
    let cx = context().ok_or(PluginError::AlreadyInitialized)?;
    bootstrap::attach(cx, loader::MODULE, &loader::base_hooks());
    Ok(())
}

/// Plugin entry point called by the host after injection.
#[allow(non_snake_case)]
#[unsafe(no_mangle)]
pub extern "C" fn Initialize(host: *const HostApi) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| initialize(host))) {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            fe_log!(Level::Error, "bootstrap", "Initialize failed: {}", e);
            false
        }
        Err(_) => {
            fe_log!(Level::Error, "bootstrap", "Initialize panicked");
            false
        }
    }
}
