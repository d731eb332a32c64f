// src/win/net.rs

//! Winsock and WinInet replacements, and the installers that register them
//! once `ws2_32.dll` / `wininet.dll` are resident.

use crate::activation::{ActivationTarget, ExportHookInstaller, SecondaryInstaller};
use crate::config::model::NetSettings;
use crate::hooks::{ExportHook, FnAddr, Trampoline};
use crate::intercept::network::{intercept_net, NetOp};
use crate::platform::codes::{ERROR_ACCESS_DENIED, WSAHOST_NOT_FOUND};
use crate::win::{context, narrow_arg, wide_arg};
use std::{ffi::c_void, ptr, slice};
use windows_sys::Win32::Foundation::SetLastError;
use windows_sys::Win32::Networking::WinSock::{ADDRINFOA, ADDRINFOW, HOSTENT, SOCKADDR, SOCKET, SOCKET_ERROR};

const WINSOCK: &str = "ws2_32.dll";
const WININET: &str = "wininet.dll";

type ConnectFn = unsafe extern "system" fn(SOCKET, *const SOCKADDR, i32) -> i32;
type ListenFn = unsafe extern "system" fn(SOCKET, i32) -> i32;
type GetAddrInfoAFn = unsafe extern "system" fn(*const u8, *const u8, *const ADDRINFOA, *mut *mut ADDRINFOA) -> i32;
type GetAddrInfoWFn = unsafe extern "system" fn(*const u16, *const u16, *const ADDRINFOW, *mut *mut ADDRINFOW) -> i32;
type GetHostByNameFn = unsafe extern "system" fn(*const u8) -> *mut HOSTENT;
type InternetOpenAFn = unsafe extern "system" fn(*const u8, u32, *const u8, *const u8, u32) -> *mut c_void;
type InternetOpenWFn = unsafe extern "system" fn(*const u16, u32, *const u16, *const u16, u32) -> *mut c_void;

static CONNECT: Trampoline<ConnectFn> = Trampoline::new();
static LISTEN: Trampoline<ListenFn> = Trampoline::new();
static GET_ADDR_INFO: Trampoline<GetAddrInfoAFn> = Trampoline::new();
static GET_ADDR_INFO_W: Trampoline<GetAddrInfoWFn> = Trampoline::new();
static GET_HOST_BY_NAME: Trampoline<GetHostByNameFn> = Trampoline::new();
static INTERNET_OPEN_A: Trampoline<InternetOpenAFn> = Trampoline::new();
static INTERNET_OPEN_W: Trampoline<InternetOpenWFn> = Trampoline::new();

/// Network and session units for the enabled `[Net]` switches.
pub fn installers(cfg: &NetSettings) -> Vec<Box<dyn SecondaryInstaller>> {
    let mut units: Vec<Box<dyn SecondaryInstaller>> = Vec::new();

    if cfg.needs_socket_hooks() {
        let mut socket_hooks = Vec::new();
        if cfg.block_connections {
            socket_hooks.push(ExportHook::new("connect", &CONNECT, FnAddr::from_raw(connect as usize)));
        }
        if cfg.block_listen {
            socket_hooks.push(ExportHook::new("listen", &LISTEN, FnAddr::from_raw(listen as usize)));
        }
        if cfg.block_dns_resolve {
            socket_hooks.push(ExportHook::new("getaddrinfo", &GET_ADDR_INFO, FnAddr::from_raw(getaddrinfo as usize)));
            socket_hooks.push(ExportHook::new("GetAddrInfoW", &GET_ADDR_INFO_W, FnAddr::from_raw(get_addr_info_w as usize)));
            socket_hooks.push(ExportHook::new("gethostbyname", &GET_HOST_BY_NAME, FnAddr::from_raw(gethostbyname as usize)));
        }
        units.push(Box::new(ExportHookInstaller::new(ActivationTarget::Network, WINSOCK, socket_hooks)));
    }

    if cfg.block_internet_open {
        let session_hooks = vec![
            ExportHook::new("InternetOpenA", &INTERNET_OPEN_A, FnAddr::from_raw(internet_open_a as usize)),
            ExportHook::new("InternetOpenW", &INTERNET_OPEN_W, FnAddr::from_raw(internet_open_w as usize)),
        ];
        units.push(Box::new(ExportHookInstaller::new(ActivationTarget::Session, WININET, session_hooks)));
    }
    units
}

fn fail<R>(code: u32, value: R) -> R {
    unsafe { SetLastError(code) };
    value
}

// ───── Winsock ─────

extern "system" fn connect(s: SOCKET, name: *const SOCKADDR, namelen: i32) -> i32 {
    let Some(original) = (unsafe { CONNECT.get() }) else {
        return fail(NetOp::Connect.denial_code(), SOCKET_ERROR);
    };
    let Some(cx) = context() else {
        return unsafe { original(s, name, namelen) };
    };
    let addr = (!name.is_null())
        .then(|| unsafe { slice::from_raw_parts(name.cast::<u8>(), namelen.max(0) as usize) });
    let verdict = cx.net.check_connect(addr);
    intercept_net(cx, NetOp::Connect, verdict, SOCKET_ERROR, || unsafe { original(s, name, namelen) })
}

extern "system" fn listen(s: SOCKET, backlog: i32) -> i32 {
    let Some(original) = (unsafe { LISTEN.get() }) else {
        return fail(NetOp::Listen.denial_code(), SOCKET_ERROR);
    };
    let Some(cx) = context() else {
        return unsafe { original(s, backlog) };
    };
    intercept_net(cx, NetOp::Listen, cx.net.check_listen(), SOCKET_ERROR, || unsafe { original(s, backlog) })
}

extern "system" fn getaddrinfo(
    node: *const u8,
    service: *const u8,
    hints: *const ADDRINFOA,
    result: *mut *mut ADDRINFOA,
) -> i32 {
    let Some(original) = (unsafe { GET_ADDR_INFO.get() }) else {
        return WSAHOST_NOT_FOUND as i32;
    };
    let Some(cx) = context() else {
        return unsafe { original(node, service, hints, result) };
    };
    let verdict = cx.net.check_resolve(unsafe { narrow_arg(node) });
    intercept_net(cx, NetOp::Resolve, verdict, WSAHOST_NOT_FOUND as i32, || unsafe {
        original(node, service, hints, result)
    })
}

extern "system" fn get_addr_info_w(
    node: *const u16,
    service: *const u16,
    hints: *const ADDRINFOW,
    result: *mut *mut ADDRINFOW,
) -> i32 {
    let Some(original) = (unsafe { GET_ADDR_INFO_W.get() }) else {
        return WSAHOST_NOT_FOUND as i32;
    };
    let Some(cx) = context() else {
        return unsafe { original(node, service, hints, result) };
    };
    let verdict = cx.net.check_resolve(unsafe { wide_arg(node) });
    intercept_net(cx, NetOp::Resolve, verdict, WSAHOST_NOT_FOUND as i32, || unsafe {
        original(node, service, hints, result)
    })
}

extern "system" fn gethostbyname(name: *const u8) -> *mut HOSTENT {
    let Some(original) = (unsafe { GET_HOST_BY_NAME.get() }) else {
        return fail(WSAHOST_NOT_FOUND, ptr::null_mut());
    };
    let Some(cx) = context() else {
        return unsafe { original(name) };
    };
    let verdict = cx.net.check_resolve(unsafe { narrow_arg(name) });
    intercept_net(cx, NetOp::Resolve, verdict, ptr::null_mut(), || unsafe { original(name) })
}

// ───── WinInet ─────

extern "system" fn internet_open_a(agent: *const u8, access: u32, proxy: *const u8, bypass: *const u8, flags: u32) -> *mut c_void {
    let Some(original) = (unsafe { INTERNET_OPEN_A.get() }) else {
        return fail(ERROR_ACCESS_DENIED, ptr::null_mut());
    };
    let Some(cx) = context() else {
        return unsafe { original(agent, access, proxy, bypass, flags) };
    };
    intercept_net(cx, NetOp::SessionOpen, cx.net.check_session_open(), ptr::null_mut(), || unsafe {
        original(agent, access, proxy, bypass, flags)
    })
}

extern "system" fn internet_open_w(agent: *const u16, access: u32, proxy: *const u16, bypass: *const u16, flags: u32) -> *mut c_void {
    let Some(original) = (unsafe { INTERNET_OPEN_W.get() }) else {
        return fail(ERROR_ACCESS_DENIED, ptr::null_mut());
    };
    let Some(cx) = context() else {
        return unsafe { original(agent, access, proxy, bypass, flags) };
    };
    intercept_net(cx, NetOp::SessionOpen, cx.net.check_session_open(), ptr::null_mut(), || unsafe {
        original(agent, access, proxy, bypass, flags)
    })
}
