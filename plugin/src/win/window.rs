// src/win/window.rs

//! user32 replacements for the window filter.

use crate::activation::{ActivationTarget, ExportHookInstaller, SecondaryInstaller};
use crate::config::model::WindowSettings;
use crate::context::Context;
use crate::hooks::{ExportHook, FnAddr, Trampoline};
use crate::intercept::window::{ClipAction, Rect, Size};
use crate::win::context;
use std::{ffi::c_void, mem, ptr};
use windows_sys::Win32::Foundation::{BOOL, HINSTANCE, HWND, POINT, RECT};
use windows_sys::Win32::Graphics::Gdi::{
    GetMonitorInfoW, MonitorFromPoint, MonitorFromWindow, HMONITOR, MONITORINFO,
    MONITOR_DEFAULTTONEAREST, MONITOR_DEFAULTTOPRIMARY,
};
use windows_sys::Win32::UI::WindowsAndMessaging::{GetForegroundWindow, CW_USEDEFAULT, HMENU};

const USER32: &str = "user32.dll";

type CreateWindowExAFn = unsafe extern "system" fn(
    u32, *const u8, *const u8, u32, i32, i32, i32, i32, HWND, HMENU, HINSTANCE, *const c_void,
) -> HWND;
type CreateWindowExWFn = unsafe extern "system" fn(
    u32, *const u16, *const u16, u32, i32, i32, i32, i32, HWND, HMENU, HINSTANCE, *const c_void,
) -> HWND;
type SetWindowPosFn = unsafe extern "system" fn(HWND, HWND, i32, i32, i32, i32, u32) -> BOOL;
type GetRectFn = unsafe extern "system" fn(HWND, *mut RECT) -> BOOL;
type ClipCursorFn = unsafe extern "system" fn(*const RECT) -> BOOL;
type DestroyWindowFn = unsafe extern "system" fn(HWND) -> BOOL;

static CREATE_WINDOW_EX_A: Trampoline<CreateWindowExAFn> = Trampoline::new();
static CREATE_WINDOW_EX_W: Trampoline<CreateWindowExWFn> = Trampoline::new();
static SET_WINDOW_POS: Trampoline<SetWindowPosFn> = Trampoline::new();
static GET_WINDOW_RECT: Trampoline<GetRectFn> = Trampoline::new();
static GET_CLIENT_RECT: Trampoline<GetRectFn> = Trampoline::new();
static CLIP_CURSOR: Trampoline<ClipCursorFn> = Trampoline::new();
static DESTROY_WINDOW: Trampoline<DestroyWindowFn> = Trampoline::new();

pub fn installers(cfg: &WindowSettings) -> Vec<Box<dyn SecondaryInstaller>> {
    if !cfg.needs_hooks() {
        return Vec::new();
    }
    let hooks = vec![
        ExportHook::new("CreateWindowExA", &CREATE_WINDOW_EX_A, FnAddr::from_raw(create_window_ex_a as usize)),
        ExportHook::new("CreateWindowExW", &CREATE_WINDOW_EX_W, FnAddr::from_raw(create_window_ex_w as usize)),
        ExportHook::new("SetWindowPos", &SET_WINDOW_POS, FnAddr::from_raw(set_window_pos as usize)),
        ExportHook::new("GetWindowRect", &GET_WINDOW_RECT, FnAddr::from_raw(get_window_rect as usize)),
        ExportHook::new("GetClientRect", &GET_CLIENT_RECT, FnAddr::from_raw(get_client_rect as usize)),
        ExportHook::new("ClipCursor", &CLIP_CURSOR, FnAddr::from_raw(clip_cursor as usize)),
        ExportHook::new("DestroyWindow", &DESTROY_WINDOW, FnAddr::from_raw(destroy_window as usize)),
    ];
    vec![Box::new(ExportHookInstaller::new(ActivationTarget::Window, USER32, hooks))]
}

// ───── helpers ─────

fn to_rect(r: &RECT) -> Rect {
    Rect { left: r.left, top: r.top, right: r.right, bottom: r.bottom }
}

fn to_native(r: Rect) -> RECT {
    RECT { left: r.left, top: r.top, right: r.right, bottom: r.bottom }
}

fn monitor_bounds(monitor: HMONITOR) -> Option<Rect> {
    if monitor.is_null() {
        return None;
    }
    let mut info: MONITORINFO = unsafe { mem::zeroed() };
    info.cbSize = mem::size_of::<MONITORINFO>() as u32;
    (unsafe { GetMonitorInfoW(monitor, &mut info) } != 0).then(|| to_rect(&info.rcMonitor))
}

fn monitor_of_window(hwnd: HWND) -> Option<Rect> {
    monitor_bounds(unsafe { MonitorFromWindow(hwnd, MONITOR_DEFAULTTONEAREST) })
}

fn monitor_of_point(x: i32, y: i32) -> Option<Rect> {
    let flags = if x == CW_USEDEFAULT { MONITOR_DEFAULTTOPRIMARY } else { MONITOR_DEFAULTTONEAREST };
    monitor_bounds(unsafe { MonitorFromPoint(POINT { x, y }, flags) })
}

/// Shared body of both `CreateWindowEx` variants. `forward` receives the
/// (possibly rewritten) style, ex-style and `x, y, width, height`.
fn create_window(
    cx: &Context,
    ex_style: u32,
    style: u32,
    geometry: [i32; 4],
    forward: impl FnOnce(u32, u32, [i32; 4]) -> HWND,
) -> HWND {
    let Some((new_style, new_ex)) = cx.window.creation_style(style, ex_style) else {
        let hwnd = forward(style, ex_style, geometry);
        // Handle values are recycled.
        if !hwnd.is_null() {
            cx.window.untrack(hwnd as usize);
        }
        return hwnd;
    };
    let [x, y, width, height] = geometry;
    let monitor = monitor_of_point(x, y);
    let placed = match cx.window.creation_geometry(style, monitor) {
        Some(r) => [r.left, r.top, r.width(), r.height()],
        None => geometry,
    };

    let hwnd = forward(new_style, new_ex, placed);
    if !hwnd.is_null() {
        let requested = match monitor {
            Some(m) if width == CW_USEDEFAULT => m.size(),
            _ => Size { width: width.max(0), height: height.max(0) },
        };
        cx.window.track(hwnd as usize, requested);
    }
    hwnd
}

// ───── replacements ─────

extern "system" fn create_window_ex_a(
    ex_style: u32, class: *const u8, title: *const u8, style: u32,
    x: i32, y: i32, width: i32, height: i32,
    parent: HWND, menu: HMENU, instance: HINSTANCE, param: *const c_void,
) -> HWND {
    let Some(original) = (unsafe { CREATE_WINDOW_EX_A.get() }) else {
        return ptr::null_mut();
    };
    let Some(cx) = context() else {
        return unsafe { original(ex_style, class, title, style, x, y, width, height, parent, menu, instance, param) };
    };
    create_window(cx, ex_style, style, [x, y, width, height], |s, e, [x, y, w, h]| unsafe {
        original(e, class, title, s, x, y, w, h, parent, menu, instance, param)
    })
}

extern "system" fn create_window_ex_w(
    ex_style: u32, class: *const u16, title: *const u16, style: u32,
    x: i32, y: i32, width: i32, height: i32,
    parent: HWND, menu: HMENU, instance: HINSTANCE, param: *const c_void,
) -> HWND {
    let Some(original) = (unsafe { CREATE_WINDOW_EX_W.get() }) else {
        return ptr::null_mut();
    };
    let Some(cx) = context() else {
        return unsafe { original(ex_style, class, title, style, x, y, width, height, parent, menu, instance, param) };
    };
    create_window(cx, ex_style, style, [x, y, width, height], |s, e, [x, y, w, h]| unsafe {
        original(e, class, title, s, x, y, w, h, parent, menu, instance, param)
    })
}

extern "system" fn set_window_pos(hwnd: HWND, after: HWND, x: i32, y: i32, width: i32, height: i32, flags: u32) -> BOOL {
    let Some(original) = (unsafe { SET_WINDOW_POS.get() }) else {
        return 0;
    };
    let Some(cx) = context() else {
        return unsafe { original(hwnd, after, x, y, width, height, flags) };
    };
    let requested = Rect::from_xywh(x, y, width, height);
    let placed = if cx.window.is_tracked(hwnd as usize) {
        cx.window.placement(hwnd as usize, requested, monitor_of_window(hwnd), flags)
    } else {
        None
    };
    match placed {
        Some(r) => unsafe { original(hwnd, after, r.left, r.top, r.width(), r.height(), flags) },
        None => unsafe { original(hwnd, after, x, y, width, height, flags) },
    }
}

extern "system" fn get_window_rect(hwnd: HWND, out: *mut RECT) -> BOOL {
    let Some(original) = (unsafe { GET_WINDOW_RECT.get() }) else {
        return 0;
    };
    let ok = unsafe { original(hwnd, out) };
    if ok == 0 || out.is_null() {
        return ok;
    }
    if let Some(cx) = context() {
        let actual = to_rect(unsafe { &*out });
        if let Some(reported) = cx.window.reported_window_rect(hwnd as usize, actual) {
            unsafe { *out = to_native(reported) };
        }
    }
    ok
}

extern "system" fn get_client_rect(hwnd: HWND, out: *mut RECT) -> BOOL {
    let Some(original) = (unsafe { GET_CLIENT_RECT.get() }) else {
        return 0;
    };
    let ok = unsafe { original(hwnd, out) };
    if ok == 0 || out.is_null() {
        return ok;
    }
    if let Some(reported) = context().and_then(|cx| cx.window.reported_client_rect(hwnd as usize)) {
        unsafe { *out = to_native(reported) };
    }
    ok
}

extern "system" fn clip_cursor(rect: *const RECT) -> BOOL {
    let Some(original) = (unsafe { CLIP_CURSOR.get() }) else {
        return 0;
    };
    let Some(cx) = context() else {
        return unsafe { original(rect) };
    };
    let requested = (!rect.is_null()).then(|| to_rect(unsafe { &*rect }));
    let monitor = monitor_of_window(unsafe { GetForegroundWindow() });
    match cx.window.cursor_clip(requested, monitor) {
        ClipAction::PassThrough => unsafe { original(rect) },
        ClipAction::Release => unsafe { original(ptr::null()) },
        ClipAction::Clip(r) => {
            let native = to_native(r);
            unsafe { original(&native) }
        }
    }
}

extern "system" fn destroy_window(hwnd: HWND) -> BOOL {
    let Some(original) = (unsafe { DESTROY_WINDOW.get() }) else {
        return 0;
    };
    let Some(cx) = context() else {
        return unsafe { original(hwnd) };
    };
    let size = cx.window.untrack(hwnd as usize);
    let ok = unsafe { original(hwnd) };
    if let (0, Some(size)) = (ok, size) {
        cx.window.track(hwnd as usize, size);
    }
    ok
}
