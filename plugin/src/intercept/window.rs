// src/intercept/window.rs

//! # Window Filter
//!
//! Geometry transforms behind `CreateWindowExA/W`, `SetWindowPos`,
//! `GetWindowRect`, `GetClientRect` and `ClipCursor`.
//!
//! Key responsibilities:
//! - ForceBorderless: strip frame styles from top-level windows and stretch
//!   them over their monitor.
//! - BorderlessUpscaling: keep reporting the size the application asked for.
//! - CursorFix: keep cursor confinement on the window's monitor, or drop it.
//!
//! Every method returns `None` (or `PassThrough`) when the call should reach
//! the original unchanged.

use crate::config::model::WindowSettings;
use crate::config::types::CursorFix;
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

// ───── Win32 style bits ─────

pub const WS_POPUP: u32       = 0x8000_0000;
pub const WS_CHILD: u32       = 0x4000_0000;
pub const WS_CAPTION: u32     = 0x00C0_0000;
pub const WS_BORDER: u32      = 0x0080_0000;
pub const WS_DLGFRAME: u32    = 0x0040_0000;
pub const WS_SYSMENU: u32     = 0x0008_0000;
pub const WS_THICKFRAME: u32  = 0x0004_0000;
pub const WS_MINIMIZEBOX: u32 = 0x0002_0000;
pub const WS_MAXIMIZEBOX: u32 = 0x0001_0000;

pub const WS_EX_DLGMODALFRAME: u32 = 0x0000_0001;
pub const WS_EX_WINDOWEDGE: u32    = 0x0000_0100;
pub const WS_EX_CLIENTEDGE: u32    = 0x0000_0200;
pub const WS_EX_STATICEDGE: u32    = 0x0002_0000;

pub const SWP_NOSIZE: u32 = 0x0001;
pub const SWP_NOMOVE: u32 = 0x0002;

const FRAME_STYLES: u32 = WS_CAPTION
    | WS_BORDER
    | WS_DLGFRAME
    | WS_SYSMENU
    | WS_THICKFRAME
    | WS_MINIMIZEBOX
    | WS_MAXIMIZEBOX;

const EDGE_EX_STYLES: u32 =
    WS_EX_DLGMODALFRAME | WS_EX_WINDOWEDGE | WS_EX_CLIENTEDGE | WS_EX_STATICEDGE;

// ───── geometry ─────

/// Same layout as the Win32 `RECT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left:   i32,
    pub top:    i32,
    pub right:  i32,
    pub bottom: i32,
}

impl Rect {
    pub fn from_xywh(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { left: x, top: y, right: x.saturating_add(width), bottom: y.saturating_add(height) }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn size(&self) -> Size {
        Size { width: self.width(), height: self.height() }
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let r = Rect {
            left:   self.left.max(other.left),
            top:    self.top.max(other.top),
            right:  self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
        };
        (!r.is_empty()).then_some(r)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width:  i32,
    pub height: i32,
}

/// What `ClipCursor` should forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipAction {
    PassThrough,
    Clip(Rect),
    /// Forward a null rectangle.
    Release,
}

// ───── filter ─────

#[derive(Debug, Default)]
pub struct WindowFilter {
    force_borderless: bool,
    upscaling:        bool,
    cursor:           CursorFix,
    /// Top-level windows we restyled, keyed by handle, with the client size
    /// the application last asked for.
    tracked:          Mutex<HashMap<usize, Size>>,
}

impl WindowFilter {
    pub fn new(cfg: &WindowSettings) -> Self {
        Self {
            force_borderless: cfg.force_borderless,
            upscaling:        cfg.borderless_upscaling,
            cursor:           cfg.cursor_fix,
            tracked:          Mutex::new(HashMap::new()),
        }
    }

    fn tracked(&self) -> MutexGuard<'_, HashMap<usize, Size>> {
        self.tracked.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn force_borderless(&self) -> bool {
        self.force_borderless
    }

    /// Borderless creation styles for a top-level window.
    pub fn creation_style(&self, style: u32, ex_style: u32) -> Option<(u32, u32)> {
        if !self.force_borderless || style & WS_CHILD != 0 {
            return None;
        }
        Some(((style & !FRAME_STYLES) | WS_POPUP, ex_style & !EDGE_EX_STYLES))
    }

    /// Creation geometry for a restyled window: the monitor's bounds.
    pub fn creation_geometry(&self, style: u32, monitor: Option<Rect>) -> Option<Rect> {
        if !self.force_borderless || style & WS_CHILD != 0 {
            return None;
        }
        monitor
    }

    pub fn track(&self, hwnd: usize, requested: Size) {
        self.tracked().insert(hwnd, requested);
    }

    /// Forget `hwnd`. Returns the size it was tracked with.
    pub fn untrack(&self, hwnd: usize) -> Option<Size> {
        self.tracked().remove(&hwnd)
    }

    pub fn is_tracked(&self, hwnd: usize) -> bool {
        self.tracked().contains_key(&hwnd)
    }

    pub fn requested_size(&self, hwnd: usize) -> Option<Size> {
        self.tracked().get(&hwnd).copied()
    }

    /// `SetWindowPos` geometry for a tracked window. A resize request is
    /// remembered as the application's new size even though the window
    /// keeps covering the monitor.
    pub fn placement(&self, hwnd: usize, requested: Rect, monitor: Option<Rect>, flags: u32) -> Option<Rect> {
        if !self.force_borderless {
            return None;
        }
        {
            let mut tracked = self.tracked();
            let size = tracked.get_mut(&hwnd)?;
            if flags & SWP_NOSIZE == 0 {
                *size = requested.size();
            }
        }
        if flags & (SWP_NOMOVE | SWP_NOSIZE) != 0 {
            return None;
        }
        monitor
    }

    /// `GetClientRect` result for a tracked window under upscaling.
    pub fn reported_client_rect(&self, hwnd: usize) -> Option<Rect> {
        if !self.upscaling {
            return None;
        }
        let size = self.requested_size(hwnd)?;
        Some(Rect::from_xywh(0, 0, size.width, size.height))
    }

    /// `GetWindowRect` result: the real origin, the requested size.
    pub fn reported_window_rect(&self, hwnd: usize, actual: Rect) -> Option<Rect> {
        if !self.upscaling {
            return None;
        }
        let size = self.requested_size(hwnd)?;
        Some(Rect::from_xywh(actual.left, actual.top, size.width, size.height))
    }

    /// `ClipCursor` transform. `requested` is `None` for a release call.
    pub fn cursor_clip(&self, requested: Option<Rect>, monitor: Option<Rect>) -> ClipAction {
        match (self.cursor, requested) {
            (CursorFix::Off, _) | (_, None) => ClipAction::PassThrough,
            (CursorFix::Release, Some(_)) => ClipAction::Release,
            (CursorFix::Clamp, Some(rect)) => match monitor {
                None => ClipAction::PassThrough,
                Some(bounds) => match rect.intersect(&bounds) {
                    Some(clamped) if clamped == rect => ClipAction::PassThrough,
                    Some(clamped) => ClipAction::Clip(clamped),
                    None => ClipAction::Clip(bounds),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MONITOR: Rect = Rect { left: 0, top: 0, right: 2560, bottom: 1440 };

    fn filter(force_borderless: bool, borderless_upscaling: bool, cursor_fix: CursorFix) -> WindowFilter {
        WindowFilter::new(&WindowSettings { borderless_upscaling, force_borderless, cursor_fix })
    }

    #[test]
    fn borderless_strips_frame_from_top_level_windows() {
        let f = filter(true, false, CursorFix::Off);
        let overlapped = WS_CAPTION | WS_SYSMENU | WS_THICKFRAME | WS_MINIMIZEBOX | WS_MAXIMIZEBOX;
        let (style, ex) = f
            .creation_style(overlapped | 0x1000_0000, WS_EX_WINDOWEDGE | WS_EX_CLIENTEDGE | 0x8)
            .unwrap();
        assert_eq!(style, WS_POPUP | 0x1000_0000);
        assert_eq!(ex, 0x8);

        assert_eq!(f.creation_style(WS_CHILD | WS_BORDER, 0), None);
        assert_eq!(filter(false, false, CursorFix::Off).creation_style(WS_CAPTION, 0), None);
    }

    #[test]
    fn tracked_windows_cover_the_monitor() {
        let f = filter(true, true, CursorFix::Off);
        assert_eq!(f.creation_geometry(WS_CAPTION, Some(MONITOR)), Some(MONITOR));
        assert_eq!(f.creation_geometry(WS_CAPTION, None), None);

        f.track(7, Size { width: 1280, height: 720 });
        let req = Rect::from_xywh(100, 100, 1920, 1080);
        assert_eq!(f.placement(7, req, Some(MONITOR), 0), Some(MONITOR));
        assert_eq!(f.requested_size(7), Some(Size { width: 1920, height: 1080 }));

        assert_eq!(f.placement(7, req, Some(MONITOR), SWP_NOMOVE), None);
        assert_eq!(f.placement(8, req, Some(MONITOR), 0), None);
    }

    #[test]
    fn no_size_keeps_remembered_size() {
        let f = filter(true, true, CursorFix::Off);
        f.track(1, Size { width: 800, height: 600 });
        f.placement(1, Rect::default(), Some(MONITOR), SWP_NOSIZE);
        assert_eq!(f.requested_size(1), Some(Size { width: 800, height: 600 }));
    }

    #[test]
    fn untracked_handle_passes_through() {
        let f = filter(true, true, CursorFix::Off);
        let req = Rect::from_xywh(100, 100, 640, 480);
        f.track(9, Size { width: 1280, height: 720 });
        assert_eq!(f.untrack(9), Some(Size { width: 1280, height: 720 }));

        // A later window reusing the handle value is left alone.
        assert!(!f.is_tracked(9));
        assert_eq!(f.placement(9, req, Some(MONITOR), 0), None);
        assert_eq!(f.reported_client_rect(9), None);
        assert_eq!(f.reported_window_rect(9, req), None);
        assert_eq!(f.requested_size(9), None);
        assert_eq!(f.untrack(9), None);
    }

    #[test]
    fn upscaling_reports_requested_size() {
        let f = filter(true, true, CursorFix::Off);
        f.track(3, Size { width: 1280, height: 720 });
        assert_eq!(f.reported_client_rect(3), Some(Rect::from_xywh(0, 0, 1280, 720)));
        assert_eq!(f.reported_window_rect(3, MONITOR), Some(Rect::from_xywh(0, 0, 1280, 720)));
        assert_eq!(f.reported_client_rect(4), None);

        let plain = filter(true, false, CursorFix::Off);
        plain.track(3, Size { width: 1280, height: 720 });
        assert_eq!(plain.reported_client_rect(3), None);
    }

    #[test]
    fn cursor_clamp_and_release() {
        let clamp = filter(false, false, CursorFix::Clamp);
        let wide = Rect { left: -100, top: 0, right: 3000, bottom: 1440 };
        assert_eq!(
            clamp.cursor_clip(Some(wide), Some(MONITOR)),
            ClipAction::Clip(Rect { left: 0, top: 0, right: 2560, bottom: 1440 })
        );
        let inside = Rect::from_xywh(10, 10, 100, 100);
        assert_eq!(clamp.cursor_clip(Some(inside), Some(MONITOR)), ClipAction::PassThrough);
        assert_eq!(clamp.cursor_clip(Some(wide), None), ClipAction::PassThrough);
        assert_eq!(clamp.cursor_clip(None, Some(MONITOR)), ClipAction::PassThrough);

        let release = filter(false, false, CursorFix::Release);
        assert_eq!(release.cursor_clip(Some(inside), Some(MONITOR)), ClipAction::Release);

        let off = filter(false, false, CursorFix::Off);
        assert_eq!(off.cursor_clip(Some(wide), Some(MONITOR)), ClipAction::PassThrough);
    }
}
