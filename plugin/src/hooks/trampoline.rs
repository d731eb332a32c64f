//! Typed storage for the "original function" pointer of one hook.
//!
//! Before installation a [`Trampoline`] holds the address of the target
//! export; the backend rewrites it during install so it then points at the
//! relocated prologue. Replacements always call through it, never through
//! the hooked symbol.

use std::{
    ffi::c_void,
    marker::PhantomData,
    mem,
    ptr,
    sync::atomic::{AtomicPtr, Ordering},
};

/// A code address. Kept as an integer so it is `Send + Sync`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FnAddr(usize);

impl FnAddr {
    pub fn from_ptr(ptr: *const c_void) -> Option<Self> {
        (!ptr.is_null()).then_some(FnAddr(ptr as usize))
    }

    pub const fn from_raw(addr: usize) -> Self {
        FnAddr(addr)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0 as *mut c_void
    }
}

/// Original-function slot for a hook whose signature is `F`.
pub struct Trampoline<F> {
    slot: AtomicPtr<c_void>,
    _sig: PhantomData<F>,
}

impl<F: Copy> Trampoline<F> {
    pub const fn new() -> Self {
        Self { slot: AtomicPtr::new(ptr::null_mut()), _sig: PhantomData }
    }

    /// Point the slot at the export that is about to be hooked.
    pub fn bind(&self, original: FnAddr) {
        self.slot.store(original.as_ptr(), Ordering::Release);
    }

    pub fn address(&self) -> Option<FnAddr> {
        FnAddr::from_ptr(self.slot.load(Ordering::Acquire))
    }

    /// The raw slot handed to the hook backend.
    pub fn slot(&'static self) -> &'static AtomicPtr<c_void> {
        &self.slot
    }

    /// The callable original, if bound.
    ///
    /// # Safety
    /// `F` must be the exact function pointer type of the bound address.
    pub unsafe fn get(&self) -> Option<F> {
        debug_assert_eq!(mem::size_of::<F>(), mem::size_of::<*mut c_void>());
        let raw = self.slot.load(Ordering::Acquire);
        if raw.is_null() {
            None
        } else {
            // SAFETY: caller guarantees `F` is a fn pointer matching `raw`.
            Some(unsafe { mem::transmute_copy::<*mut c_void, F>(&raw) })
        }
    }
}

impl<F: Copy> Default for Trampoline<F> {
    fn default() -> Self {
        Self::new()
    }
}
