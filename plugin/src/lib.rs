// src/lib.rs

//! FE: in-process interception plugin.
//!
//! Loaded into a running graphics application by its plugin host. Filters
//! library loads, sockets, DNS and WinInet sessions, reshapes the game
//! window, and activates the rendering-pipeline hooks once the graphics
//! runtime is resident.
//!
//! Everything outside `win` is platform-neutral and talks to the process
//! through [`platform::Platform`] and [`hooks::HookBackend`].

#[macro_use]
mod macros;

pub mod activation;
pub mod bootstrap;
pub mod config;
pub mod context;
pub mod hooks;
pub mod intercept;
pub mod logging;
pub mod platform;
pub mod policy;

#[cfg(windows)]
mod win;

pub use context::Context;

pub const PLUGIN_NAME: &str = "FE";
pub const PLUGIN_VERSION: (u32, u32, u32) = (0, 3, 2);

pub fn plugin_version() -> String {
    let (major, minor, patch) = PLUGIN_VERSION;
    format!("{}.{}.{}", major, minor, patch)
}
