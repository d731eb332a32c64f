// src/activation/mod.rs

//! # Activation Controller
//!
//! Installs a secondary hook set the first time its triggering module is
//! resident in the process.
//!
//! Key responsibilities:
//! - One forward-only state machine per [`ActivationTarget`].
//! - Run each installer at most once at a time and never again after it
//!   succeeded.
//! - Apply the configured [`InstallRetry`] policy after a failure.
//!
//! [`InstallRetry`]: crate::config::types::InstallRetry

pub mod controller;
pub mod installers;

pub use controller::{Activation, ActivationController};
pub use installers::{ExportHookInstaller, GraphicsInstaller, LoggingPipeline, PipelineHooks};

use crate::config::Settings;
use crate::hooks::HookRegistry;
use crate::platform::Platform;
use std::fmt;

/// Graphics API family the host renders with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiFamily {
    D3D9,
    Dxgi,
}

impl ApiFamily {
    /// Host ABI encoding: 1 = D3D9, 2 = DXGI, anything else is unknown.
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(ApiFamily::D3D9),
            2 => Some(ApiFamily::Dxgi),
            _ => None,
        }
    }

    pub fn trigger_module(self) -> &'static str {
        match self {
            ApiFamily::D3D9 => "d3d9.dll",
            ApiFamily::Dxgi => "d3d11.dll",
        }
    }
}

/// What an activation unit installs hooks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivationTarget {
    Graphics(ApiFamily),
    Network,
    Session,
    Window,
}

impl ActivationTarget {
    pub fn label(self) -> &'static str {
        match self {
            ActivationTarget::Graphics(ApiFamily::D3D9) => "d3d9",
            ActivationTarget::Graphics(ApiFamily::Dxgi) => "dxgi",
            ActivationTarget::Network => "network",
            ActivationTarget::Session => "session",
            ActivationTarget::Window => "window",
        }
    }
}

impl fmt::Display for ActivationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    NotLoaded,
    /// Triggering module seen; hooks not (yet) installed.
    Loaded,
    HooksInstalled,
}

/// What an installer gets to work with.
pub struct InstallContext<'a> {
    pub registry: &'a HookRegistry,
    pub platform: &'a dyn Platform,
    pub settings: &'a Settings,
}

/// Installs the secondary hooks of one target.
pub trait SecondaryInstaller: Send + Sync {
    fn target(&self) -> ActivationTarget;

    /// Module whose residency triggers [`install`](Self::install).
    fn trigger_module(&self) -> &'static str;

    fn install(&self, cx: &InstallContext<'_>) -> anyhow::Result<()>;
}
