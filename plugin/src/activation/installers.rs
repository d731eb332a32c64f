// src/activation/installers.rs

//! Concrete [`SecondaryInstaller`]s.
//!
//! - [`ExportHookInstaller`] registers a fixed table of export hooks of one
//!   system module (Winsock, WinInet, user32) and installs them.
//! - [`GraphicsInstaller`] resolves the creation entry points of the hosted
//!   graphics family and hands them to a [`PipelineHooks`] implementation.

use crate::activation::{ActivationTarget, ApiFamily, InstallContext, SecondaryInstaller};
use crate::fe_log;
use crate::hooks::{register_exports, ExportHook, FnAddr, InstallReport};
use anyhow::{bail, Context as _};
use log::Level;
use std::sync::Arc;

// ───── export tables ─────

pub struct ExportHookInstaller {
    target: ActivationTarget,
    module: &'static str,
    hooks:  Vec<ExportHook>,
}

impl ExportHookInstaller {
    pub fn new(target: ActivationTarget, module: &'static str, hooks: Vec<ExportHook>) -> Self {
        Self { target, module, hooks }
    }
}

impl SecondaryInstaller for ExportHookInstaller {
    fn target(&self) -> ActivationTarget {
        self.target
    }

    fn trigger_module(&self) -> &'static str {
        self.module
    }

    fn install(&self, cx: &InstallContext<'_>) -> anyhow::Result<()> {
        let errors = register_exports(cx.registry, cx.platform, self.module, &self.hooks);
        let report = cx.registry.install_slots(&ExportHook::slots(&self.hooks));

        if let InstallReport::Partial { failed, .. } = &report {
            bail!("{} hook(s) not installed: {}", self.module, failed.join(", "));
        }
        if let Some(first) = errors.first() {
            bail!("{} of {} {} hook(s) not registered, first: {}", errors.len(), self.hooks.len(), self.module, first);
        }
        Ok(())
    }
}

// ───── graphics pipeline ─────

/// Creation entry points of a graphics family, as resolved in the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyExports {
    pub family:  ApiFamily,
    pub exports: Vec<(&'static str, FnAddr)>,
}

impl FamilyExports {
    pub fn get(&self, symbol: &str) -> Option<FnAddr> {
        self.exports.iter().find(|(s, _)| *s == symbol).map(|&(_, a)| a)
    }
}

/// `(module, symbol, required)` per family.
fn family_symbols(family: ApiFamily) -> &'static [(&'static str, &'static str, bool)] {
    match family {
        ApiFamily::D3D9 => &[
            ("d3d9.dll", "Direct3DCreate9", true),
            ("d3d9.dll", "Direct3DCreate9Ex", false),
        ],
        ApiFamily::Dxgi => &[
            ("d3d11.dll", "D3D11CreateDevice", true),
            ("d3d11.dll", "D3D11CreateDeviceAndSwapChain", true),
            ("dxgi.dll", "CreateDXGIFactory1", false),
        ],
    }
}

/// The rendering-pipeline hook bodies of one family.
pub trait PipelineHooks: Send + Sync {
    fn install(&self, exports: &FamilyExports, cx: &InstallContext<'_>) -> anyhow::Result<()>;
}

/// Stand-in pipeline: logs what it would apply.
#[derive(Debug, Default)]
pub struct LoggingPipeline;

impl PipelineHooks for LoggingPipeline {
    fn install(&self, exports: &FamilyExports, cx: &InstallContext<'_>) -> anyhow::Result<()> {
        for (symbol, addr) in &exports.exports {
            fe_log!(Level::Debug, "graphics", "{} at {:p}", symbol, addr.as_ptr());
        }
        match exports.family {
            ApiFamily::D3D9 => {
                let d3d9 = &cx.settings.d3d9;
                fe_log!(
                    Level::Info,
                    "graphics",
                    "D3D9: EnableFlip: {}, BufferCount: {}, MaxFrameLatency: {}, DisplayMode: {}, Format: {}",
                    d3d9.enable_flip,
                    d3d9.buffer_count,
                    d3d9.max_frame_latency,
                    d3d9.display_mode,
                    d3d9.format
                );
            }
            ApiFamily::Dxgi => {
                let dxgi = &cx.settings.dxgi;
                fe_log!(
                    Level::Info,
                    "graphics",
                    "DXGI: BufferCount: {}, DisplayMode: {}, MaxFrameLatency: {}, ExplicitRebind: {}",
                    dxgi.buffer_count,
                    dxgi.display_mode,
                    dxgi.max_frame_latency,
                    dxgi.explicit_rebind
                );
            }
        }
        Ok(())
    }
}

pub struct GraphicsInstaller {
    family:   ApiFamily,
    pipeline: Arc<dyn PipelineHooks>,
}

impl GraphicsInstaller {
    pub fn new(family: ApiFamily, pipeline: Arc<dyn PipelineHooks>) -> Self {
        Self { family, pipeline }
    }

    fn resolve(&self, cx: &InstallContext<'_>) -> anyhow::Result<FamilyExports> {
        let mut exports = Vec::new();
        for &(module, symbol, required) in family_symbols(self.family) {
            match cx.platform.resolve_export(module, symbol) {
                Some(addr) => exports.push((symbol, addr)),
                None if required => bail!("{}!{} not found", module, symbol),
                None => fe_log!(Level::Debug, "graphics", "Optional export {}!{} not found", module, symbol),
            }
        }
        Ok(FamilyExports { family: self.family, exports })
    }
}

impl SecondaryInstaller for GraphicsInstaller {
    fn target(&self) -> ActivationTarget {
        ActivationTarget::Graphics(self.family)
    }

    fn trigger_module(&self) -> &'static str {
        self.family.trigger_module()
    }

    fn install(&self, cx: &InstallContext<'_>) -> anyhow::Result<()> {
        let exports = self.resolve(cx)?;
        self.pipeline
            .install(&exports, cx)
            .with_context(|| format!("{:?} pipeline hooks", self.family))
    }
}
