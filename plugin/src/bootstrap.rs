// src/bootstrap.rs

//! Attach sequence shared by the Windows entry point and the tests.
//!
//! 1. Load `DLLPlugins\FE.toml` (leniently) next to the host executable
//! 2. Set up logging into `DLLPluginLogs\FE.log` and the host sink
//! 3. Build the [`Context`] with the activation units the settings need
//! 4. Install the load interceptors and run the first recheck

use crate::activation::{ApiFamily, GraphicsInstaller, PipelineHooks, SecondaryInstaller};
use crate::config::{self, Loaded, Settings};
use crate::context::Context;
use crate::fe_log;
use crate::hooks::{ExportHook, HookBackend};
use crate::logging;
use crate::platform::Platform;
use log::Level;
use std::{path::Path, sync::Arc};
use thiserror::Error;

/// Failures that make `Initialize` report `false` to the host.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("host passed a null {0}")]
    NullHost(&'static str),

    #[error("host ABI version {found} is not supported (expected {expected})")]
    AbiMismatch { expected: u32, found: u32 },

    #[error("plugin is already initialized")]
    AlreadyInitialized,
}

/// Steps 1 and 2. Never fails: a broken config means defaults, a broken log
/// file means no file logging.
pub fn load_settings(exe_dir: &Path, sink: Option<fern::Output>) -> Settings {
    let path = config::config_path(exe_dir);
    let Loaded { settings, notes } = config::load(&path);

    let log_ready = logging::setup_logging(&config::log_dir(exe_dir), &settings.logging, sink);

    fe_log!(Level::Info, "bootstrap", "{} {} attaching", crate::PLUGIN_NAME, crate::plugin_version());
    if let Err(e) = log_ready {
        fe_log!(Level::Warn, "bootstrap", "Log file unavailable: {}", e);
    }
    if !path.is_file() {
        fe_log!(Level::Info, "config", "No config at {}, using defaults", path.display());
    }
    for note in notes {
        fe_log!(Level::Debug, "config", "{}", note);
    }
    for line in settings.summary() {
        fe_log!(Level::Info, "config", "{}", line);
    }
    settings
}

/// Step 3. `installers` are the platform's own units (network, window);
/// the graphics unit is added when the host told us its family.
pub fn build_context(
    settings: Settings,
    family: Option<ApiFamily>,
    pipeline: Arc<dyn PipelineHooks>,
    backend: Box<dyn HookBackend>,
    platform: Box<dyn Platform>,
    mut installers: Vec<Box<dyn SecondaryInstaller>>,
) -> Context {
    match family {
        Some(family) => installers.insert(0, Box::new(GraphicsInstaller::new(family, pipeline))),
        None => fe_log!(Level::Warn, "bootstrap", "Unknown graphics API family, pipeline hooks disabled"),
    }
    Context::new(settings, backend, platform, installers)
}

/// Step 4.
pub fn attach(cx: &Context, module: &'static str, load_hooks: &[ExportHook]) {
    let report = cx.attach(module, load_hooks);
    fe_log!(Level::Info, "bootstrap", "Load interception: {:?}", report);
    for (target, state) in cx.activation.states() {
        fe_log!(Level::Debug, "activation", "{}: {:?}", target, state);
    }
}
