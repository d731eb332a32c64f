//! Public API for configuration

pub mod loader;
pub mod model;
pub mod types;

use std::path::{Path, PathBuf};

// Re-export the main entrypoints:
pub use loader::{load, load_strict, ConfigSource, Loaded};
pub use model::{ConfigError, Settings};

/// `<exe dir>\DLLPlugins\FE.toml`
pub fn config_path(exe_dir: &Path) -> PathBuf {
    exe_dir.join("DLLPlugins").join("FE.toml")
}

/// `<exe dir>\DLLPluginLogs`
pub fn log_dir(exe_dir: &Path) -> PathBuf {
    exe_dir.join("DLLPluginLogs")
}
