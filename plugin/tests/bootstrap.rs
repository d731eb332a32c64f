//! Integration tests for the attach sequence.
//!
//! Key responsibilities:
//! - Settings come from `DLLPlugins\FE.toml` and the log lands in
//!   `DLLPluginLogs\FE.log`.
//! - The graphics unit exists only when the host names its family.

mod common;

use common::{MockBackend, MockPlatform};
use fe::activation::{ActivationState, ActivationTarget, ApiFamily, LoggingPipeline};
use fe::bootstrap::{build_context, load_settings};
use fe::config::{config_path, log_dir, Settings};
use fe::logging::LOG_FILE;
use std::{fs, sync::Arc};
use tempfile::tempdir;

#[test]
fn attach_reads_config_and_writes_log() {
    let dir = tempdir().unwrap();
    let cfg = config_path(dir.path());
    fs::create_dir_all(cfg.parent().unwrap()).unwrap();
    fs::write(&cfg, "[DLL]\nBlockedModules = \"evil.dll\"\n[Logging]\nLevel = \"debug\"\n").unwrap();

    let settings = load_settings(dir.path(), None);
    assert_eq!(settings.modules.blocked, vec!["evil.dll"]);

    log::logger().flush();
    let log = fs::read_to_string(log_dir(dir.path()).join(LOG_FILE)).unwrap();
    assert!(log.contains("[bootstrap]"), "{log}");
    assert!(log.contains("1 module(s) in blocklist"), "{log}");
}

#[test]
fn graphics_unit_follows_host_family() {
    let build = |family| {
        build_context(
            Settings::default(),
            family,
            Arc::new(LoggingPipeline),
            MockBackend::new().boxed(),
            Box::new(MockPlatform::new()),
            Vec::new(),
        )
    };

    let cx = build(Some(ApiFamily::D3D9));
    assert_eq!(
        cx.activation.states(),
        vec![(ActivationTarget::Graphics(ApiFamily::D3D9), ActivationState::NotLoaded)]
    );

    let cx = build(None);
    assert!(cx.activation.states().is_empty());
}
