//! Integration tests for the hook registry and export installers.
//!
//! Key responsibilities:
//! - Duplicate and unbound registrations are rejected.
//! - An install pass patches each entry at most once.
//! - Partial failures are reported by name and retried on the next pass.
//! - Attach-time installation reports missing exports.
//! - An export unit is judged by its own hooks only.

mod common;

use common::{bound_slot, harness, trampoline, unbound_slot, MockBackend, MockPlatform, TRAMPOLINE_BASE};
use fe::activation::{ActivationState, ActivationTarget, ExportHookInstaller, InstallContext, SecondaryInstaller};
use fe::config::Settings;
use fe::hooks::{register_exports, ExportHook, FnAddr, HookError, HookRegistry, InstallReport};
use std::sync::atomic::Ordering;

fn replacement(n: usize) -> FnAddr {
    FnAddr::from_raw(0x5000 + n)
}

#[test]
fn duplicate_slot_is_rejected() {
    let registry = HookRegistry::new(MockBackend::new().boxed());
    let slot = bound_slot(0x1000);

    registry.register("connect", slot, replacement(1)).unwrap();
    assert_eq!(registry.register("connect", slot, replacement(2)), Err(HookError::AlreadyRegistered("connect")));
    assert_eq!(registry.pending(), vec!["connect"]);
}

#[test]
fn unbound_slot_is_rejected() {
    let registry = HookRegistry::new(MockBackend::new().boxed());
    assert_eq!(
        registry.register("listen", unbound_slot(), replacement(1)),
        Err(HookError::UnboundSlot("listen"))
    );
}

#[test]
fn second_install_reports_already_installed() {
    let backend = MockBackend::new();
    let registry = HookRegistry::new(backend.boxed());
    let a = bound_slot(0x1000);
    let b = bound_slot(0x2000);
    registry.register("LoadLibraryA", a, replacement(1)).unwrap();
    registry.register("LoadLibraryW", b, replacement(2)).unwrap();

    assert_eq!(registry.install(), InstallReport::Complete { installed: 2 });
    assert!(a.load(Ordering::SeqCst) as usize >= TRAMPOLINE_BASE);
    assert!(registry.is_installed("LoadLibraryW"));

    assert_eq!(registry.install(), InstallReport::AlreadyInstalled);
    assert_eq!(backend.patched(), 2);
    assert_eq!(backend.commits(), 1);
}

#[test]
fn partial_failures_are_named_and_retried() {
    let backend = MockBackend::new();
    let registry = HookRegistry::new(backend.boxed());
    let ok = bound_slot(0x1000);
    let rejected = bound_slot(0x2000);
    let ignored = bound_slot(0x3000);
    registry.register("CreateWindowExW", ok, replacement(1)).unwrap();
    registry.register("SetWindowPos", rejected, replacement(2)).unwrap();
    registry.register("ClipCursor", ignored, replacement(3)).unwrap();
    backend.reject(rejected);
    backend.ignore(ignored);

    let report = registry.install();
    assert_eq!(report, InstallReport::Partial { installed: 1, failed: vec!["SetWindowPos", "ClipCursor"] });
    assert!(!report.is_success());
    assert_eq!(ignored.load(Ordering::SeqCst) as usize, 0x3000);

    backend.heal();
    assert_eq!(registry.install(), InstallReport::Complete { installed: 2 });
    assert!(registry.pending().is_empty());
    assert_eq!(backend.patched(), 3);
}

#[test]
fn failed_commit_fails_every_queued_entry() {
    let backend = MockBackend::new();
    let registry = HookRegistry::new(backend.boxed());
    registry.register("connect", bound_slot(0x1000), replacement(1)).unwrap();
    registry.register("listen", bound_slot(0x2000), replacement(2)).unwrap();
    backend.fail_commit();

    assert_eq!(registry.install(), InstallReport::Partial { installed: 0, failed: vec!["connect", "listen"] });
    assert_eq!(registry.pending().len(), 2);
}

#[test]
fn register_exports_binds_and_skips_known_hooks() {
    let platform = MockPlatform::new();
    platform.load("ws2_32.dll");
    platform.export("ws2_32.dll", "connect", 0x1000);
    let registry = HookRegistry::new(MockBackend::new().boxed());

    let connect = trampoline();
    let listen = trampoline();
    let hooks = [
        ExportHook::new("connect", connect, replacement(1)),
        ExportHook::new("listen", listen, replacement(2)),
    ];

    let errors = register_exports(&registry, &platform, "ws2_32.dll", &hooks);
    assert_eq!(errors, vec![HookError::MissingExport { module: "ws2_32.dll", symbol: "listen" }]);
    assert_eq!(connect.address(), Some(FnAddr::from_raw(0x1000)));
    assert!(listen.address().is_none());

    platform.export("ws2_32.dll", "listen", 0x2000);
    assert!(register_exports(&registry, &platform, "ws2_32.dll", &hooks).is_empty());
    assert_eq!(registry.pending(), vec!["connect", "listen"]);
}

#[test]
fn export_installer_reports_missing_exports_as_failure() {
    let platform = MockPlatform::new();
    platform.load("wininet.dll");
    platform.export("wininet.dll", "InternetOpenA", 0x1000);
    let registry = HookRegistry::new(MockBackend::new().boxed());
    let settings = Settings::default();
    let cx = InstallContext { registry: &registry, platform: &platform, settings: &settings };

    let installer = ExportHookInstaller::new(
        ActivationTarget::Session,
        "wininet.dll",
        vec![
            ExportHook::new("InternetOpenA", trampoline(), replacement(1)),
            ExportHook::new("InternetOpenW", trampoline(), replacement(2)),
        ],
    );
    let err = installer.install(&cx).unwrap_err();
    assert!(err.to_string().contains("not registered"), "{err}");
    assert!(registry.is_installed("InternetOpenA"));

    platform.export("wininet.dll", "InternetOpenW", 0x2000);
    installer.install(&cx).unwrap();
    assert!(registry.is_installed("InternetOpenW"));
}

#[test]
fn attach_reports_missing_load_hooks() {
    let h = harness(Settings::default(), Vec::new());
    h.platform.load("kernel32.dll");
    h.platform.export("kernel32.dll", "LoadLibraryA", 0x1000);
    h.platform.export("kernel32.dll", "LoadLibraryW", 0x1010);

    let hooks = [
        ExportHook::new("LoadLibraryA", trampoline(), replacement(1)),
        ExportHook::new("LoadLibraryW", trampoline(), replacement(2)),
        ExportHook::new("LoadLibraryExA", trampoline(), replacement(3)),
    ];
    let report = h.cx.attach("kernel32.dll", &hooks);
    assert_eq!(report, InstallReport::Partial { installed: 2, failed: vec!["LoadLibraryExA"] });
    assert!(h.cx.registry.is_installed("LoadLibraryA"));
}

#[test]
fn install_slots_leaves_other_pending_entries_alone() {
    let backend = MockBackend::new();
    let registry = HookRegistry::new(backend.boxed());
    let stale = bound_slot(0x1000);
    let own = bound_slot(0x2000);
    registry.register("LoadLibraryExA", stale, replacement(1)).unwrap();
    registry.register("connect", own, replacement(2)).unwrap();
    backend.reject(stale);

    assert_eq!(registry.install_slots(&[own]), InstallReport::Complete { installed: 1 });
    assert!(registry.is_installed_slot(own));
    assert!(!registry.is_installed_slot(stale));
    assert_eq!(registry.install_slots(&[own]), InstallReport::AlreadyInstalled);
    assert_eq!(registry.pending(), vec!["LoadLibraryExA"]);
}

#[test]
fn stale_base_hook_does_not_fail_export_unit() {
    let connect = trampoline();
    let installer = ExportHookInstaller::new(
        ActivationTarget::Network,
        "ws2_32.dll",
        vec![ExportHook::new("connect", connect, replacement(1))],
    );
    let h = harness(Settings::default(), vec![Box::new(installer)]);

    let stale = bound_slot(0x1000);
    h.backend.reject(stale);
    h.cx.registry.register("LoadLibraryExA", stale, replacement(9)).unwrap();

    h.platform.load("ws2_32.dll");
    h.platform.export("ws2_32.dll", "connect", 0x2000);
    h.cx.recheck();

    assert!(h.cx.registry.is_installed_slot(connect.slot()));
    assert_eq!(h.cx.activation.state(ActivationTarget::Network), Some(ActivationState::HooksInstalled));
    assert!(!h.cx.activation.unit(ActivationTarget::Network).unwrap().is_abandoned());
    assert_eq!(h.cx.registry.pending(), vec!["LoadLibraryExA"]);
}
