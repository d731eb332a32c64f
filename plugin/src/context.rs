// src/context.rs

//! The plugin's process-wide state, built once at attach time.

use crate::activation::{ActivationController, InstallContext, SecondaryInstaller};
use crate::config::Settings;
use crate::fe_log;
use crate::hooks::{register_exports, ExportHook, HookBackend, HookError, HookRegistry, InstallReport};
use crate::intercept::module_load::ModuleLoadInterceptor;
use crate::intercept::network::NetworkFilter;
use crate::intercept::window::WindowFilter;
use crate::platform::Platform;
use crate::policy::BlockList;
use log::Level;

pub struct Context {
    pub settings:   Settings,
    pub registry:   HookRegistry,
    pub modules:    ModuleLoadInterceptor,
    pub net:        NetworkFilter,
    pub window:     WindowFilter,
    pub activation: ActivationController,
    platform:       Box<dyn Platform>,
}

impl Context {
    pub fn new(
        settings: Settings,
        backend: Box<dyn HookBackend>,
        platform: Box<dyn Platform>,
        installers: Vec<Box<dyn SecondaryInstaller>>,
    ) -> Self {
        Self {
            registry:   HookRegistry::new(backend),
            modules:    ModuleLoadInterceptor::new(BlockList::new(&settings.modules.blocked)),
            net:        NetworkFilter::new(&settings.net),
            window:     WindowFilter::new(&settings.window),
            activation: ActivationController::new(installers, settings.hooks.retry),
            platform,
            settings,
        }
    }

    pub fn platform(&self) -> &dyn Platform {
        self.platform.as_ref()
    }

    pub fn install_context(&self) -> InstallContext<'_> {
        InstallContext { registry: &self.registry, platform: self.platform(), settings: &self.settings }
    }

    /// Activation recheck, run after every library load attempt.
    pub fn recheck(&self) {
        self.activation.recheck_all(&self.install_context());
    }

    /// Attach-time pass: install the load interceptors of `module`, then
    /// handle every trigger module that is already resident.
    pub fn attach(&self, module: &'static str, hooks: &[ExportHook]) -> InstallReport {
        let errors = register_exports(&self.registry, self.platform(), module, hooks);
        for e in &errors {
            fe_log!(Level::Error, "hooks", "{}", e);
        }
        let missing: Vec<&'static str> = errors.iter().filter_map(HookError::hook_name).collect();

        let report = match self.registry.install_slots(&ExportHook::slots(hooks)) {
            report if missing.is_empty() => report,
            InstallReport::Complete { installed } => InstallReport::Partial { installed, failed: missing },
            InstallReport::AlreadyInstalled => InstallReport::Partial { installed: 0, failed: missing },
            InstallReport::Partial { installed, mut failed } => {
                failed.extend(missing);
                InstallReport::Partial { installed, failed }
            }
        };
        if let InstallReport::Partial { failed, .. } = &report {
            fe_log!(Level::Error, "hooks", "Load interception incomplete, missing: {}", failed.join(", "));
        }
        self.recheck();
        report
    }
}
