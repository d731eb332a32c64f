// src/config/model.rs

use crate::config::types::{CursorFix, FormatOverride, InstallRetry, SwapEffect};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Every resolved setting. Built once at attach time, read-only afterwards.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Settings {
    pub dxgi:    DxgiSettings,
    pub d3d9:    D3d9Settings,
    pub modules: ModuleSettings,
    pub net:     NetSettings,
    pub window:  WindowSettings,
    pub hooks:   HookSettings,
    pub logging: LoggingSettings,
}

/// Mirror of the `[DXGI]` section
#[derive(Debug, Clone, Serialize)]
pub struct DxgiSettings {
    pub swap_effect:        Option<SwapEffect>,
    pub format:             FormatOverride,
    pub srv_retry_format:   Option<u32>,
    pub buffer_count:       u32,
    pub display_mode:       i32,
    pub enable_tearing:     bool,
    pub explicit_rebind:    bool,
    pub max_frame_latency:  i32,
    pub framerate_limit:    f64,
    /// Minimum time between presents, derived from `framerate_limit`.
    pub frame_interval_us:  Option<u64>,
}

impl Default for DxgiSettings {
    fn default() -> Self {
        Self {
            swap_effect:       None,
            format:            FormatOverride::Default,
            srv_retry_format:  None,
            buffer_count:      0,
            display_mode:      -1,
            enable_tearing:    false,
            explicit_rebind:   false,
            max_frame_latency: -1,
            framerate_limit:   0.0,
            frame_interval_us: None,
        }
    }
}

impl DxgiSettings {
    pub fn frame_interval(&self) -> Option<Duration> {
        self.frame_interval_us.map(Duration::from_micros)
    }
}

/// Mirror of the `[D3D9]` section
#[derive(Debug, Clone, Serialize)]
pub struct D3d9Settings {
    pub enable_flip:                        bool,
    pub present_interval_immediate:         bool,
    pub buffer_count:                       i32,
    pub max_frame_latency:                  i32,
    pub create_texture_usage_dynamic:       bool,
    pub create_texture_clear_usage_flags:   u32,
    pub create_index_buffer_usage_dynamic:  bool,
    pub create_vertex_buffer_usage_dynamic: bool,
    pub create_cube_texture_usage_dynamic:  bool,
    pub create_volume_texture_usage_dynamic: bool,
    pub force_adapter:                      i32,
    pub display_mode:                       i32,
    pub format:                             FormatOverride,
}

impl Default for D3d9Settings {
    fn default() -> Self {
        Self {
            enable_flip:                         false,
            present_interval_immediate:          false,
            buffer_count:                        -1,
            max_frame_latency:                   -1,
            create_texture_usage_dynamic:        false,
            create_texture_clear_usage_flags:    0,
            create_index_buffer_usage_dynamic:   false,
            create_vertex_buffer_usage_dynamic:  false,
            create_cube_texture_usage_dynamic:   false,
            create_volume_texture_usage_dynamic: false,
            force_adapter:                       -1,
            display_mode:                        -1,
            format:                              FormatOverride::Default,
        }
    }
}

/// Mirror of the `[DLL]` section
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModuleSettings {
    pub blocked: Vec<String>,
}

/// Mirror of the `[Net]` section
#[derive(Debug, Clone, Default, Serialize)]
pub struct NetSettings {
    pub block_connections:   bool,
    pub allowed_ports:       Vec<u16>,
    pub block_listen:        bool,
    pub block_dns_resolve:   bool,
    pub allowed_hosts:       Vec<String>,
    pub block_internet_open: bool,
}

impl NetSettings {
    /// Whether any Winsock entry point needs wrapping.
    pub fn needs_socket_hooks(&self) -> bool {
        self.block_connections || self.block_listen || self.block_dns_resolve
    }
}

/// Mirror of the `[Window]` section
#[derive(Debug, Clone, Default, Serialize)]
pub struct WindowSettings {
    pub borderless_upscaling: bool,
    /// Already gated on a compatible display mode.
    pub force_borderless:     bool,
    pub cursor_fix:           CursorFix,
}

impl WindowSettings {
    pub fn needs_hooks(&self) -> bool {
        self.force_borderless || self.borderless_upscaling || self.cursor_fix != CursorFix::Off
    }
}

/// Mirror of the `[Hooks]` table
#[derive(Debug, Clone, Default, Serialize)]
pub struct HookSettings {
    pub retry: InstallRetry,
}

/// Mirror of the `[Logging]` table
#[derive(Debug, Clone, Serialize)]
pub struct LoggingSettings {
    pub enable: bool,
    pub level:  String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { enable: true, level: "INFO".into() }
    }
}

impl Settings {
    /// Human-readable startup summary, one line per active feature.
    pub fn summary(&self) -> Vec<String> {
        let mut lines = Vec::new();

        let swap = self
            .dxgi
            .swap_effect
            .map_or_else(|| "default".to_owned(), |s| s.to_string());
        lines.push(format!(
            "DXGI: SwapEffect: {}, Format: {}, BufferCount: {}, Tearing: {}",
            swap, self.dxgi.format, self.dxgi.buffer_count, self.dxgi.enable_tearing
        ));

        if let Some(interval) = self.dxgi.frame_interval() {
            lines.push(format!(
                "Framerate limit: {} (frame interval {})",
                self.dxgi.framerate_limit,
                humantime::format_duration(interval)
            ));
        }

        if !self.modules.blocked.is_empty() {
            lines.push(format!("{} module(s) in blocklist", self.modules.blocked.len()));
        }
        if self.net.block_connections {
            lines.push(format!(
                "Blocking network connections ({} port(s) in allow list)",
                self.net.allowed_ports.len()
            ));
        }
        if self.net.block_listen {
            lines.push("Blocking network listen".to_owned());
        }
        if self.net.block_dns_resolve {
            lines.push(format!(
                "Blocking DNS resolve ({} host(s) in allow list)",
                self.net.allowed_hosts.len()
            ));
        }
        if self.net.block_internet_open {
            lines.push("Blocking InternetOpen".to_owned());
        }
        if self.window.needs_hooks() {
            lines.push(format!(
                "Window: ForceBorderless: {}, BorderlessUpscaling: {}, CursorFix: {:?}",
                self.window.force_borderless, self.window.borderless_upscaling, self.window.cursor_fix
            ));
        }
        lines
    }
}

/// All the ways strict config loading can go wrong
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
