// src/config/loader.rs

//! # Configuration Loader
//!
//! Reads `FE.toml` into a loose [`ConfigSource`] and resolves every
//! recognised `Section.Key` into the typed [`Settings`].
//!
//! Resolution is per key: an absent or unparseable value falls back to its
//! documented default and is noted, it never fails the whole file. Section
//! and key names are matched case-insensitively, like the INI files the
//! option names come from.

use crate::config::model::{
    ConfigError, D3d9Settings, DxgiSettings, HookSettings, LoggingSettings, ModuleSettings,
    NetSettings, Settings, WindowSettings,
};
use crate::config::types::{split_list, CursorFix, FormatOverride, InstallRetry, SwapEffect};
use std::{cell::RefCell, fs, path::Path};
use toml::Value;

/// `DXGI_FORMAT_R8G8B8A8_UNORM`
pub const DXGI_DEFAULT_FORMAT: u32 = 28;
/// `D3DFMT_X8R8G8B8`
pub const D3D9_DEFAULT_FORMAT: u32 = 22;
/// `D3DPRESENT_BACK_BUFFERS_MAX_EX`
pub const D3D9_MAX_BACK_BUFFERS: i64 = 30;

/// Outcome of the lenient loader: the settings plus what had to be defaulted.
#[derive(Debug)]
pub struct Loaded {
    pub settings: Settings,
    pub notes:    Vec<String>,
}

/// Load `path`, falling back to defaults for anything missing or broken.
/// Never fails: an unreadable file yields all defaults and a note.
pub fn load(path: &Path) -> Loaded {
    let source = match fs::read_to_string(path) {
        Ok(text) => ConfigSource::parse(&text),
        Err(e) => Err(ConfigError::Io(e)),
    };

    match source {
        Ok(src) => {
            let settings = resolve(&src);
            Loaded { settings, notes: src.take_notes() }
        }
        Err(e) => {
            let src = ConfigSource::empty();
            Loaded {
                settings: resolve(&src),
                notes:    vec![format!("Couldn't load config file {}: {}", path.display(), e)],
            }
        }
    }
}

/// Load `path`, failing on I/O or TOML syntax errors. Per-key fallbacks
/// still apply.
pub fn load_strict(path: &Path) -> Result<Settings, ConfigError> {
    let text = fs::read_to_string(path)?;
    Ok(resolve(&ConfigSource::parse(&text)?))
}

/// A parsed configuration file with typed, defaulting accessors.
#[derive(Debug, Default)]
pub struct ConfigSource {
    root:  toml::Table,
    notes: RefCell<Vec<String>>,
}

impl ConfigSource {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(Self { root: toml::from_str(text)?, notes: RefCell::default() })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Values that were present but unusable, in resolution order.
    pub fn take_notes(&self) -> Vec<String> {
        self.notes.take()
    }

    fn value(&self, section: &str, key: &str) -> Option<&Value> {
        let (_, table) = self.root.iter().find(|(k, _)| k.eq_ignore_ascii_case(section))?;
        table
            .as_table()?
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    fn fallback<T: std::fmt::Debug>(&self, section: &str, key: &str, raw: &Value, default: T) -> T {
        self.notes.borrow_mut().push(format!(
            "{section}.{key}: unusable value {raw}, using default {default:?}"
        ));
        default
    }

    pub fn exists(&self, section: &str, key: &str) -> bool {
        self.value(section, key).is_some()
    }

    pub fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        match self.value(section, key) {
            None => default,
            Some(v) => value_as_bool(v).unwrap_or_else(|| self.fallback(section, key, v, default)),
        }
    }

    pub fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        match self.value(section, key) {
            None => default,
            Some(v) => value_as_int(v).unwrap_or_else(|| self.fallback(section, key, v, default)),
        }
    }

    /// Integer clamped into `[lo, hi]`.
    pub fn get_clamped(&self, section: &str, key: &str, default: i64, lo: i64, hi: i64) -> i64 {
        self.get_int(section, key, default).clamp(lo, hi)
    }

    pub fn get_u32(&self, section: &str, key: &str, default: u32) -> u32 {
        match self.value(section, key) {
            None => default,
            Some(v) => value_as_int(v)
                .and_then(|i| u32::try_from(i).ok())
                .unwrap_or_else(|| self.fallback(section, key, v, default)),
        }
    }

    pub fn get_float(&self, section: &str, key: &str, default: f64) -> f64 {
        match self.value(section, key) {
            None => default,
            Some(v) => value_as_float(v).unwrap_or_else(|| self.fallback(section, key, v, default)),
        }
    }

    /// Any scalar rendered as a string.
    pub fn get_string(&self, section: &str, key: &str) -> Option<String> {
        match self.value(section, key)? {
            Value::String(s) => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Boolean(b) => Some(b.to_string()),
            other => self.fallback(section, key, other, None),
        }
    }

    fn get_format(&self, section: &str, default: u32) -> FormatOverride {
        let Some(v) = self.value(section, "Format") else {
            return FormatOverride::Default;
        };
        if matches!(v, Value::String(s) if s.trim().eq_ignore_ascii_case("auto")) {
            return FormatOverride::Auto;
        }
        match value_as_int(v).and_then(|i| u32::try_from(i).ok()) {
            Some(raw) => FormatOverride::Fixed(raw),
            None => self.fallback(section, "Format", v, FormatOverride::Fixed(default)),
        }
    }

    fn get_cursor_fix(&self) -> CursorFix {
        let Some(v) = self.value("Window", "CursorFix") else {
            return CursorFix::Off;
        };
        let parsed = match v {
            Value::Boolean(true) => Some(CursorFix::Clamp),
            Value::Boolean(false) => Some(CursorFix::Off),
            Value::Integer(0) => Some(CursorFix::Off),
            Value::Integer(_) => Some(CursorFix::Clamp),
            Value::String(s) => CursorFix::parse(s),
            _ => None,
        };
        parsed.unwrap_or_else(|| self.fallback("Window", "CursorFix", v, CursorFix::Off))
    }
}

fn value_as_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Boolean(b) => Some(*b),
        Value::Integer(i) => Some(*i != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn value_as_int(v: &Value) -> Option<i64> {
    match v {
        Value::Integer(i) => Some(*i),
        Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
        Value::String(s) => {
            let s = s.trim();
            match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some(hex) => i64::from_str_radix(hex, 16).ok(),
                None => s.parse().ok(),
            }
        }
        _ => None,
    }
}

fn value_as_float(v: &Value) -> Option<f64> {
    match v {
        Value::Float(f) => Some(*f),
        Value::Integer(i) => Some(*i as f64),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Resolve every recognised key of `src`.
pub fn resolve(src: &ConfigSource) -> Settings {
    let dxgi = resolve_dxgi(src);
    let d3d9 = resolve_d3d9(src);

    let modules = ModuleSettings {
        blocked: src.get_string("DLL", "BlockedModules").map(|s| split_list(&s)).unwrap_or_default(),
    };

    let mut allowed_ports = Vec::new();
    for entry in src.get_string("Net", "AllowedPorts").map(|s| split_list(&s)).unwrap_or_default() {
        match entry.parse::<u16>() {
            Ok(port) => allowed_ports.push(port),
            Err(_) => src.notes.borrow_mut().push(format!("Net.AllowedPorts: ignoring '{entry}'")),
        }
    }

    let net = NetSettings {
        block_connections:   src.get_bool("Net", "BlockConnections", false),
        allowed_ports,
        block_listen:        src.get_bool("Net", "BlockListen", false),
        block_dns_resolve:   src.get_bool("Net", "BlockDNSResolve", false),
        allowed_hosts:       src.get_string("Net", "AllowedHosts").map(|s| split_list(&s)).unwrap_or_default(),
        block_internet_open: src.get_bool("Net", "BlockInternetOpen", false),
    };

    // Borderless only makes sense for the windowed display modes.
    let borderless_mode = d3d9.display_mode == 1 || dxgi.display_mode == 0;
    let window = WindowSettings {
        borderless_upscaling: src.get_bool("Window", "BorderlessUpscaling", false),
        force_borderless:     src.get_bool("Window", "ForceBorderless", false) && borderless_mode,
        cursor_fix:           src.get_cursor_fix(),
    };

    let hooks = HookSettings {
        retry: if src.get_bool("Hooks", "RetryFailedInstall", false) {
            InstallRetry::OnRecheck {
                max_attempts: src.get_clamped("Hooks", "MaxInstallAttempts", 3, 1, 16) as u32,
            }
        } else {
            InstallRetry::Abandon
        },
    };

    let logging = LoggingSettings {
        enable: src.get_bool("Logging", "Enable", true),
        level:  src.get_string("Logging", "Level").unwrap_or_else(|| "INFO".into()),
    };

    Settings { dxgi, d3d9, modules, net, window, hooks, logging }
}

fn resolve_dxgi(src: &ConfigSource) -> DxgiSettings {
    let swap_effect = src.get_string("DXGI", "SwapEffect").and_then(|raw| {
        let parsed = SwapEffect::parse(&raw);
        if parsed.is_none() && !raw.trim().eq_ignore_ascii_case("default") {
            src.notes.borrow_mut().push(format!("DXGI.SwapEffect: unknown effect '{raw}', using default"));
        }
        parsed
    });

    let srv_retry_format = src
        .exists("DXGI", "CreateShaderResourceViewRetryFormat")
        .then(|| src.get_u32("DXGI", "CreateShaderResourceViewRetryFormat", 0));

    let framerate_limit = src.get_float("DXGI", "FramerateLimit", 0.0);
    let frame_interval_us = (framerate_limit > 0.0 && framerate_limit.is_finite())
        .then(|| (1_000_000.0 / framerate_limit) as u64);

    DxgiSettings {
        swap_effect,
        format: src.get_format("DXGI", DXGI_DEFAULT_FORMAT),
        srv_retry_format,
        buffer_count: src.get_clamped("DXGI", "BufferCount", 0, 0, 8) as u32,
        display_mode: src.get_clamped("DXGI", "DisplayMode", -1, -1, 1) as i32,
        enable_tearing: src.get_bool("DXGI", "EnableTearing", false),
        explicit_rebind: src.get_bool("DXGI", "ExplicitRebind", false),
        max_frame_latency: src.get_clamped("DXGI", "MaxFrameLatency", -1, -1, 16) as i32,
        framerate_limit,
        frame_interval_us,
    }
}

fn resolve_d3d9(src: &ConfigSource) -> D3d9Settings {
    D3d9Settings {
        enable_flip: src.get_bool("D3D9", "EnableFlip", false),
        present_interval_immediate: src.get_bool("D3D9", "PresentIntervalImmediate", false),
        buffer_count: src.get_clamped("D3D9", "BufferCount", -1, -1, D3D9_MAX_BACK_BUFFERS) as i32,
        max_frame_latency: src.get_clamped("D3D9", "MaxFrameLatency", -1, -1, 20) as i32,
        create_texture_usage_dynamic: src.get_bool("D3D9", "CreateTextureUsageDynamic", false),
        create_texture_clear_usage_flags: src.get_u32("D3D9", "CreateTextureClearUsageFlags", 0),
        create_index_buffer_usage_dynamic: src.get_bool("D3D9", "CreateIndexBufferUsageDynamic", false),
        create_vertex_buffer_usage_dynamic: src.get_bool("D3D9", "CreateVertexBufferUsageDynamic", false),
        create_cube_texture_usage_dynamic: src.get_bool("D3D9", "CreateCubeTextureUsageDynamic", false),
        create_volume_texture_usage_dynamic: src.get_bool("D3D9", "CreateVolumeTextureUsageDynamic", false),
        force_adapter: src.get_clamped("D3D9", "ForceAdapter", -1, i64::from(i32::MIN), i64::from(i32::MAX)) as i32,
        display_mode: src.get_clamped("D3D9", "DisplayMode", -1, -1, 1) as i32,
        format: src.get_format("D3D9", D3D9_DEFAULT_FORMAT),
    }
}
