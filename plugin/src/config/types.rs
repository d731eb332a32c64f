//! Typed values parsed out of individual configuration keys.
//!
//! Key responsibilities:
//! - Name the enumerated settings (`SwapEffect`, `FormatOverride`,
//!   `CursorFix`, `InstallRetry`).
//! - Parse them from the loose strings/integers found in `FE.toml`.
//! - Split the comma-separated list keys.

use serde::Serialize;
use std::fmt;

/// DXGI swap effect override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapEffect {
    Discard,
    Sequential,
    FlipSequential,
    FlipDiscard,
}

impl SwapEffect {
    /// Accepts the effect name (`flip_discard`, `FlipDiscard`, `flip-discard`)
    /// or its DXGI numeric value. `default` and anything else yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let key: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "discard" | "0" => Some(SwapEffect::Discard),
            "sequential" | "1" => Some(SwapEffect::Sequential),
            "flipsequential" | "3" => Some(SwapEffect::FlipSequential),
            "flipdiscard" | "4" => Some(SwapEffect::FlipDiscard),
            _ => None,
        }
    }

    /// Raw `DXGI_SWAP_EFFECT` value.
    pub fn raw(self) -> u32 {
        match self {
            SwapEffect::Discard => 0,
            SwapEffect::Sequential => 1,
            SwapEffect::FlipSequential => 3,
            SwapEffect::FlipDiscard => 4,
        }
    }
}

impl fmt::Display for SwapEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SwapEffect::Discard => "DXGI_SWAP_EFFECT_DISCARD",
            SwapEffect::Sequential => "DXGI_SWAP_EFFECT_SEQUENTIAL",
            SwapEffect::FlipSequential => "DXGI_SWAP_EFFECT_FLIP_SEQUENTIAL",
            SwapEffect::FlipDiscard => "DXGI_SWAP_EFFECT_FLIP_DISCARD",
        };
        f.write_str(name)
    }
}

/// Back-buffer format override: absent, detected from the host, or fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum FormatOverride {
    #[default]
    Default,
    Auto,
    Fixed(u32),
}

impl fmt::Display for FormatOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatOverride::Default => f.write_str("default"),
            FormatOverride::Auto => f.write_str("auto"),
            FormatOverride::Fixed(v) => write!(f, "{v}"),
        }
    }
}

/// What to do with cursor confinement requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorFix {
    #[default]
    Off,
    /// Confine to the window's monitor at most.
    Clamp,
    /// Never confine.
    Release,
}

impl CursorFix {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "clamp" | "true" | "1" | "yes" | "on" => Some(CursorFix::Clamp),
            "release" => Some(CursorFix::Release),
            "off" | "false" | "0" | "no" | "none" => Some(CursorFix::Off),
            _ => None,
        }
    }
}

/// Policy for a secondary hook installer that reported failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum InstallRetry {
    /// One attempt; a failure leaves the unit inactive for the process lifetime.
    #[default]
    Abandon,
    /// Try again on later rechecks, up to `max_attempts` attempts in total.
    OnRecheck { max_attempts: u32 },
}

impl InstallRetry {
    /// Whether another attempt may follow `attempts` failed ones.
    pub fn allows_retry(self, attempts: u32) -> bool {
        match self {
            InstallRetry::Abandon => false,
            InstallRetry::OnRecheck { max_attempts } => attempts < max_attempts,
        }
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_effect_accepts_names_and_numbers() {
        assert_eq!(SwapEffect::parse("flip_discard"), Some(SwapEffect::FlipDiscard));
        assert_eq!(SwapEffect::parse("FlipSequential"), Some(SwapEffect::FlipSequential));
        assert_eq!(SwapEffect::parse("0"), Some(SwapEffect::Discard));
        assert_eq!(SwapEffect::parse("default"), None);
        assert_eq!(SwapEffect::parse("2"), None);
    }

    #[test]
    fn list_split_drops_blanks() {
        assert_eq!(split_list(" a.dll, ,B.dll,"), vec!["a.dll", "B.dll"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn retry_cap_counts_attempts() {
        let retry = InstallRetry::OnRecheck { max_attempts: 2 };
        assert!(retry.allows_retry(1));
        assert!(!retry.allows_retry(2));
        assert!(!InstallRetry::Abandon.allows_retry(1));
    }
}
