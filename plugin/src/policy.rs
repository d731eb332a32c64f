//! # Filter Policy
//!
//! Pure allow/deny decisions over the read-only lists built at startup.
//!
//! Every decision is a [`Verdict`]. `EvaluationFailed` carries the reason the
//! call could not be judged and is mapped to *allow* by [`Verdict::permits`]:
//! failing closed could break the host's own startup.

use std::{collections::HashSet, hash::Hash};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("null {0} argument")]
    NullArgument(&'static str),

    #[error("{0} is not decodable")]
    InvalidEncoding(&'static str),

    #[error("socket address too short ({0} bytes)")]
    ShortAddress(usize),

    #[error("unsupported address family {0}")]
    UnsupportedFamily(u16),

    #[error("filter evaluation panicked")]
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny,
    EvaluationFailed(FilterError),
}

impl Verdict {
    /// Fail-open: only an explicit `Deny` blocks the call.
    pub fn permits(&self) -> bool {
        !matches!(self, Verdict::Deny)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Allow => "allow",
            Verdict::Deny => "deny",
            Verdict::EvaluationFailed(_) => "evaluation_failed",
        }
    }
}

/// Last path component, split on either separator.
pub fn file_name_component(path: &str) -> &str {
    match path.rfind(['\\', '/']) {
        Some(i) => &path[i + 1..],
        None => path,
    }
}

/// Case-folded module name with the loader's extension defaulting: a name
/// without an extension means `<name>.dll`, a trailing `.` means "no
/// extension".
pub fn normalize_module_name(file_name: &str) -> String {
    let mut name = file_name.trim().to_lowercase();
    if let Some(stripped) = name.strip_suffix('.') {
        name = stripped.to_owned();
    } else if !name.contains('.') && !name.is_empty() {
        name.push_str(".dll");
    }
    name
}

/// Blocked module names, normalized once.
#[derive(Debug, Clone, Default)]
pub struct BlockList {
    names: HashSet<String>,
}

impl BlockList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|n| normalize_module_name(file_name_component(n.as_ref())))
            .filter(|n| !n.is_empty())
            .collect();
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Judge a requested path by its file name alone.
    pub fn evaluate(&self, path: &str) -> Verdict {
        let name = normalize_module_name(file_name_component(path));
        if self.names.contains(&name) {
            Verdict::Deny
        } else {
            Verdict::Allow
        }
    }
}

/// An operation gate with an optional allow-list.
///
/// - disabled → allow everything
/// - enabled, empty list → deny everything
/// - enabled, list → deny unless the target is listed
#[derive(Debug, Clone)]
pub struct AllowListRule<T: Eq + Hash> {
    enabled: bool,
    allowed: HashSet<T>,
}

impl<T: Eq + Hash> AllowListRule<T> {
    pub fn new(enabled: bool, allowed: impl IntoIterator<Item = T>) -> Self {
        Self { enabled, allowed: allowed.into_iter().collect() }
    }

    /// A gate without allow-list: when enabled, every call is denied.
    pub fn gate(enabled: bool) -> Self {
        Self { enabled, allowed: HashSet::new() }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn evaluate(&self, target: &T) -> Verdict {
        if !self.enabled || self.allowed.contains(target) {
            Verdict::Allow
        } else {
            Verdict::Deny
        }
    }

    /// Decision for calls whose target is irrelevant (listen, session open).
    pub fn evaluate_any(&self) -> Verdict {
        if self.enabled { Verdict::Deny } else { Verdict::Allow }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_ignores_directories() {
        assert_eq!(file_name_component(r"C:\Windows\System32\evil.dll"), "evil.dll");
        assert_eq!(file_name_component("plugins/evil.dll"), "evil.dll");
        assert_eq!(file_name_component("evil.dll"), "evil.dll");
        assert_eq!(file_name_component(r"C:\dir\"), "");
    }

    #[test]
    fn module_names_default_to_dll_extension() {
        assert_eq!(normalize_module_name("EVIL"), "evil.dll");
        assert_eq!(normalize_module_name("Evil.DLL"), "evil.dll");
        assert_eq!(normalize_module_name("evil."), "evil");
        assert_eq!(normalize_module_name("evil.drv"), "evil.drv");
    }

    #[test]
    fn block_list_matches_any_directory_and_case() {
        let list = BlockList::new(["evil.dll"]);
        assert_eq!(list.evaluate(r"C:\Games\bin\EVIL.dll"), Verdict::Deny);
        assert_eq!(list.evaluate("evil"), Verdict::Deny);
        assert_eq!(list.evaluate("evil."), Verdict::Allow);
        assert_eq!(list.evaluate(r"C:\evil.dll\good.dll"), Verdict::Allow);
    }

    #[test]
    fn evaluation_failure_permits() {
        assert!(Verdict::EvaluationFailed(FilterError::NullArgument("path")).permits());
        assert!(!Verdict::Deny.permits());
    }

    #[test]
    fn allow_list_semantics() {
        let off = AllowListRule::new(false, [80u16]);
        assert_eq!(off.evaluate(&8080), Verdict::Allow);

        let deny_all = AllowListRule::<u16>::new(true, []);
        assert_eq!(deny_all.evaluate(&80), Verdict::Deny);

        let listed = AllowListRule::new(true, [80u16, 443]);
        assert_eq!(listed.evaluate(&443), Verdict::Allow);
        assert_eq!(listed.evaluate(&8080), Verdict::Deny);
    }
}
