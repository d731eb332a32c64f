// src/intercept/network.rs

//! # Network Filter
//!
//! Policy for outbound connects, listening sockets, DNS lookups and WinInet
//! session creation.
//!
//! Key responsibilities:
//! - Build one [`AllowListRule`] per operation from `[Net]`.
//! - Read the destination port out of a raw `sockaddr`.
//! - Map a denial to the error code the native call reports.

use crate::config::model::NetSettings;
use crate::context::Context;
use crate::fe_log;
use crate::intercept::{guarded, TextArg};
use crate::platform::codes::{ERROR_ACCESS_DENIED, WSAEACCES, WSAECONNREFUSED, WSAHOST_NOT_FOUND};
use crate::policy::{AllowListRule, FilterError, Verdict};
use log::Level;

/// `AF_INET`
pub const AF_INET: u16 = 2;
/// `AF_INET6`
pub const AF_INET6: u16 = 23;

const SOCKADDR_IN_LEN: usize = 16;
const SOCKADDR_IN6_LEN: usize = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetOp {
    Connect,
    Listen,
    Resolve,
    SessionOpen,
}

impl NetOp {
    pub fn label(self) -> &'static str {
        match self {
            NetOp::Connect => "connect",
            NetOp::Listen => "listen",
            NetOp::Resolve => "resolve",
            NetOp::SessionOpen => "session_open",
        }
    }

    /// Last-error value reported when the call is denied.
    pub fn denial_code(self) -> u32 {
        match self {
            NetOp::Connect => WSAECONNREFUSED,
            NetOp::Listen => WSAEACCES,
            NetOp::Resolve => WSAHOST_NOT_FOUND,
            NetOp::SessionOpen => ERROR_ACCESS_DENIED,
        }
    }
}

/// Destination port of a raw socket address, host byte order.
pub fn port_from_sockaddr(addr: &[u8]) -> Result<u16, FilterError> {
    if addr.len() < 2 {
        return Err(FilterError::ShortAddress(addr.len()));
    }
    let family = u16::from_le_bytes([addr[0], addr[1]]);
    let needed = match family {
        AF_INET => SOCKADDR_IN_LEN,
        AF_INET6 => SOCKADDR_IN6_LEN,
        other => return Err(FilterError::UnsupportedFamily(other)),
    };
    if addr.len() < needed {
        return Err(FilterError::ShortAddress(addr.len()));
    }
    Ok(u16::from_be_bytes([addr[2], addr[3]]))
}

#[derive(Debug, Clone)]
pub struct NetworkFilter {
    connect: AllowListRule<u16>,
    listen:  AllowListRule<()>,
    dns:     AllowListRule<String>,
    session: AllowListRule<()>,
}

impl NetworkFilter {
    pub fn new(cfg: &NetSettings) -> Self {
        Self {
            connect: AllowListRule::new(cfg.block_connections, cfg.allowed_ports.iter().copied()),
            listen:  AllowListRule::gate(cfg.block_listen),
            dns:     AllowListRule::new(cfg.block_dns_resolve, cfg.allowed_hosts.iter().cloned()),
            session: AllowListRule::gate(cfg.block_internet_open),
        }
    }

    /// `None` is a null `name` argument.
    pub fn check_connect(&self, addr: Option<&[u8]>) -> Verdict {
        if !self.connect.is_enabled() {
            return Verdict::Allow;
        }
        let Some(addr) = addr else {
            return Verdict::EvaluationFailed(FilterError::NullArgument("name"));
        };
        match port_from_sockaddr(addr) {
            Ok(port) => guarded(|| self.connect.evaluate(&port)),
            Err(e) => Verdict::EvaluationFailed(e),
        }
    }

    pub fn check_listen(&self) -> Verdict {
        self.listen.evaluate_any()
    }

    /// Host names match exactly, as the application spelled them.
    pub fn check_resolve(&self, host: TextArg<'_>) -> Verdict {
        if !self.dns.is_enabled() {
            return Verdict::Allow;
        }
        match host.to_string_lossy() {
            Some(name) => guarded(|| self.dns.evaluate(&name)),
            None => Verdict::EvaluationFailed(FilterError::NullArgument("node name")),
        }
    }

    pub fn check_session_open(&self) -> Verdict {
        self.session.evaluate_any()
    }
}

/// Apply a network verdict: on deny set `op`'s error code and return
/// `denied`; otherwise call the original once and return its result.
pub fn intercept_net<R>(
    cx: &Context,
    op: NetOp,
    verdict: Verdict,
    denied: R,
    forward: impl FnOnce() -> R,
) -> R {
    metrics::counter!("fe_net_calls_total", "op" => op.label(), "verdict" => verdict.label())
        .increment(1);
    match verdict {
        Verdict::Deny => {
            fe_log!(Level::Info, "net", "Blocked {}", op.label());
            cx.platform().set_last_error(op.denial_code());
            denied
        }
        Verdict::EvaluationFailed(e) => {
            fe_log!(Level::Warn, "net", "Exception while filtering {}: {}", op.label(), e);
            forward()
        }
        Verdict::Allow => forward(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sockaddr_in(port: u16) -> [u8; 16] {
        let mut raw = [0u8; 16];
        raw[0..2].copy_from_slice(&AF_INET.to_le_bytes());
        raw[2..4].copy_from_slice(&port.to_be_bytes());
        raw[4..8].copy_from_slice(&[127, 0, 0, 1]);
        raw
    }

    fn sockaddr_in6(port: u16) -> [u8; 28] {
        let mut raw = [0u8; 28];
        raw[0..2].copy_from_slice(&AF_INET6.to_le_bytes());
        raw[2..4].copy_from_slice(&port.to_be_bytes());
        raw
    }

    fn filter(cfg: NetSettings) -> NetworkFilter {
        NetworkFilter::new(&cfg)
    }

    #[test]
    fn ports_are_read_in_network_order() {
        assert_eq!(port_from_sockaddr(&sockaddr_in(443)), Ok(443));
        assert_eq!(port_from_sockaddr(&sockaddr_in6(8080)), Ok(8080));
    }

    #[test]
    fn malformed_addresses_are_evaluation_failures() {
        assert_eq!(port_from_sockaddr(&[2]), Err(FilterError::ShortAddress(1)));
        assert_eq!(port_from_sockaddr(&sockaddr_in6(80)[..16]), Err(FilterError::ShortAddress(16)));

        let mut unix = sockaddr_in(80);
        unix[0] = 1;
        assert_eq!(port_from_sockaddr(&unix), Err(FilterError::UnsupportedFamily(1)));
    }

    #[test]
    fn connect_allow_list() {
        let f = filter(NetSettings {
            block_connections: true,
            allowed_ports: vec![80, 443],
            ..Default::default()
        });
        assert_eq!(f.check_connect(Some(&sockaddr_in(80)[..])), Verdict::Allow);
        assert_eq!(f.check_connect(Some(&sockaddr_in6(443)[..])), Verdict::Allow);
        assert_eq!(f.check_connect(Some(&sockaddr_in(8080)[..])), Verdict::Deny);
        assert!(f.check_connect(None).permits());
    }

    #[test]
    fn disabled_connect_filter_does_not_parse() {
        let f = filter(NetSettings::default());
        assert_eq!(f.check_connect(Some(&[0xffu8][..])), Verdict::Allow);
        assert_eq!(f.check_connect(None), Verdict::Allow);
    }

    #[test]
    fn dns_hosts_match_exactly() {
        let f = filter(NetSettings {
            block_dns_resolve: true,
            allowed_hosts: vec!["api.example.com".into()],
            ..Default::default()
        });
        assert_eq!(f.check_resolve(TextArg::Narrow(b"api.example.com")), Verdict::Allow);
        assert_eq!(f.check_resolve(TextArg::Narrow(b"cdn.example.com")), Verdict::Deny);
        let w: Vec<u16> = "api.example.com".encode_utf16().collect();
        assert_eq!(f.check_resolve(TextArg::Wide(&w)), Verdict::Allow);
    }

    #[test]
    fn listen_and_session_are_plain_gates() {
        let f = filter(NetSettings { block_listen: true, ..Default::default() });
        assert_eq!(f.check_listen(), Verdict::Deny);
        assert_eq!(f.check_session_open(), Verdict::Allow);

        let f = filter(NetSettings { block_internet_open: true, ..Default::default() });
        assert_eq!(f.check_session_open(), Verdict::Deny);
        assert_eq!(NetOp::SessionOpen.denial_code(), ERROR_ACCESS_DENIED);
    }
}
