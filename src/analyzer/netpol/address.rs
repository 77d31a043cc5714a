//! Heuristic detection of network addresses in free-form values.
//!
//! Env values, container args and ConfigMap values are tested here. A value
//! is accepted when it reads as `host[:port]` (possibly inside a URL) and the
//! host is a DNS-1123 subdomain that is not a plain number. The heuristic is
//! permissive; false positives only add connections that would not exist.

use regex::Regex;
use std::sync::LazyLock;

/// Longest valid DNS-1123 subdomain.
pub const DNS1123_SUBDOMAIN_MAX_LENGTH: usize = 253;

static DNS1123_SUBDOMAIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$").unwrap()
});

/// Whether `value` is a valid DNS-1123 subdomain, as Kubernetes validates hostnames.
pub fn is_dns1123_subdomain(value: &str) -> bool {
    value.len() <= DNS1123_SUBDOMAIN_MAX_LENGTH && DNS1123_SUBDOMAIN_REGEX.is_match(value)
}

/// Decide whether `value` denotes a network address.
///
/// Returns the normalized `host[:port]` on success.
///
/// # Examples
/// - `"svc"` -> `Some("svc")`
/// - `"svc:500"` -> `Some("svc:500")`
/// - `"http://svc:500/path#frag"` -> `Some("svc:500")`
/// - `"123"` -> `None`
pub fn network_address(value: &str) -> Option<String> {
    let candidate = host_candidate(value);
    let host = strip_port(&candidate);

    if !is_dns1123_subdomain(host) {
        return None;
    }
    if host.parse::<i64>().is_ok() {
        return None;
    }

    Some(candidate)
}

/// `host[:port]` of a URL with an authority, otherwise the raw value without
/// query and fragment.
///
/// The port is taken as written: `Url::port` hides the scheme's default
/// port, and `http://svc:80` must stay narrowed to port 80.
fn host_candidate(value: &str) -> String {
    if let Some((_, rest)) = value.split_once("://")
        && let Ok(url) = url::Url::parse(value)
        && let Some(host) = url.host_str()
        && !host.is_empty()
    {
        let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
        let authority = authority.rsplit_once('@').map_or(authority, |(_, hostport)| hostport);
        return match port_suffix(authority) {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
    }

    let end = value.find(['?', '#']).unwrap_or(value.len());
    value[..end].to_string()
}

/// The digits after the last `:`, if any.
fn port_suffix(candidate: &str) -> Option<&str> {
    candidate
        .rsplit_once(':')
        .map(|(_, port)| port)
        .filter(|port| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()))
}

/// Drop a trailing `:<digits>` suffix.
fn strip_port(candidate: &str) -> &str {
    match port_suffix(candidate) {
        Some(port) => &candidate[..candidate.len() - port.len() - 1],
        None => candidate,
    }
}
