//! Guessing full server URLs from what a user typed

use url::Url;

use crate::protocol::constants::DEFAULT_PORT;

/// Expand a raw server address into candidate base URLs.
///
/// `clip.example.com` becomes `https://clip.example.com:2586` and
/// `https://clip.example.com:443`; an address with an explicit port yields
/// just that one. Input that cannot be parsed is passed through with an
/// `https://` prefix so the discovery error names what was tried.
pub fn expand_candidates(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };

    let url = match Url::parse(&with_scheme) {
        Ok(url) => url,
        Err(_) => return vec![with_scheme],
    };
    let host = match url.host_str() {
        Some(host) if !host.is_empty() => host,
        _ => return vec![with_scheme],
    };
    let scheme = url.scheme();

    let mut candidates = Vec::with_capacity(2);
    if let Some(port) = url.port().or_else(|| explicit_port(&with_scheme)) {
        candidates.push(format!("{scheme}://{host}:{port}"));
    } else {
        candidates.push(format!("{scheme}://{host}:{DEFAULT_PORT}"));
        if let Some(port) = url.port_or_known_default() {
            candidates.push(format!("{scheme}://{host}:{port}"));
        }
    }
    candidates.dedup();
    candidates
}

// `Url` elides a port equal to the scheme default, so look at the raw authority.
fn explicit_port(with_scheme: &str) -> Option<u16> {
    let rest = with_scheme.split_once("://").map_or(with_scheme, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, host_port)| host_port);
    let after_host = match host_port.strip_prefix('[') {
        Some(bracketed) => bracketed.split_once(']').map_or("", |(_, after)| after),
        None => host_port,
    };
    after_host.rsplit_once(':').and_then(|(_, port)| port.parse().ok())
}
