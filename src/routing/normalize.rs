//! Host and URL canonicalization.
//!
//! Proxymap keys are canonical URL strings: scheme + lowercase host with no
//! default port + path (+ optional query). Every lookup key is derived here
//! so that lookups behave the same regardless of how the client expressed
//! host, port, or query.

use axum::body::Body;
use axum::http::{header, Request};
use url::Url;

/// Strip an optional `:port` suffix from a host value.
///
/// Handles the inconvenient combos: `"example.com:8080"` → `"example.com"`,
/// bracketed IPv6 `"[::1]:8080"` → `"::1"`, and leaves bare hosts and bare
/// IPv6 literals untouched.
pub fn just_hostname(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            return &rest[..end];
        }
    }
    match host.rfind(':') {
        // Multiple colons without brackets: a bare IPv6 literal, no port.
        Some(idx) if host[..idx].contains(':') => host,
        Some(idx) => &host[..idx],
        None => host,
    }
}

/// Reconstruct the full URL a request is aimed at.
///
/// Proxied clients send absolute-form request targets, which are used
/// as-is. Direct (origin-form) requests are joined with their `Host`
/// header under `http`. Returns `None` when neither yields a parseable
/// absolute URL.
pub fn effective_url(req: &Request<Body>) -> Option<Url> {
    let uri = req.uri();
    if uri.scheme().is_some() && uri.authority().is_some() {
        return Url::parse(&uri.to_string()).ok();
    }

    let host = req.headers().get(header::HOST)?.to_str().ok()?;
    if host.is_empty() {
        return None;
    }
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    Url::parse(&format!("http://{}{}", host, path_and_query)).ok()
}

/// The same URL with the query string (and fragment) removed.
///
/// Used for the single-level proxymap fallback: static fixture servers
/// ignore cache-busting query parameters, so the path-only form is tried
/// once when the full form misses.
pub fn without_query(url: &Url) -> Url {
    let mut stripped = url.clone();
    stripped.set_query(None);
    stripped.set_fragment(None);
    stripped
}
