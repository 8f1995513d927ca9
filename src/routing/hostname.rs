//! Local-hostname classification.
//!
//! The rendering environment serves fixtures under hostnames like
//! `testserver` or `local.dev` that do not resolve in its DNS context.
//! Requests to such hosts must be redirected to the proxy-me endpoint, so
//! "does this hostname resolve?" is the classification signal: unresolvable
//! means local.
//!
//! # Design Decisions
//! - IP literals never trigger DNS work; only `127.0.0.1` counts as local
//! - Negative lookups are slow, so hostnames once classified local are
//!   cached for the process lifetime (no eviction)
//! - Resolvable hostnames are not cached; they stay subject to live DNS

use std::net::IpAddr;
use std::sync::Arc;

use dashmap::DashMap;

/// Decides whether a hostname refers to the local test environment.
///
/// Cheap to clone; clones share the same cache.
#[derive(Clone, Default)]
pub struct HostnameClassifier {
    known_local: Arc<DashMap<String, ()>>,
}

impl HostnameClassifier {
    /// Create a classifier with an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record hostnames as local without consulting DNS. Idempotent.
    ///
    /// Called at startup to pre-seed well-known aliases so the common case
    /// needs zero lookups.
    pub fn mark_local<I, S>(&self, hostnames: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for hostname in hostnames {
            self.known_local.insert(hostname.into(), ());
        }
    }

    /// Whether `hostname` should be treated as the local test environment.
    ///
    /// IP literals short-circuit before the cache: only `127.0.0.1` is
    /// local, everything else is not, regardless of what was marked. For
    /// names, a cache hit answers immediately; otherwise a forward DNS
    /// lookup decides, and a lookup that errors or yields no addresses
    /// classifies the hostname as local and caches that verdict.
    pub async fn is_local(&self, hostname: &str) -> bool {
        if hostname.parse::<IpAddr>().is_ok() {
            return hostname == "127.0.0.1";
        }

        if self.known_local.contains_key(hostname) {
            return true;
        }

        // Port 0 placeholder; only resolution matters here.
        let resolved = match tokio::net::lookup_host((hostname, 0u16)).await {
            Ok(mut addrs) => addrs.next().is_some(),
            Err(_) => false,
        };

        if resolved {
            return false;
        }

        tracing::debug!(hostname, "unresolvable hostname classified as local");
        self.known_local.insert(hostname.to_string(), ());
        true
    }

    /// Number of hostnames currently cached as local.
    pub fn cached_count(&self) -> usize {
        self.known_local.len()
    }
}
