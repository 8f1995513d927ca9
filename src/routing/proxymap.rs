//! Proxymap loading and lookup.
//!
//! The proxymap is a JSON object mapping canonical request URLs to hijack
//! targets:
//!
//! ```json
//! {
//!   "http://proxyme/index.html": { "url": "http://127.0.0.1:9000/index.html", "mimetype": "text/html" }
//! }
//! ```
//!
//! Loaded once at startup, immutable afterwards, safe for unsynchronized
//! concurrent reads.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::routing::normalize::without_query;

/// One hijack target: where to really fetch a canonical URL from, plus an
/// optional Content-Type to stamp on the response. The override enables
/// serving the same destination with different mimetypes per request
/// (imagine a file served as text/html in one request and text/plain in
/// another).
#[derive(Debug, Clone, Deserialize)]
pub struct ProxymapEntry {
    /// Target URL the request is redirected to.
    pub url: String,
    /// Content-Type override for the response, if any.
    #[serde(default)]
    pub mimetype: Option<String>,
}

/// Error type for proxymap loading.
#[derive(Debug, Error)]
pub enum ProxymapError {
    #[error("failed to read proxymap file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse proxymap file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("proxymap entry for {key:?} has an empty target url")]
    EmptyTarget { key: String },
}

/// Static mapping from canonical request URL to hijack target.
#[derive(Debug, Default)]
pub struct ProxyMap {
    entries: HashMap<String, ProxymapEntry>,
}

impl ProxyMap {
    /// Load a proxymap from a JSON file. Any failure here is fatal to
    /// startup; the proxy must not serve traffic with a partial map.
    pub fn from_file(path: &Path) -> Result<Self, ProxymapError> {
        let data = fs::read_to_string(path)?;
        let raw: HashMap<String, ProxymapEntry> = serde_json::from_str(&data)?;
        Self::from_entries(raw)
    }

    /// Build a proxymap from already-parsed entries, validating and
    /// canonicalizing as it goes.
    pub fn from_entries(raw: HashMap<String, ProxymapEntry>) -> Result<Self, ProxymapError> {
        let mut entries = HashMap::with_capacity(raw.len());
        for (key, mut entry) in raw {
            if entry.url.is_empty() {
                return Err(ProxymapError::EmptyTarget { key });
            }
            // An empty override means no override.
            if entry.mimetype.as_deref() == Some("") {
                entry.mimetype = None;
            }
            // Keys are stored in canonical URL form so lookups match no
            // matter how the file spelled host case or the default port.
            let canonical = match Url::parse(&key) {
                Ok(url) => url.to_string(),
                Err(_) => key,
            };
            entries.insert(canonical, entry);
        }
        Ok(Self { entries })
    }

    /// Look up a canonical URL, falling back once to its query-stripped
    /// form. Static fixture servers ignore cache-busting query parameters,
    /// so `/app.js?bust=123` should still hit an entry keyed `/app.js`.
    /// Exactly one level of fallback; a miss on the path-only form is a
    /// miss.
    pub fn lookup(&self, url: &Url) -> Option<&ProxymapEntry> {
        if let Some(entry) = self.entries.get(url.as_str()) {
            return Some(entry);
        }
        if url.query().is_some() {
            return self.entries.get(without_query(url).as_str());
        }
        None
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(url: &str, mimetype: Option<&str>) -> ProxymapEntry {
        ProxymapEntry {
            url: url.to_string(),
            mimetype: mimetype.map(String::from),
        }
    }

    fn map_of(pairs: &[(&str, ProxymapEntry)]) -> ProxyMap {
        let raw = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        ProxyMap::from_entries(raw).unwrap()
    }

    #[test]
    fn test_exact_lookup() {
        let map = map_of(&[(
            "http://proxyme/index.html",
            entry("http://127.0.0.1:9000/index.html", Some("text/html")),
        )]);
        let url = Url::parse("http://proxyme/index.html").unwrap();
        let hit = map.lookup(&url).unwrap();
        assert_eq!(hit.url, "http://127.0.0.1:9000/index.html");
        assert_eq!(hit.mimetype.as_deref(), Some("text/html"));
    }

    #[test]
    fn test_query_strip_fallback() {
        let map = map_of(&[("http://proxyme/app.js", entry("http://127.0.0.1:9000/app.js", None))]);
        let url = Url::parse("http://proxyme/app.js?cachebust=123").unwrap();
        assert!(map.lookup(&url).is_some());
    }

    #[test]
    fn test_exact_match_wins_over_fallback() {
        let map = map_of(&[
            ("http://proxyme/app.js?v=2", entry("http://127.0.0.1:9000/app-v2.js", None)),
            ("http://proxyme/app.js", entry("http://127.0.0.1:9000/app.js", None)),
        ]);
        let url = Url::parse("http://proxyme/app.js?v=2").unwrap();
        assert_eq!(map.lookup(&url).unwrap().url, "http://127.0.0.1:9000/app-v2.js");
    }

    #[test]
    fn test_miss_is_a_miss() {
        let map = map_of(&[("http://proxyme/app.js", entry("http://127.0.0.1:9000/app.js", None))]);
        let url = Url::parse("http://proxyme/other.js?x=1").unwrap();
        assert!(map.lookup(&url).is_none());
    }

    #[test]
    fn test_keys_are_canonicalized() {
        let map = map_of(&[(
            "http://PROXYME:80/logo.png",
            entry("http://127.0.0.1:9000/logo.png", None),
        )]);
        let url = Url::parse("http://proxyme/logo.png").unwrap();
        assert!(map.lookup(&url).is_some());
    }

    #[test]
    fn test_empty_target_url_is_fatal() {
        let raw: HashMap<String, ProxymapEntry> =
            [("http://proxyme/broken".to_string(), entry("", None))]
                .into_iter()
                .collect();
        let err = ProxyMap::from_entries(raw).unwrap_err();
        assert!(matches!(err, ProxymapError::EmptyTarget { .. }));
    }

    #[test]
    fn test_empty_mimetype_normalized_to_none() {
        let map = map_of(&[(
            "http://proxyme/plain.bin",
            entry("http://127.0.0.1:9000/plain.bin", Some("")),
        )]);
        let url = Url::parse("http://proxyme/plain.bin").unwrap();
        assert!(map.lookup(&url).unwrap().mimetype.is_none());
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("snapproxy-map-{}.json", std::process::id()));
        fs::write(
            &path,
            r#"{
                "http://proxyme/index.html": { "url": "http://127.0.0.1:9000/index.html", "mimetype": "text/html" },
                "http://proxyme/data.bin": { "url": "http://127.0.0.1:9000/data.bin" }
            }"#,
        )
        .unwrap();

        let map = ProxyMap::from_file(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(map.len(), 2);
        let url = Url::parse("http://proxyme/data.bin").unwrap();
        assert!(map.lookup(&url).unwrap().mimetype.is_none());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = ProxyMap::from_file(Path::new("/nonexistent/proxymap.json")).unwrap_err();
        assert!(matches!(err, ProxymapError::Io(_)));
    }
}
