//! Known-bad URL filter.
//!
//! Some third-party resources must never be fetched during a render, even
//! as passthrough traffic. Literal prefix match only, no wildcards or
//! regex. Matching runs against the URL string exactly as the client sent
//! it, so prefixes with an explicit `:80` keep working.

use url::Url;

/// Static prefix filter for URLs that must never be fetched live.
#[derive(Debug, Clone)]
pub struct UrlBlacklist {
    prefixes: Vec<String>,
}

impl UrlBlacklist {
    /// Create a blacklist from literal URL prefixes.
    pub fn new(prefixes: Vec<String>) -> Self {
        Self { prefixes }
    }

    /// Returns true iff `url` starts with any configured prefix.
    pub fn is_blacklisted(&self, url: &str) -> bool {
        self.prefixes.iter().any(|prefix| url.starts_with(prefix))
    }

    /// Normalized-form check, for URLs that already went through the `url`
    /// crate (which drops a default `:80`). Tries both spellings so a
    /// prefix written either way still matches.
    pub fn is_blacklisted_url(&self, url: &Url) -> bool {
        if self.is_blacklisted(url.as_str()) {
            return true;
        }
        // Re-add the default port, since several real-world prefixes are
        // written with an explicit :80.
        if url.scheme() == "http" && url.port().is_none() {
            if let Some(host) = url.host_str() {
                let mut with_port = format!("http://{}:80{}", host, url.path());
                if let Some(query) = url.query() {
                    with_port.push('?');
                    with_port.push_str(query);
                }
                return self.is_blacklisted(&with_port);
            }
        }
        false
    }

    /// Number of configured prefixes.
    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    /// Whether no prefixes are configured.
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}
