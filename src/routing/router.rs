//! Request classification and dispatch decision.
//!
//! # Responsibilities
//! - Gate methods to GET/HEAD/OPTIONS
//! - Rewrite local-hostname requests onto the proxy-me hostname
//! - Decide hijack / reject / passthrough per request
//! - Rewrite the request URI in place for forwarding
//!
//! # Design Decisions
//! - Immutable after construction except the hostname cache
//! - An expected-local URL without a mapping is rejected, never fetched
//!   live (the proxy-me host is not publicly routable and would hang)
//! - Rejections carry their terminal HTTP status

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, Uri};
use url::Url;

use crate::routing::blacklist::UrlBlacklist;
use crate::routing::hostname::HostnameClassifier;
use crate::routing::normalize::{effective_url, just_hostname};
use crate::routing::proxymap::ProxyMap;

/// Why a request was rejected without forwarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Method outside GET/HEAD/OPTIONS.
    MethodNotAllowed,
    /// Expected-local URL with no proxymap entry.
    UnmappedLocal,
    /// URL matches a blacklist prefix.
    Blacklisted,
    /// Proxymap target URL does not parse as an absolute URL.
    BadTarget,
}

impl Rejection {
    /// Terminal status surfaced to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Rejection::UnmappedLocal | Rejection::Blacklisted => StatusCode::NOT_FOUND,
            Rejection::BadTarget => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::MethodNotAllowed => "method_not_allowed",
            Rejection::UnmappedLocal => "unmapped_local",
            Rejection::Blacklisted => "blacklisted",
            Rejection::BadTarget => "bad_target",
        }
    }
}

/// What should happen to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Redirected to a proxymap target.
    Hijacked,
    /// Terminated here with a status code.
    Rejected(Rejection),
    /// Forwarded to its original destination.
    LivePassthrough,
}

impl Disposition {
    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Hijacked => "hijacked",
            Disposition::Rejected(_) => "rejected",
            Disposition::LivePassthrough => "passthrough",
        }
    }
}

/// Per-request classification result. Created here, consumed by the
/// response rewriter, discarded when the request completes.
#[derive(Debug, Clone)]
pub struct RequestClassification {
    pub disposition: Disposition,
    /// Content-Type to stamp on the response, from the proxymap entry.
    pub mimetype_override: Option<String>,
    /// The URL the client asked for, before any rewriting.
    pub original_url: String,
}

impl RequestClassification {
    fn rejected(rejection: Rejection, original_url: String) -> Self {
        Self {
            disposition: Disposition::Rejected(rejection),
            mimetype_override: None,
            original_url,
        }
    }
}

/// Orchestrates classifier, proxymap, and blacklist into a per-request
/// decision, rewriting the request URI as a side effect.
pub struct RequestRouter {
    classifier: HostnameClassifier,
    proxymap: Arc<ProxyMap>,
    blacklist: UrlBlacklist,
    proxyme_hostname: String,
}

impl RequestRouter {
    /// Create a router over an already-loaded proxymap.
    pub fn new(
        classifier: HostnameClassifier,
        proxymap: Arc<ProxyMap>,
        blacklist: UrlBlacklist,
        proxyme_hostname: String,
    ) -> Self {
        Self {
            classifier,
            proxymap,
            blacklist,
            proxyme_hostname,
        }
    }

    /// The hostname local requests are rewritten onto.
    pub fn proxyme_hostname(&self) -> &str {
        &self.proxyme_hostname
    }

    /// Classify a request, rewriting its URI in place when it is to be
    /// forwarded. The state machine, in order: method gate, local
    /// rewrite, proxymap lookup, blacklist, passthrough.
    pub async fn classify(&self, req: &mut Request<Body>) -> RequestClassification {
        if !matches!(
            *req.method(),
            Method::GET | Method::HEAD | Method::OPTIONS
        ) {
            tracing::warn!(method = %req.method(), uri = %req.uri(), "rejecting disallowed method");
            return RequestClassification::rejected(
                Rejection::MethodNotAllowed,
                req.uri().to_string(),
            );
        }

        let Some(mut url) = effective_url(req) else {
            // No usable destination (origin-form without a Host header).
            // The empty hostname cannot resolve, so it lands in the local
            // path and misses the proxymap.
            tracing::warn!(uri = %req.uri(), "request has no usable destination");
            return RequestClassification::rejected(Rejection::UnmappedLocal, req.uri().to_string());
        };
        let original_url = url.to_string();

        // Local rewrite must happen before the proxymap lookup: keys are
        // expressed against the proxy-me hostname for local resources.
        let hostname = just_hostname(url.host_str().unwrap_or_default()).to_string();
        if self.classifier.is_local(&hostname).await {
            let host_ok = url.set_host(Some(&self.proxyme_hostname)).is_ok();
            if !host_ok || url.set_port(None).is_err() {
                tracing::error!(
                    proxyme = %self.proxyme_hostname,
                    "proxy-me hostname is not a valid URL host"
                );
                return RequestClassification::rejected(Rejection::BadTarget, original_url);
            }
        }

        let should_be_proxied =
            url.scheme() == "http" && url.host_str() == Some(self.proxyme_hostname.as_str());

        if should_be_proxied {
            if let Some(entry) = self.proxymap.lookup(&url) {
                let target = match Url::parse(&entry.url) {
                    Ok(target) if target.has_host() => target,
                    _ => {
                        tracing::error!(
                            url = %original_url,
                            target = %entry.url,
                            "proxymap target is not an absolute URL"
                        );
                        return RequestClassification::rejected(Rejection::BadTarget, original_url);
                    }
                };
                let Ok(target_uri) = target.as_str().parse::<Uri>() else {
                    return RequestClassification::rejected(Rejection::BadTarget, original_url);
                };

                tracing::info!(from = %original_url, to = %target, "hijacking proxymapped request");
                *req.uri_mut() = target_uri;
                return RequestClassification {
                    disposition: Disposition::Hijacked,
                    mimetype_override: entry.mimetype.clone(),
                    original_url,
                };
            }

            tracing::warn!(url = %original_url, "expected-local url has no proxymap entry");
            return RequestClassification::rejected(Rejection::UnmappedLocal, original_url);
        }

        if self.blacklist.is_blacklisted_url(&url) {
            tracing::info!(url = %original_url, "refusing blacklisted url");
            return RequestClassification::rejected(Rejection::Blacklisted, original_url);
        }

        // Passthrough still needs an absolute URI so the transport knows
        // where to connect (origin-form requests arrive with a bare path).
        let Ok(passthrough_uri) = url.as_str().parse::<Uri>() else {
            return RequestClassification::rejected(Rejection::BadTarget, original_url);
        };
        tracing::debug!(url = %original_url, "passing request through live");
        *req.uri_mut() = passthrough_uri;
        RequestClassification {
            disposition: Disposition::LivePassthrough,
            mimetype_override: None,
            original_url,
        }
    }
}
