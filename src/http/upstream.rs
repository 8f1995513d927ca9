//! Retrying upstream transport.
//!
//! # Responsibilities
//! - Execute the actual round trip to the (possibly rewritten) destination
//! - Retry on transport errors and 5xx responses, immediately, up to a
//!   fixed budget
//! - Scrub hop-by-hop headers and stamp `X-Forwarded-For` before dispatch
//!
//! # Design Decisions
//! - No backoff: the rendering pipeline is latency-sensitive and the
//!   retry budget is small
//! - The request body is buffered once so every attempt replays the
//!   identical request
//! - After exhaustion the last 5xx response is surfaced unmodified; only
//!   all-transport-failures become an error

use std::net::IpAddr;

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, Response};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use thiserror::Error;

use crate::observability::metrics;

/// Headers meaningful only for a single transport leg; never forwarded.
/// Especially important is `connection` because we want a persistent
/// connection to the backend regardless of what the client sent.
const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Request bodies are buffered for replay; GET/HEAD/OPTIONS bodies are
/// empty or tiny, so a small cap protects memory.
const BODY_BUFFER_LIMIT: usize = 1024 * 1024;

/// Error type for upstream forwarding.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("failed to buffer request body: {0}")]
    RequestBody(#[source] axum::Error),
    #[error("upstream request failed after {attempts} attempts: {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: hyper_util::client::legacy::Error,
    },
}

/// HTTP client wrapper that retries transient upstream failures.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client<HttpConnector, Body>,
    max_retries: u32,
}

impl UpstreamClient {
    /// Create a client that retries up to `max_retries` times after the
    /// initial attempt.
    pub fn new(max_retries: u32) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            max_retries,
        }
    }

    /// Forward a request to the destination in its URI, retrying on
    /// transport errors and 5xx responses.
    ///
    /// Returns the first response with status < 500, or the last 5xx
    /// response once the budget is spent. Only a final transport-level
    /// failure is an `Err`; the caller surfaces it as a gateway error.
    pub async fn round_trip(
        &self,
        req: Request<Body>,
        client_ip: IpAddr,
    ) -> Result<Response<Body>, UpstreamError> {
        let (mut parts, body) = req.into_parts();
        let body_bytes = axum::body::to_bytes(body, BODY_BUFFER_LIMIT)
            .await
            .map_err(UpstreamError::RequestBody)?;

        sanitize_headers(&mut parts.headers, client_ip);

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let attempt_req =
                Request::from_parts(parts.clone(), Body::from(body_bytes.clone()));

            match self.client.request(attempt_req).await {
                Ok(response) if response.status().as_u16() < 500 => {
                    return Ok(response.map(Body::new));
                }
                Ok(response) => {
                    if attempt > self.max_retries {
                        tracing::warn!(
                            attempts = attempt,
                            status = %response.status(),
                            url = %parts.uri,
                            "retries exhausted, surfacing last upstream response"
                        );
                        return Ok(response.map(Body::new));
                    }
                    tracing::info!(
                        attempt,
                        status = %response.status(),
                        url = %parts.uri,
                        "retrying after upstream server error"
                    );
                    metrics::record_retry("server_error");
                }
                Err(source) => {
                    if attempt > self.max_retries {
                        return Err(UpstreamError::Transport {
                            attempts: attempt,
                            source,
                        });
                    }
                    tracing::info!(
                        attempt,
                        error = %source,
                        url = %parts.uri,
                        "retrying after transport error"
                    );
                    metrics::record_retry("transport_error");
                }
            }
        }
    }
}

/// Prepare headers for the backend leg: drop hop-by-hop headers, drop the
/// inbound `Host` so the transport derives it from the rewritten URI, and
/// record the original client in `X-Forwarded-For`.
fn sanitize_headers(headers: &mut HeaderMap, client_ip: IpAddr) {
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
    headers.remove(header::HOST);
    if let Ok(value) = header::HeaderValue::from_str(&client_ip.to_string()) {
        headers.insert("x-forwarded-for", value);
    }
}
