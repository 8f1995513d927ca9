//! HTTP server setup and request handling.
//!
//! # Responsibilities
//! - Create the Axum router (catch-all proxy routes plus `/healthz`)
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind the server to a listener with graceful shutdown
//! - Translate classifications into responses
//! - Observability (metrics, request IDs)

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::rewrite;
use crate::http::upstream::UpstreamClient;
use crate::observability::metrics;
use crate::routing::{
    Disposition, HostnameClassifier, ProxyMap, RequestRouter, UrlBlacklist,
};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<RequestRouter>,
    pub upstream: UpstreamClient,
}

/// HTTP server for the rendering proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server over an already-loaded proxymap.
    pub fn new(config: ProxyConfig, proxymap: ProxyMap) -> Self {
        // Pre-seed well-known local aliases so the common case needs zero
        // DNS lookups.
        let classifier = HostnameClassifier::new();
        classifier.mark_local([
            "localhost".to_string(),
            "127.0.0.1".to_string(),
            config.routing.proxyme_hostname.clone(),
        ]);
        classifier.mark_local(config.routing.local_hostnames.iter().cloned());

        let request_router = Arc::new(RequestRouter::new(
            classifier,
            Arc::new(proxymap),
            UrlBlacklist::new(config.routing.blacklist_prefixes.clone()),
            config.routing.proxyme_hostname.clone(),
        ));
        let upstream = UpstreamClient::new(config.retries.max_retries);

        let state = AppState {
            router: request_router,
            upstream,
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/healthz", any(healthz_handler))
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            proxyme = %self.config.routing.proxyme_hostname,
            "proxy server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("proxy server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Healthcheck endpoint for the proxy itself.
async fn healthz_handler() -> &'static str {
    "ok"
}

/// Main proxy handler: classify, forward, rewrite.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    mut request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();

    let classification = state.router.classify(&mut request).await;

    if let Disposition::Rejected(rejection) = classification.disposition {
        let status = rejection.status();
        metrics::record_request(&method, status.as_u16(), rejection.as_str(), start_time);
        return (status, status.canonical_reason().unwrap_or_default()).into_response();
    }
    let disposition = classification.disposition.as_str();

    let response = match state.upstream.round_trip(request, addr.ip()).await {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(
                url = %classification.original_url,
                error = %err,
                "upstream request failed"
            );
            metrics::record_request(&method, 502, disposition, start_time);
            return (StatusCode::BAD_GATEWAY, "upstream request failed").into_response();
        }
    };

    let status = response.status();
    match rewrite::process(response, &classification).await {
        Ok(rewritten) => {
            metrics::record_request(&method, status.as_u16(), disposition, start_time);
            rewritten
        }
        Err(err) => {
            tracing::error!(
                url = %classification.original_url,
                error = %err,
                "failed to read upstream body for rewriting"
            );
            metrics::record_request(&method, 502, disposition, start_time);
            (StatusCode::BAD_GATEWAY, "upstream body read failed").into_response()
        }
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
