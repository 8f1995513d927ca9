//! Rendering-environment HTTP proxy library.
//!
//! Classifies every request from the headless rendering client as a
//! proxymap hijack, a terminal rejection, or a live passthrough, then
//! forwards it with retries and rewrites the response for deterministic
//! snapshots.

pub mod config;
pub mod http;
pub mod observability;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use routing::ProxyMap;
