//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, handler)
//!     → [routing subsystem classifies and rewrites the request]
//!     → upstream.rs (retrying round trip to the destination)
//!     → rewrite.rs (mimetype override, footer injection)
//!     → Send to client
//! ```

pub mod rewrite;
pub mod server;
pub mod upstream;

pub use server::HttpServer;
pub use upstream::{UpstreamClient, UpstreamError};
