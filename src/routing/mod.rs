//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, URI, Host header)
//!     → router.rs (classification state machine)
//!         → hostname.rs (is the destination the local test environment?)
//!         → normalize.rs (canonical lookup key)
//!         → proxymap.rs (hijack lookup, query-strip fallback)
//!         → blacklist.rs (known-bad prefix filter)
//!     → Return: RequestClassification (Hijacked / Rejected / LivePassthrough)
//!       with the request URI rewritten in place for forwarding
//! ```
//!
//! # Design Decisions
//! - Proxymap and blacklist compiled at startup, immutable at runtime
//! - Hostname cache is the only shared mutable state (sharded map)
//! - Deterministic: same input always classifies the same way
//! - Rejections carry their HTTP status so the handler stays a thin shim

pub mod blacklist;
pub mod hostname;
pub mod normalize;
pub mod proxymap;
pub mod router;

pub use blacklist::UrlBlacklist;
pub use hostname::HostnameClassifier;
pub use proxymap::{ProxyMap, ProxymapEntry, ProxymapError};
pub use router::{Disposition, Rejection, RequestClassification, RequestRouter};
