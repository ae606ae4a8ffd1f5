//! Label-routed streaming reverse proxy.
//!
//! Routes `/<label>/<rest>` to the backend registered under `<label>`,
//! optionally rewriting the path with a per-backend prefix, and relays both
//! bodies chunk by chunk. A companion listener redirects plaintext traffic
//! to HTTPS.

// Core subsystems
pub mod backend;
pub mod config;
pub mod http;
pub mod net;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::ProxySettings;
pub use http::{ProxyServer, SslRedirector};
pub use lifecycle::Shutdown;
pub use routing::{Dispatcher, Registry};
