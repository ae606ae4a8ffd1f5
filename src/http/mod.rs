//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, proxy handler)
//!     → routing::Dispatcher (redirect, 404, or forward)
//!     → relay.rs (outbound request, body pump both ways)
//!     → Send to client
//!
//! Separate listener:
//!     → redirector.rs (303 to the HTTPS URL)
//! ```

pub mod redirector;
pub mod relay;
pub mod server;

pub use redirector::SslRedirector;
pub use relay::{Relay, RelayBody, RelayError, RelayState};
pub use server::ProxyServer;
