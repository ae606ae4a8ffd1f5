//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Configured port
//!     → listener.rs (bind on all interfaces)
//!     → tls.rs (optional keystore → rustls acceptor)
//!     → Hand off to HTTP layer
//! ```

pub mod listener;
pub mod tls;

pub use listener::{bind, ListenerError};
pub use tls::{load_keystore, KeystoreConfig, TlsError};
