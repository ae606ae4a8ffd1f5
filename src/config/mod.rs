//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config.properties
//!     → loader.rs (ordered key/value pairs, duplicates kept)
//!     → schema.rs (ProxySettings: port, relay tuning, routes, SSL redirect)
//!     → routing::Registry (built once, immutable)
//! ```
//!
//! # Design Decisions
//! - Interpretation degrades instead of failing: bad values are logged and defaulted
//! - Route order follows the file so duplicate labels are detected deterministically
//! - Settings are plain data; connection pools are created by the registry

pub mod loader;
pub mod schema;

pub use loader::{load_properties, ConfigError};
pub use schema::{ProxySettings, RedirectConfig, RelaySettings, RouteSpec};
