//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, query)
//!     → dispatcher.rs (label extraction, folder/root redirects)
//!     → registry.rs (label → BackendEntry lookup)
//!     → Return: Redirect, Forward (rewritten path) or UnknownRoute
//!
//! Registry Compilation (at startup):
//!     RouteSpec[]
//!     → register in configuration order
//!     → reject duplicates and reserved labels
//!     → Freeze as immutable Registry
//! ```
//!
//! # Design Decisions
//! - Registry immutable after construction (thread-safe without locks)
//! - O(1) label lookup via HashMap
//! - Labels are case-sensitive and never contain '/'
//! - Explicit UnknownRoute (404) rather than a silent default backend

pub mod dispatcher;
pub mod registry;

pub use dispatcher::{Dispatch, DispatchError, Dispatcher, Forward};
pub use registry::{Registry, RegistryBuilder, RegistryError, ROOT_REDIRECT_LABEL};
