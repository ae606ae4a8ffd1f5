//! Backend subsystem.
//!
//! # Responsibilities
//! - Describe one routable backend (label, address, optional path prefix)
//! - Own the outbound connection pool for that backend
//!
//! # Design Decisions
//! - One pooled client per backend, keep-alive enabled
//! - Concurrency bounded by a semaphore; waiters queue instead of failing
//! - Entries are immutable once registered; only the pool mutates

pub mod entry;
pub mod pool;

pub use entry::BackendEntry;
pub use pool::{ConnectionLease, ConnectionPool, PoolClosed};
