//! Observability subsystem.
//!
//! # Design Decisions
//! - Structured `tracing` events with request id, backend label and URI fields
//! - Log level configurable via `RUST_LOG`

pub mod logging;
