//! Sink trait abstraction.
//!
//! This crate defines the `Sink` trait every destination implements. The
//! console, chat and PostgreSQL sinks all consume the same stream of
//! `sync_core::Event` values inside per-page transactions, so the sync driver
//! never needs to know where the events end up.
//!
//! `MemorySink` is an idempotent in-memory implementation used by tests and
//! by callers that want to inspect a run's output programmatically.

mod error;
mod memory;
mod traits;

pub use error::{BoxError, SinkError};
pub use memory::MemorySink;
pub use traits::Sink;
