//! Homestead Infrastructure Library
//!
//! Shared infrastructure used by the worker, services, and CLI:
//! - Telemetry initialization (tracing subscriber)
//! - Retry primitives (attempt accounting, backoff, injectable sleeping)

#[cfg(feature = "observability-basic")]
pub mod telemetry;

pub mod retry;

#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, shutdown_telemetry};

pub use retry::{Backoff, RecordingSleeper, RetryState, Sleeper, TokioSleeper};
