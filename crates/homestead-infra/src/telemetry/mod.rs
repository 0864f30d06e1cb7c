//! Tracing initialization
//!
//! Console output by default; JSON lines with the `observability-json` feature.

mod init_basic;

pub use init_basic::{init_telemetry, shutdown_telemetry};
