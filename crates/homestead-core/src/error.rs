//! Error classification shared by every integration component.
//!
//! Each crate defines its own `thiserror` enum; this module gives them a common
//! vocabulary so callers can decide between retrying, falling back, and surfacing a
//! message without matching on crate-specific variants.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected outcomes like "not configured"
    Debug,
    /// Warning level - for handled failures that trigger a fallback
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Failure taxonomy for the integration layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Network blip, timeout, transient read/write failure. Retried by the owning layer.
    TransientIo,
    /// A collaborator is not configured. Selects a fallback path, never retried.
    ConfigurationMissing,
    /// Upstream answered 429 and the retry budget is spent.
    UpstreamRateLimited,
    /// Upstream refused the request (403, 400, expired subscription). Never retried.
    UpstreamRejected,
    /// The input is gone or unreadable.
    SourceMissing,
}

impl ErrorClass {
    /// Whether retrying the same call can change the outcome.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorClass::TransientIo | ErrorClass::UpstreamRateLimited)
    }

    pub fn log_level(self) -> LogLevel {
        match self {
            ErrorClass::ConfigurationMissing => LogLevel::Debug,
            ErrorClass::TransientIo | ErrorClass::UpstreamRateLimited => LogLevel::Warn,
            ErrorClass::UpstreamRejected | ErrorClass::SourceMissing => LogLevel::Error,
        }
    }

    /// Machine-readable code, stable across releases.
    pub fn code(self) -> &'static str {
        match self {
            ErrorClass::TransientIo => "TRANSIENT_IO",
            ErrorClass::ConfigurationMissing => "CONFIGURATION_MISSING",
            ErrorClass::UpstreamRateLimited => "UPSTREAM_RATE_LIMITED",
            ErrorClass::UpstreamRejected => "UPSTREAM_REJECTED",
            ErrorClass::SourceMissing => "SOURCE_MISSING",
        }
    }
}

/// Implemented by component errors to place themselves in the taxonomy.
pub trait Classify {
    fn class(&self) -> ErrorClass;

    fn log_level(&self) -> LogLevel {
        self.class().log_level()
    }

    fn is_retryable(&self) -> bool {
        self.class().is_retryable()
    }
}
