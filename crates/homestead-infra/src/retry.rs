//! Retry primitives shared by the ingestion queue and outbound HTTP clients.
//!
//! Retries here are bounded and sequential: the caller sleeps between attempts. The
//! sleep goes through [`Sleeper`] so tests can observe the schedule without waiting.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Maximum delay between attempts for exponential schedules.
pub const MAX_BACKOFF: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay after every failed attempt.
    Fixed(Duration),
    /// `base^attempt` seconds after attempt `attempt` (1-based), capped at [`MAX_BACKOFF`].
    Exponential { base: u64 },
}

impl Backoff {
    pub fn delay_after(self, attempt: u32) -> Duration {
        match self {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base } => {
                let secs = base.checked_pow(attempt).unwrap_or(u64::MAX);
                Duration::from_secs(secs).min(MAX_BACKOFF)
            }
        }
    }
}

/// Attempt accounting for one in-flight call. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    /// Attempts started so far.
    pub attempt: u32,
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryState {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            attempt: 0,
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Marks the start of a new attempt and returns its 1-based number.
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempt += 1;
        self.attempt
    }

    pub fn exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    /// Delay to wait before the next attempt, given the current one failed.
    pub fn next_delay(&self) -> Duration {
        self.backoff.delay_after(self.attempt)
    }
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Returns immediately and remembers every requested delay.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut delays) = self.delays.lock() {
            delays.push(duration);
        }
        tokio::task::yield_now().await;
    }
}
