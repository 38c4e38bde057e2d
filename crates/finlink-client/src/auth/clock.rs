/*
[INPUT]:  System wall clock (or a fixed test value)
[OUTPUT]: Current Unix time in seconds
[POS]:    Auth layer - time source shared by request signing and webhook freshness
[UPDATE]: When adding time sources
*/

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

/// The wall clock could not produce a usable Unix time
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("system clock unavailable: {0}")]
pub struct ClockError(String);

impl ClockError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Source of Unix time in seconds
pub trait Clock: Send + Sync + fmt::Debug {
    fn now_unix(&self) -> Result<i64, ClockError>;
}

/// Wall-clock time from the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> Result<i64, ClockError> {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|err| ClockError::new(err.to_string()))?;
        i64::try_from(elapsed.as_secs()).map_err(|err| ClockError::new(err.to_string()))
    }
}

/// Settable clock for deterministic signing and freshness tests
#[derive(Debug, Default)]
pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_unix(&self) -> Result<i64, ClockError> {
        Ok(self.now.load(Ordering::SeqCst))
    }
}
