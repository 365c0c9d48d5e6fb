use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::Quota;
use tokio_util::sync::CancellationToken;

use crate::error::ConfigError;

/// Returned when the cancellation token fires before a permit is granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Token bucket with capacity 1, refilled once per `interval`.
///
/// Bounds how fast lookups start, independent of how long they take.
#[derive(Debug)]
pub struct RateLimiter {
    inner: governor::RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Result<Self, ConfigError> {
        let quota = Quota::with_period(interval)
            .ok_or(ConfigError::Zero("request_interval_ms"))?
            .allow_burst(NonZeroU32::MIN);

        Ok(Self {
            inner: governor::RateLimiter::direct(quota),
        })
    }

    /// Wait for a token. Cancellation is checked before the bucket, so a
    /// fired token never yields a permit even when one is available.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), Cancelled> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Cancelled),
            _ = self.inner.until_ready() => Ok(()),
        }
    }
}
