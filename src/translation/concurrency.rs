/*!
 * Admission control for backend calls.
 *
 * Two independent limits compose here:
 * - a counting semaphore bounding how many workers run at once
 * - a fixed-interval rate limiter bounding how fast calls may start
 *
 * Both waits give up as soon as the run is cancelled.
 */

use std::sync::Arc;
use std::time::Duration;

use log::trace;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::{Interval, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

use crate::app_config::PipelineConfig;
use crate::errors::TranslationError;

/// Fixed-interval rate limiter.
///
/// The first tick fires immediately, then one tick per period. Waiters are
/// served in arrival order. Must be created inside a Tokio runtime.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Mutex<Interval>,
    period: Duration,
}

impl RateLimiter {
    pub fn new(period: Duration) -> Self {
        let mut ticker = interval(period);
        // a late tick pushes the schedule back rather than bursting to catch up
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval: Mutex::new(ticker),
            period,
        }
    }

    /// Limiter admitting `requests_per_minute` calls per minute
    pub fn per_minute(requests_per_minute: u32) -> Self {
        Self::new(Duration::from_secs(60) / requests_per_minute.max(1))
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Waits for the next tick
    pub async fn tick(&self, cancel: &CancellationToken) -> Result<(), TranslationError> {
        let mut ticker = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TranslationError::Cancelled),
            guard = self.interval.lock() => guard,
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TranslationError::Cancelled),
            _ = ticker.tick() => Ok(()),
        }
    }
}

/// Semaphore plus rate limiter, shared by all workers of one pipeline run
#[derive(Debug)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    limiter: RateLimiter,
    max_concurrent: usize,
}

impl ConcurrencyGate {
    pub fn new(max_concurrent: usize, requests_per_minute: u32) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            limiter: RateLimiter::per_minute(requests_per_minute),
            max_concurrent,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.max_concurrent_requests, config.max_requests_per_minute)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Number of free worker slots
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Acquires a worker slot.
    ///
    /// The permit is released when dropped; workers hold it for their whole
    /// lifetime including retries and the single-segment fallback.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<OwnedSemaphorePermit, TranslationError> {
        if cancel.is_cancelled() {
            return Err(TranslationError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TranslationError::Cancelled),
            permit = Arc::clone(&self.semaphore).acquire_owned() => {
                // the semaphore is never closed
                permit.map_err(|_| TranslationError::Cancelled)
            }
        }
    }

    /// Waits until the next backend call may be sent
    pub async fn wait_turn(&self, cancel: &CancellationToken) -> Result<(), TranslationError> {
        self.limiter.tick(cancel).await?;
        trace!("Rate limiter admitted a request");
        Ok(())
    }
}
