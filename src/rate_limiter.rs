// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Rate Governor
 * Concurrency ceiling plus minimum spacing between dispatch starts
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tracing::{debug, info};

/// Rate governor configuration
#[derive(Debug, Clone)]
pub struct RateGovernorConfig {
    /// Maximum simultaneously acquired permits
    pub max_concurrency: usize,

    /// Minimum gap between two dispatch start times
    pub min_interval: Duration,
}

impl Default for RateGovernorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 50,
            min_interval: Duration::ZERO,
        }
    }
}

/// Process-wide throttle for one executor.
///
/// Every tester sharing the executor shares the governor, so N testers never
/// multiply the load put on a target.
#[derive(Debug)]
pub struct RateGovernor {
    config: RateGovernorConfig,
    semaphore: Arc<Semaphore>,
    last_dispatch: Mutex<Option<Instant>>,
}

/// Held for the lifetime of one in-flight request; dropping it releases the slot
#[derive(Debug)]
pub struct DispatchPermit {
    _permit: OwnedSemaphorePermit,
    dispatched_at: Instant,
}

impl DispatchPermit {
    /// Start time recorded for spacing purposes
    pub fn dispatched_at(&self) -> Instant {
        self.dispatched_at
    }

    pub fn release(self) {}
}

impl RateGovernor {
    pub fn new(config: RateGovernorConfig) -> Self {
        let max_concurrency = config.max_concurrency.max(1);

        info!(
            "Initialized rate governor: max_concurrency={}, min_interval={:?}",
            max_concurrency, config.min_interval
        );

        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            config: RateGovernorConfig {
                max_concurrency,
                ..config
            },
            last_dispatch: Mutex::new(None),
        }
    }

    /// Wait for a concurrency slot, then for the spacing window.
    ///
    /// Suspends only the calling task. The spacing lock is held while
    /// sleeping so dispatch starts are strictly serialized.
    pub async fn acquire(&self) -> Result<DispatchPermit> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .context("Rate governor semaphore closed")?;

        if self.config.min_interval.is_zero() {
            return Ok(DispatchPermit {
                _permit: permit,
                dispatched_at: Instant::now(),
            });
        }

        let mut last = self.last_dispatch.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.config.min_interval {
                let wait = self.config.min_interval - elapsed;
                debug!("[RateGovernor] Spacing dispatch by {:?}", wait);
                tokio::time::sleep(wait).await;
            }
        }
        let dispatched_at = Instant::now();
        *last = Some(dispatched_at);

        Ok(DispatchPermit {
            _permit: permit,
            dispatched_at,
        })
    }

    /// Free slots right now
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn max_concurrency(&self) -> usize {
        self.config.max_concurrency
    }

    pub fn min_interval(&self) -> Duration {
        self.config.min_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_concurrency_ceiling() {
        let governor = Arc::new(RateGovernor::new(RateGovernorConfig {
            max_concurrency: 3,
            min_interval: Duration::ZERO,
        }));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let governor = Arc::clone(&governor);
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let permit = governor.acquire().await.unwrap();
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                permit.release();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(governor.available_permits(), 3);
    }

    #[tokio::test]
    async fn test_minimum_spacing_between_dispatches() {
        let interval = Duration::from_millis(40);
        let governor = Arc::new(RateGovernor::new(RateGovernorConfig {
            max_concurrency: 10,
            min_interval: interval,
        }));
        let starts = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let governor = Arc::clone(&governor);
            let starts = Arc::clone(&starts);
            handles.push(tokio::spawn(async move {
                let permit = governor.acquire().await.unwrap();
                starts.lock().push(permit.dispatched_at());
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut starts = starts.lock().clone();
        starts.sort();
        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= interval);
        }
    }

    #[test]
    fn test_zero_concurrency_clamped() {
        let governor = RateGovernor::new(RateGovernorConfig {
            max_concurrency: 0,
            min_interval: Duration::ZERO,
        });
        assert_eq!(governor.max_concurrency(), 1);
    }
}
