//! Pacing between successive remote calls
//!
//! Page requests for a term and image downloads for an archive are issued
//! one after another with a pause in between. The pause is behind the
//! [`Pacer`] trait so tests can count pauses instead of waiting on a clock.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Waits between two successive calls to the same remote service
#[async_trait]
pub trait Pacer: Send + Sync {
    /// Suspend until the next call may be issued
    async fn pause(&self);
}

/// Fixed pause on the tokio clock
#[derive(Debug, Clone, Copy)]
pub struct IntervalPacer {
    interval: Duration,
}

impl IntervalPacer {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[async_trait]
impl Pacer for IntervalPacer {
    async fn pause(&self) {
        if !self.interval.is_zero() {
            tokio::time::sleep(self.interval).await;
        }
    }
}

/// Pacer that never waits and only counts how often it was asked to
#[derive(Debug, Default)]
pub struct CountingPacer {
    pauses: AtomicUsize,
}

impl CountingPacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pauses requested so far
    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Pacer for CountingPacer {
    async fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_interval_pacer_sleeps_for_interval() {
        let pacer = IntervalPacer::from_millis(100);
        let started = tokio::time::Instant::now();

        pacer.pause().await;

        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_counting_pacer_counts() {
        let pacer = CountingPacer::new();
        pacer.pause().await;
        pacer.pause().await;
        assert_eq!(pacer.pauses(), 2);
    }
}
