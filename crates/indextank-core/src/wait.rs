//! Polling policy for waiting on a freshly created index.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Delay schedule and upper bound for the index start poll loop.
///
/// The delay after the n-th unsuccessful poll is
/// `min(interval * backoff^n, max_interval)`; a `backoff` of 1.0 keeps the
/// interval fixed. Without a `timeout` the loop only ends when the index
/// starts or a [`CancelToken`] fires.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitPolicy {
    pub interval: Duration,
    pub backoff: f64,
    pub max_interval: Duration,
    pub timeout: Option<Duration>,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            backoff: 1.0,
            max_interval: Duration::from_secs(30),
            timeout: None,
        }
    }
}

impl WaitPolicy {
    pub fn fixed(interval: Duration) -> Self {
        Self { interval, ..Self::default() }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_backoff(mut self, factor: f64, max_interval: Duration) -> Self {
        self.backoff = factor.max(1.0);
        self.max_interval = max_interval;
        self
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 || self.backoff <= 1.0 {
            return self.interval;
        }
        let factor = self.backoff.max(1.0).powi(i32::try_from(attempt).unwrap_or(i32::MAX));
        let secs = self.interval.as_secs_f64() * factor;
        if !secs.is_finite() || secs >= self.max_interval.as_secs_f64() {
            return self.max_interval.max(self.interval);
        }
        Duration::from_secs_f64(secs)
    }
}

/// Serialized shape of the `wait` config table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaitSettings {
    pub interval_ms: Option<u64>,
    pub backoff: Option<f64>,
    pub max_interval_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
}

impl From<WaitSettings> for WaitPolicy {
    fn from(settings: WaitSettings) -> Self {
        let defaults = Self::default();
        Self {
            interval: settings.interval_ms.map_or(defaults.interval, Duration::from_millis),
            backoff: settings.backoff.map_or(defaults.backoff, |b| b.max(1.0)),
            max_interval: settings.max_interval_ms.map_or(defaults.max_interval, Duration::from_millis),
            timeout: settings.timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Shared flag that aborts a wait loop from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self { Self::default() }

    pub fn cancel(&self) { self.0.store(true, Ordering::SeqCst); }

    pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::SeqCst) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_polls_every_two_seconds_forever() {
        let policy = WaitPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(2));
        assert_eq!(policy.delay_for(10), Duration::from_secs(2));
        assert!(policy.timeout.is_none());
    }

    #[test]
    fn backoff_grows_and_caps() {
        let policy = WaitPolicy::fixed(Duration::from_millis(100))
            .with_backoff(2.0, Duration::from_millis(500));
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3), Duration::from_millis(500));
        assert_eq!(policy.delay_for(200), Duration::from_millis(500));
    }

    #[test]
    fn settings_fill_missing_values_from_defaults() {
        let policy = WaitPolicy::from(WaitSettings { timeout_secs: Some(60), ..WaitSettings::default() });
        assert_eq!(policy.interval, Duration::from_secs(2));
        assert_eq!(policy.timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn cancel_is_visible_through_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }
}
