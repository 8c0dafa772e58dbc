//! Retry policy for schema-validated agent calls.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How an agent call recovers from failures.
///
/// Two independent paths exist:
/// - validation and transport failures consume `retry_budget`;
/// - rate-limit failures wait `rate_limit_delay` and retry without touching
///   the budget. With `max_rate_limit_waits: None` this path has no ceiling
///   and never grows its delay, so a saturated backend can stall a call for
///   as long as it stays saturated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after a validation or transport failure
    pub retry_budget: u32,

    /// Fixed wait after a rate-limit response
    #[serde(with = "crate::config::humantime_duration")]
    pub rate_limit_delay: Duration,

    /// Optional ceiling on rate-limit waits per call
    pub max_rate_limit_waits: Option<u32>,

    /// Outer deadline for a single backend round trip. Must be at least the
    /// request timeout in `CompletionConfig`, which fires first.
    #[serde(with = "crate::config::humantime_duration::option")]
    pub call_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_budget: 1,
            rate_limit_delay: Duration::from_secs(10),
            max_rate_limit_waits: None,
            call_timeout: Some(Duration::from_secs(60)),
        }
    }
}

impl RetryPolicy {
    /// Policy with no retries at all, useful for dry runs.
    pub fn no_retry() -> Self {
        Self {
            retry_budget: 0,
            max_rate_limit_waits: Some(0),
            ..Default::default()
        }
    }

    /// Whether another rate-limit wait is allowed after `waits` so far.
    pub fn allows_rate_limit_wait(&self, waits: u32) -> bool {
        self.max_rate_limit_waits.map_or(true, |max| waits < max)
    }
}
