use std::time::Duration;

use rand::Rng;

/// Specifies the backoff strategy for retrying failed requests.
#[derive(Clone, Debug)]
pub enum Backoff {
    /// Uses a fixed delay between retries.
    Fixed(Duration),
    /// Uses an exponential delay between retries.
    /// The delay is calculated as `base * (factor ^ attempt)`.
    Exponential {
        /// The initial backoff duration.
        base: Duration,
        /// The multiplicative factor for each subsequent retry.
        factor: f64,
        /// The maximum duration to wait between retries.
        max: Duration,
        /// Whether to apply random jitter (+/- 50%) to the delay.
        jitter: bool,
    },
}

impl Backoff {
    /// The nominal delay before retry number `attempt` (0-based).
    pub(crate) fn delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed(d) => *d,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
                let raw = base.as_secs_f64() * factor.powi(exp);
                let mut secs = raw.min(max.as_secs_f64());
                if *jitter && secs > 0.0 {
                    secs *= rand::rng().random_range(0.5..1.5);
                }
                Duration::from_secs_f64(secs.clamp(0.0, max.as_secs_f64()))
            }
        }
    }
}

/// Configuration for the automatic retry mechanism.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Enables or disables the retry mechanism.
    pub enabled: bool,
    /// The maximum number of retries to attempt. The total number of attempts will be `max_retries + 1`.
    pub max_retries: u32,
    /// The backoff strategy to use between retries.
    pub backoff: Backoff,
    /// Upper bound on the summed backoff sleep for one logical request.
    /// The last sleep is shortened to fit; after that no further retries are made.
    pub max_total_sleep: Duration,
    /// A list of HTTP status codes that should trigger a retry.
    pub retry_on_status: Vec<u16>,
    /// Whether to retry on request timeouts.
    pub retry_on_timeout: bool,
    /// Whether to retry on connection errors.
    pub retry_on_connect: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 4,
            backoff: Backoff::Exponential {
                base: Duration::from_millis(250),
                factor: 2.0,
                max: Duration::from_secs(4),
                jitter: true,
            },
            max_total_sleep: Duration::from_secs(9),
            retry_on_status: vec![400, 401, 404, 429, 500, 502, 503, 504],
            retry_on_timeout: true,
            retry_on_connect: true,
        }
    }
}

impl RetryConfig {
    /// A policy that makes exactly one attempt.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub(crate) fn should_retry_status(&self, status: u16) -> bool {
        self.enabled && self.retry_on_status.contains(&status)
    }

    pub(crate) const fn should_retry_network(&self, timeout: bool) -> bool {
        self.enabled
            && if timeout {
                self.retry_on_timeout
            } else {
                self.retry_on_connect
            }
    }

    pub(crate) const fn attempts(&self) -> u32 {
        if self.enabled {
            self.max_retries.saturating_add(1)
        } else {
            1
        }
    }
}

/// Tracks how much of the sleep budget a single logical request has used.
#[derive(Debug)]
pub(crate) struct SleepBudget {
    remaining: Duration,
}

impl SleepBudget {
    pub(crate) const fn new(total: Duration) -> Self {
        Self { remaining: total }
    }

    /// Clamps `wanted` to what is left of the budget and charges it.
    /// `None` means the budget is exhausted and the caller should stop retrying.
    pub(crate) fn take(&mut self, wanted: Duration) -> Option<Duration> {
        if self.remaining.is_zero() {
            return None;
        }
        let granted = wanted.min(self.remaining);
        self.remaining -= granted;
        Some(granted)
    }
}

/// Defines the behavior of the response cache for an API call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Read from the cache if an entry is present; otherwise, fetch from the network
    /// and write the decoded response to the cache. (Default)
    #[default]
    Use,
    /// Always fetch from the network, bypassing any cached entry, and write the new response to the cache.
    Refresh,
    /// Always fetch from the network and do not read from or write to the cache.
    Bypass,
}
