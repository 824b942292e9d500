//! Exponential backoff policy for retry scheduling.

use std::time::Duration;

/// Immutable retry budget: eligibility and delay as pure functions of the
/// attempt number (1-indexed).
///
/// The delay before retrying after attempt `n` is
/// `initial_delay * exponent^n`. Growth is monotonic with no jitter and no
/// cap beyond the attempt ceiling.
///
/// # Examples
///
/// ```rust
/// use relay_guard::BackoffPolicy;
/// use std::time::Duration;
///
/// let policy = BackoffPolicy::builder()
///     .max_attempts(4)
///     .initial_delay(Duration::from_millis(50))
///     .build();
///
/// assert!(policy.can_retry(4));
/// assert!(!policy.can_retry(5));
/// assert_eq!(policy.delay(1), Duration::from_millis(100));
/// ```
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    exponent: f64,
}

impl Default for BackoffPolicy {
    /// Defaults: 6 attempts, 100ms initial delay, exponent 2.0.
    fn default() -> Self {
        Self {
            max_attempts: 6,
            initial_delay: Duration::from_millis(100),
            exponent: 2.0,
        }
    }
}

impl BackoffPolicy {
    /// Create a new builder for configuring a backoff policy.
    pub fn builder() -> BackoffPolicyBuilder {
        BackoffPolicyBuilder::default()
    }

    /// Whether another attempt fits in the retry budget.
    pub fn can_retry(&self, attempt: u32) -> bool {
        attempt <= self.max_attempts
    }

    /// Delay to impose before retrying after `attempt` failed.
    ///
    /// Only defined while [`can_retry`](Self::can_retry) holds for the same
    /// attempt; callers must check eligibility first.
    pub fn delay(&self, attempt: u32) -> Duration {
        debug_assert!(
            self.can_retry(attempt),
            "delay() called past the retry budget (attempt {attempt})"
        );
        Duration::from_secs_f64(self.initial_delay.as_secs_f64() * self.exponent.powi(attempt as i32))
    }

    /// The maximum number of attempts this budget allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

/// Builder for configuring [`BackoffPolicy`].
#[derive(Debug, Default)]
pub struct BackoffPolicyBuilder {
    max_attempts: Option<u32>,
    initial_delay: Option<Duration>,
    exponent: Option<f64>,
}

impl BackoffPolicyBuilder {
    /// Set the maximum number of attempts.
    ///
    /// Default: 6
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Set the initial delay the exponential curve grows from.
    ///
    /// Default: 100ms
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Set the backoff exponent.
    ///
    /// Default: 2.0
    pub fn exponent(mut self, exponent: f64) -> Self {
        self.exponent = Some(exponent);
        self
    }

    /// Build the `BackoffPolicy`, using defaults for unset parameters.
    pub fn build(self) -> BackoffPolicy {
        let defaults = BackoffPolicy::default();
        BackoffPolicy {
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts),
            initial_delay: self.initial_delay.unwrap_or(defaults.initial_delay),
            exponent: self.exponent.unwrap_or(defaults.exponent),
        }
    }
}
