//! Error classification: mapping relay failures to handling actions.

use tracing::debug;

use crate::error::RelayError;

/// Canonical fault code signalling the remote service is unavailable.
pub const SERVICE_UNAVAILABLE_CODE: &str = "Server.ServiceUnavailable";

/// Canonical message signalling server-side load shedding.
pub const THROTTLED_MESSAGE: &str = "Throttled";

/// Operation-name prefixes presumed safe to retry without duplicate side
/// effects.
pub const RETRYABLE_PREFIXES: &[&str] = &[
    "search", "get", "register", "update", "disable", "assign", "set", "dispose",
];

/// Handling action chosen for a relay failure.
///
/// Exactly one classification is produced per error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Retry after an exponential backoff delay.
    RetryWithBackoff,
    /// Retry immediately with no delay.
    RetryImmediate,
    /// Swallow the failure; the caller receives it as a tagged value.
    Ignore,
    /// Non-retryable; propagate the original error unchanged.
    Fail,
    /// Unrecognized outcome; propagate wrapped with diagnostic context.
    Unknown,
}

/// Classification seam used by the dispatcher.
///
/// Implementations must be pure: the same (error, operation) inputs always
/// produce the same classification, with no side effects, so one classifier
/// can serve concurrent dispatch calls.
pub trait ClassifyError: Send + Sync {
    /// Map a relay failure and the operation it arose from to an action.
    fn classify(&self, error: &RelayError, operation: &str) -> Classification;
}

/// Default classifier.
///
/// Rules by error kind:
/// - `TransientInfra`: retryable-named operations → `RetryImmediate`,
///   everything else → `Unknown`. The classifier has no semantic knowledge of
///   the operation, so transient transport failures are only retried for
///   operations presumed idempotent by name.
/// - `Fault`: the configured service-unavailable code → `RetryWithBackoff`;
///   any other code → `Unknown`.
/// - `Validation`: always `Fail`.
/// - `Generic`: the configured throttled message → `RetryWithBackoff`
///   regardless of operation (load shedding is not operation-specific); any
///   other message → `RetryImmediate`.
/// - `Opaque`: `Unknown`.
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    retryable_prefixes: Vec<String>,
    unavailable_code: String,
    throttled_message: String,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ErrorClassifier {
    /// Create a new builder for configuring a classifier.
    pub fn builder() -> ErrorClassifierBuilder {
        ErrorClassifierBuilder::default()
    }

    /// Whether `operation` matches the retryable-name predicate
    /// (case-insensitive prefix match).
    pub fn operation_retryable(&self, operation: &str) -> bool {
        let name = operation.to_ascii_lowercase();
        self.retryable_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
    }
}

impl ClassifyError for ErrorClassifier {
    fn classify(&self, error: &RelayError, operation: &str) -> Classification {
        let classification = match error {
            RelayError::TransientInfra { .. } => {
                if self.operation_retryable(operation) {
                    Classification::RetryImmediate
                } else {
                    Classification::Unknown
                }
            }
            RelayError::Fault { code } if *code == self.unavailable_code => {
                Classification::RetryWithBackoff
            }
            RelayError::Fault { .. } => Classification::Unknown,
            RelayError::Validation { .. } => Classification::Fail,
            RelayError::Generic { message } if *message == self.throttled_message => {
                Classification::RetryWithBackoff
            }
            RelayError::Generic { .. } => Classification::RetryImmediate,
            RelayError::Opaque(_) => Classification::Unknown,
        };
        debug!(%error, operation, ?classification, "classified relay failure");
        classification
    }
}

/// Builder for configuring [`ErrorClassifier`].
#[derive(Debug, Default)]
pub struct ErrorClassifierBuilder {
    retryable_prefixes: Option<Vec<String>>,
    unavailable_code: Option<String>,
    throttled_message: Option<String>,
}

impl ErrorClassifierBuilder {
    /// Replace the retryable operation-name prefix set.
    ///
    /// Matching is case-insensitive. Default: [`RETRYABLE_PREFIXES`].
    pub fn retryable_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.retryable_prefixes = Some(prefixes.into_iter().map(Into::into).collect());
        self
    }

    /// Set the fault code treated as "service unavailable".
    ///
    /// Default: [`SERVICE_UNAVAILABLE_CODE`].
    pub fn unavailable_code(mut self, code: impl Into<String>) -> Self {
        self.unavailable_code = Some(code.into());
        self
    }

    /// Set the message treated as the throttling signal.
    ///
    /// Default: [`THROTTLED_MESSAGE`].
    pub fn throttled_message(mut self, message: impl Into<String>) -> Self {
        self.throttled_message = Some(message.into());
        self
    }

    /// Build the `ErrorClassifier`, using defaults for unset parameters.
    pub fn build(self) -> ErrorClassifier {
        ErrorClassifier {
            retryable_prefixes: self
                .retryable_prefixes
                .unwrap_or_else(|| RETRYABLE_PREFIXES.iter().map(|p| p.to_string()).collect())
                .into_iter()
                .map(|p| p.to_ascii_lowercase())
                .collect(),
            unavailable_code: self
                .unavailable_code
                .unwrap_or_else(|| SERVICE_UNAVAILABLE_CODE.to_string()),
            throttled_message: self
                .throttled_message
                .unwrap_or_else(|| THROTTLED_MESSAGE.to_string()),
        }
    }
}
