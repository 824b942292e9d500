//! Dispatch orchestration: invoke, validate, classify, retry.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::backoff::BackoffPolicy;
use crate::classify::{Classification, ClassifyError, ErrorClassifier};
use crate::error::{DispatchError, RelayError, Result};
use crate::relay::{Relay, Response};
use crate::validate::ResponseValidator;

/// What a dispatch call hands back on the non-error path.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// A validated response.
    Response(Response),
    /// The relay failed, but the classifier chose to ignore the failure.
    ///
    /// Never raised as an error; the caller must inspect this explicitly.
    Ignored(RelayError),
}

impl DispatchOutcome {
    /// The validated response, if this outcome carries one.
    pub fn response(self) -> Option<Response> {
        match self {
            Self::Response(response) => Some(response),
            Self::Ignored(_) => None,
        }
    }

    /// Whether this outcome is an ignored failure.
    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored(_))
    }
}

/// Resilience front for a remote-procedure relay.
///
/// Invokes an operation on the relay, validates successful responses,
/// classifies failures, and retries within the configured backoff budget.
/// Holds per-call state only (the attempt counter lives on the stack), so one
/// dispatcher can serve concurrent calls behind an [`Arc`] without locking.
///
/// # Examples
///
/// ```ignore
/// use relay_guard::{Dispatcher, DispatchOutcome};
/// use std::sync::Arc;
///
/// let dispatcher = Dispatcher::builder(Arc::new(relay)).build();
/// match dispatcher.dispatch("searchHITs", vec![]).await? {
///     DispatchOutcome::Response(response) => { /* use the payload */ }
///     DispatchOutcome::Ignored(error) => { /* classifier swallowed it */ }
/// }
/// ```
pub struct Dispatcher {
    relay: Arc<dyn Relay>,
    classifier: Arc<dyn ClassifyError>,
    validator: ResponseValidator,
    backoff: BackoffPolicy,
}

impl Dispatcher {
    /// Create a dispatcher with default classifier, validator, and backoff.
    pub fn new(relay: Arc<dyn Relay>) -> Self {
        Self::builder(relay).build()
    }

    /// Create a builder. The relay is the one required collaborator.
    pub fn builder(relay: Arc<dyn Relay>) -> DispatcherBuilder {
        DispatcherBuilder {
            relay,
            classifier: None,
            validator: None,
            backoff: None,
        }
    }

    /// Invoke `operation` on the relay, retrying per classification until a
    /// terminal outcome.
    ///
    /// Terminal outcomes:
    /// - a validated [`DispatchOutcome::Response`];
    /// - [`DispatchOutcome::Ignored`] when the classifier swallows a failure;
    /// - [`DispatchError::Operation`] carrying the original error unchanged,
    ///   when the classifier says `Fail` or the retry budget is exhausted;
    /// - [`DispatchError::UnknownOutcome`] wrapping the error with the
    ///   operation name and arguments, when the classifier says `Unknown`.
    ///
    /// Validation failures on an apparently successful call re-enter
    /// classification like any relay failure, so a throttling signal embedded
    /// in a well-formed response drives a backoff retry instead of a hard
    /// error.
    ///
    /// The only suspension point is the backoff sleep; no cancellation hook
    /// is exposed. Callers needing one should wrap the future in
    /// `tokio::time::timeout`.
    pub async fn dispatch(&self, operation: &str, args: Vec<Value>) -> Result<DispatchOutcome> {
        let mut attempt: u32 = 1;
        loop {
            debug!(operation, attempt, "dispatching");
            let error = match self.relay.invoke(operation, &args).await {
                Ok(response) => match self.validator.validate(response) {
                    Ok(response) => return Ok(DispatchOutcome::Response(response)),
                    Err(error) => error,
                },
                Err(error) => error,
            };

            match self.classifier.classify(&error, operation) {
                Classification::RetryWithBackoff => {
                    if !self.backoff.can_retry(attempt) {
                        warn!(operation, attempt, "retry budget exhausted");
                        return Err(DispatchError::Operation(error));
                    }
                    let delay = self.backoff.delay(attempt);
                    warn!(operation, attempt, ?delay, "backing off before retry");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Classification::RetryImmediate => {
                    if !self.backoff.can_retry(attempt) {
                        warn!(operation, attempt, "retry budget exhausted");
                        return Err(DispatchError::Operation(error));
                    }
                    attempt += 1;
                }
                Classification::Ignore => return Ok(DispatchOutcome::Ignored(error)),
                Classification::Fail => return Err(DispatchError::Operation(error)),
                Classification::Unknown => {
                    return Err(DispatchError::UnknownOutcome {
                        operation: operation.to_string(),
                        args,
                        source: error,
                    });
                }
            }
        }
    }
}

/// Builder for configuring a [`Dispatcher`].
pub struct DispatcherBuilder {
    relay: Arc<dyn Relay>,
    classifier: Option<Arc<dyn ClassifyError>>,
    validator: Option<ResponseValidator>,
    backoff: Option<BackoffPolicy>,
}

impl DispatcherBuilder {
    /// Replace the error classifier.
    ///
    /// Default: [`ErrorClassifier::default`].
    pub fn classifier(mut self, classifier: impl ClassifyError + 'static) -> Self {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    /// Replace the response validator.
    ///
    /// Default: [`ResponseValidator::default`].
    pub fn validator(mut self, validator: ResponseValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Replace the backoff policy.
    ///
    /// Default: [`BackoffPolicy::default`].
    pub fn backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = Some(backoff);
        self
    }

    /// Build the `Dispatcher`, using defaults for unset collaborators.
    pub fn build(self) -> Dispatcher {
        Dispatcher {
            relay: self.relay,
            classifier: self
                .classifier
                .unwrap_or_else(|| Arc::new(ErrorClassifier::default())),
            validator: self.validator.unwrap_or_default(),
            backoff: self.backoff.unwrap_or_default(),
        }
    }
}
