//! Error taxonomy for relay dispatch.
//!
//! Failures are decided into a tagged shape once, at the relay boundary
//! ([`RelayError`]), and everything downstream matches on variants instead of
//! re-deriving meaning from class names or message strings. What a caller can
//! actually see out of a dispatch is captured separately by [`DispatchError`].

use serde_json::Value;
use thiserror::Error;

use crate::relay::Response;

/// Result type alias for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;

/// A failure raised by the relay, or synthesized at the relay boundary.
///
/// This is the input taxonomy for classification. Relay implementations are
/// responsible for mapping whatever their transport raises into one of these
/// variants; anything that does not fit a known shape goes in [`Opaque`].
///
/// [`Opaque`]: RelayError::Opaque
#[derive(Debug, Error)]
pub enum RelayError {
    /// Timeout or stream-level transport failure.
    #[error("transport interrupted: {message}")]
    TransientInfra {
        /// Description of the transport failure.
        message: String,
    },

    /// Protocol-level fault returned by the remote system.
    #[error("remote fault: {code}")]
    Fault {
        /// The fault code reported on the wire.
        code: String,
    },

    /// A response that came back successfully but failed validation.
    ///
    /// Always terminal when classified.
    #[error("response failed validation: {reason}")]
    Validation {
        /// The offending response, kept for diagnosis.
        response: Response,
        /// Why validation rejected it.
        reason: String,
    },

    /// An otherwise-unstructured failure carrying only a message.
    #[error("{message}")]
    Generic {
        /// The failure message.
        message: String,
    },

    /// A failure whose shape the relay boundary could not recognize.
    #[error("unclassified relay failure")]
    Opaque(#[source] anyhow::Error),
}

/// Errors surfaced to the caller of [`Dispatcher::dispatch`].
///
/// Retries are absorbed internally; callers only ever see one of these two
/// shapes (or a successful [`DispatchOutcome`]).
///
/// [`Dispatcher::dispatch`]: crate::dispatch::Dispatcher::dispatch
/// [`DispatchOutcome`]: crate::dispatch::DispatchOutcome
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The original relay error, propagated unchanged.
    ///
    /// Produced when the classifier chose `Fail`, or when a retryable error
    /// outlived the retry budget. The inner error keeps its original shape so
    /// existing error-handling callers can match on it.
    #[error(transparent)]
    Operation(#[from] RelayError),

    /// The classifier could not map the failure to a handling action.
    ///
    /// Wraps the original error together with the operation name and
    /// arguments for diagnosis.
    #[error("unrecognized outcome from `{operation}`: {source}")]
    UnknownOutcome {
        /// The operation whose outcome could not be classified.
        operation: String,
        /// The arguments the operation was invoked with.
        args: Vec<Value>,
        /// The underlying relay failure.
        #[source]
        source: RelayError,
    },
}
