//! Response validation: spotting errors embedded in successful responses.
//!
//! The remote protocol can return a structurally well-formed response that
//! still carries error payloads, or that carries no recognizable result at
//! all. The validator turns those into [`RelayError`] values so they flow
//! through the same classification path as relay failures.

use serde_json::Value;
use tracing::debug;

use crate::classify::THROTTLED_MESSAGE;
use crate::error::RelayError;
use crate::relay::Response;

/// Throttle code embedded in a top-level `Errors` entry.
pub const THROTTLE_ERROR_CODE: &str = "ServiceUnavailable";

/// Legacy top-level keys accepted as result tags even though they do not
/// contain the `Result` substring.
pub const LEGACY_RESULT_TAGS: &[&str] = &[
    "HIT",
    "Qualification",
    "QualificationType",
    "QualificationRequest",
    "Information",
];

/// Validates decoded responses before they are handed to the caller.
///
/// A response passes when it carries no embedded error lists and exactly one
/// recognizable result tag: a top-level key containing the substring
/// `Result`, or one of the configured legacy tag names.
#[derive(Debug, Clone)]
pub struct ResponseValidator {
    throttle_code: String,
    throttled_message: String,
    legacy_result_tags: Vec<String>,
}

impl Default for ResponseValidator {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ResponseValidator {
    /// Create a new builder for configuring a validator.
    pub fn builder() -> ResponseValidatorBuilder {
        ResponseValidatorBuilder::default()
    }

    /// Inspect `response` and return it unchanged if it is acceptable.
    ///
    /// Checks in order:
    /// 1. A top-level `Errors` entry whose code matches the throttle code
    ///    fails as `Generic` with the throttled message, so it is classified
    ///    as a backoff retry rather than a hard validation failure.
    /// 2. A top-level `OperationRequest` carrying errors fails as
    ///    [`RelayError::Validation`].
    /// 3. No recognizable result tag among the top-level keys fails as
    ///    [`RelayError::Validation`] listing the keys that were present.
    /// 4. A `Request.Errors` entry nested under the result tag fails as
    ///    [`RelayError::Validation`].
    pub fn validate(&self, response: Response) -> Result<Response, RelayError> {
        if self.embedded_throttle(&response) {
            return Err(RelayError::Generic {
                message: self.throttled_message.clone(),
            });
        }

        if has_errors(response.get("OperationRequest")) {
            return Err(RelayError::Validation {
                reason: "operation request carries errors".to_string(),
                response,
            });
        }

        let Some(tag) = response.keys().find(|key| self.is_result_tag(key)).cloned() else {
            let keys = response.keys().cloned().collect::<Vec<_>>().join(",");
            return Err(RelayError::Validation {
                reason: format!("no acceptable result tag among: {keys}"),
                response,
            });
        };
        debug!(result_tag = %tag, "validated response");

        if has_errors(response.get(&tag).and_then(|payload| payload.get("Request"))) {
            return Err(RelayError::Validation {
                reason: format!("result payload under `{tag}` carries request errors"),
                response,
            });
        }

        Ok(response)
    }

    /// Whether `tag` is acceptable as a result tag.
    pub fn is_result_tag(&self, tag: &str) -> bool {
        tag.contains("Result") || self.legacy_result_tags.iter().any(|legacy| legacy == tag)
    }

    fn embedded_throttle(&self, response: &Response) -> bool {
        response
            .get("Errors")
            .and_then(|errors| errors.get("Error"))
            .and_then(|error| error.get("Code"))
            .and_then(Value::as_str)
            .is_some_and(|code| code == self.throttle_code)
    }
}

/// Whether `node` carries a non-empty `Errors` entry.
fn has_errors(node: Option<&Value>) -> bool {
    match node.and_then(|n| n.get("Errors")) {
        None | Some(Value::Null) => false,
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

/// Builder for configuring [`ResponseValidator`].
#[derive(Debug, Default)]
pub struct ResponseValidatorBuilder {
    throttle_code: Option<String>,
    throttled_message: Option<String>,
    legacy_result_tags: Option<Vec<String>>,
}

impl ResponseValidatorBuilder {
    /// Set the embedded error code treated as throttling.
    ///
    /// Default: [`THROTTLE_ERROR_CODE`].
    pub fn throttle_code(mut self, code: impl Into<String>) -> Self {
        self.throttle_code = Some(code.into());
        self
    }

    /// Set the message carried by the synthesized throttling error.
    ///
    /// Must match the classifier's throttled message for the backoff path to
    /// engage. Default: [`THROTTLED_MESSAGE`].
    pub fn throttled_message(mut self, message: impl Into<String>) -> Self {
        self.throttled_message = Some(message.into());
        self
    }

    /// Replace the legacy result-tag allow-list.
    ///
    /// Default: [`LEGACY_RESULT_TAGS`].
    pub fn legacy_result_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.legacy_result_tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Build the `ResponseValidator`, using defaults for unset parameters.
    pub fn build(self) -> ResponseValidator {
        ResponseValidator {
            throttle_code: self
                .throttle_code
                .unwrap_or_else(|| THROTTLE_ERROR_CODE.to_string()),
            throttled_message: self
                .throttled_message
                .unwrap_or_else(|| THROTTLED_MESSAGE.to_string()),
            legacy_result_tags: self
                .legacy_result_tags
                .unwrap_or_else(|| LEGACY_RESULT_TAGS.iter().map(|t| t.to_string()).collect()),
        }
    }
}
