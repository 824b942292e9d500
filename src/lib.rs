#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Resilience layer for remote-procedure relays.
//!
//! The remote protocols this crate fronts produce a heterogeneous mix of
//! transport errors, protocol-level faults, and structurally-valid responses
//! that still carry error payloads. `relay-guard` gives callers one uniform
//! retry/error contract instead:
//!
//! - **[`Dispatcher`]** invokes an operation on a [`Relay`], validates
//!   successful responses, classifies failures, and loops per the chosen
//!   action.
//! - **[`ErrorClassifier`]** maps each [`RelayError`] to a
//!   [`Classification`]: retry with backoff, retry immediately, ignore, fail,
//!   or unknown.
//! - **[`BackoffPolicy`]** bounds retries and computes exponential delays.
//! - **[`ResponseValidator`]** rejects responses with embedded error lists or
//!   no recognizable result tag, feeding those failures back through
//!   classification.
//!
//! The relay itself (the thing performing the remote call and wire
//! encoding/decoding) is an external collaborator behind the [`Relay`]
//! trait. This crate implements no remote protocol, parses no wire formats,
//! and does no circuit breaking or rate limiting beyond bounded retries.
//!
//! # Usage
//!
//! ```ignore
//! use relay_guard::prelude::*;
//! use std::sync::Arc;
//!
//! let dispatcher = Dispatcher::builder(Arc::new(my_relay))
//!     .backoff(BackoffPolicy::builder().max_attempts(4).build())
//!     .build();
//!
//! match dispatcher.dispatch("searchHITs", vec![]).await? {
//!     DispatchOutcome::Response(response) => { /* validated payload */ }
//!     DispatchOutcome::Ignored(error) => { /* swallowed by policy */ }
//! }
//! ```
//!
//! Dispatch emits structured `tracing` events (attempt, classification,
//! validation); without a subscriber installed they are inert and control
//! flow is unaffected.

pub mod backoff;
pub mod classify;
pub mod dispatch;
pub mod error;
pub mod relay;
pub mod validate;

pub use backoff::{BackoffPolicy, BackoffPolicyBuilder};
pub use classify::{Classification, ClassifyError, ErrorClassifier, ErrorClassifierBuilder};
pub use dispatch::{DispatchOutcome, Dispatcher, DispatcherBuilder};
pub use error::{DispatchError, RelayError, Result};
pub use relay::{Relay, Response};
pub use validate::{ResponseValidator, ResponseValidatorBuilder};

/// Convenient re-exports of commonly used items.
///
/// ```rust
/// use relay_guard::prelude::*;
/// ```
pub mod prelude {
    pub use crate::backoff::BackoffPolicy;
    pub use crate::classify::{Classification, ClassifyError, ErrorClassifier};
    pub use crate::dispatch::{DispatchOutcome, Dispatcher};
    pub use crate::error::{DispatchError, RelayError, Result};
    pub use crate::relay::{Relay, Response};
    pub use crate::validate::ResponseValidator;
}
