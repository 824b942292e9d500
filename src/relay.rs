//! The relay seam: the external collaborator performing the remote call.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::RelayError;

/// A decoded remote result: an unordered mapping of result tag to payload.
pub type Response = Map<String, Value>;

/// External collaborator that performs the actual remote call.
///
/// The dispatcher is agnostic to how the relay encodes or decodes the wire
/// protocol. Failures must be decided into a [`RelayError`] variant here, at
/// the boundary, so classification never has to pattern-match on strings.
///
/// Thread safety of the underlying connection is the relay's own concern;
/// the dispatcher neither guarantees nor requires it beyond `Send + Sync`.
#[async_trait]
pub trait Relay: Send + Sync {
    /// Invoke `operation` with `args`, returning the decoded response.
    async fn invoke(&self, operation: &str, args: &[Value]) -> Result<Response, RelayError>;
}
