use shared::domain::PostId;
use thiserror::Error;

/// Failure taxonomy shared by listing fetches and mutations. `Clone` so an
/// error can sit in cache state and ride event payloads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// A required field was empty; checked locally, never reaches the
    /// network.
    #[error("{field} must not be empty")]
    Validation { field: &'static str },
    /// The request could not complete (no response arrived) or the response
    /// body could not be decoded.
    #[error("request failed: {0}")]
    Network(String),
    /// The server responded with a failure status. `message` carries the
    /// server-provided text when it sent one, else the status line.
    #[error("server rejected the request ({status}): {message}")]
    Remote { status: u16, message: String },
    /// The mutation target no longer exists.
    #[error("post {0} no longer exists")]
    NotFound(PostId),
}
