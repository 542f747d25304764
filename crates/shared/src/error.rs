use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure body the posts API attaches to non-success responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

/// A server record that cannot be mapped into the domain model.
#[derive(Debug, Clone, Error)]
#[error("post record is missing an identifier")]
pub struct MissingRecordId;
