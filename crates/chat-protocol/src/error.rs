use thiserror::Error;

/// Failure to turn wire bytes into a [`crate::Frame`].
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed json")]
    Json(#[from] serde_json::Error),
}
