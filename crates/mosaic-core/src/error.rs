use thiserror::Error;

/// Failures reading or writing a workspace document.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("invalid workspace JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported workspace version: {0}")]
    UnsupportedVersion(String),
}
