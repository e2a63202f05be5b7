use anyhow::Error;
use thiserror::Error;

/// Application-level error types for presign-refresh.
///
/// Collaborator traits return `anyhow::Result`; the variants here are wrapped
/// into `anyhow::Error` where a caller needs to classify the failure (most
/// importantly throttling, see [`is_throttling_error`]).
#[derive(Error, Debug, PartialEq)]
pub enum RefreshError {
    /// Configuration error (missing or invalid setting).
    #[error("{0}")]
    InvalidConfig(String),

    /// The record carries no usable object reference.
    #[error("Invalid object reference: {0}")]
    InvalidReference(String),

    /// The object-storage service could not produce a presigned URL.
    #[error("Object storage error: {0}")]
    Upstream(String),

    /// The metadata store rejected a request because provisioned capacity was exceeded.
    #[error("Metadata store throttled the request: {0}")]
    Throttled(String),

    /// Any other metadata store failure.
    #[error("Metadata store error: {0}")]
    Store(String),

    /// Notification delivery failure.
    #[error("Notification error: {0}")]
    Notification(String),
}

impl RefreshError {
    /// Only throttling is retried by the pagination loop. Everything else is
    /// either recovered per record or fatal to the run.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RefreshError::Throttled(_))
    }
}

/// Check if an anyhow::Error wraps a throttling error from the metadata store.
pub fn is_throttling_error(e: &Error) -> bool {
    if let Some(err) = e.downcast_ref::<RefreshError>() {
        return err.is_retryable();
    }
    false
}
