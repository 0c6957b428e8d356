//! Store-specific error types.

use thiserror::Error;

/// Errors surfaced by a [`crate::HostStore`].
///
/// `NotFound` and `Conflict` are expected outcomes that callers handle
/// explicitly; anything wrapped in `Api` is a transport or server failure
/// that propagates unchanged.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record targeted by an update no longer exists
    #[error("host not found: {0}")]
    NotFound(String),

    /// The record changed since it was read (optimistic update rejected)
    #[error("update conflict for host: {0}")]
    Conflict(String),

    /// A durable host key did not parse as `<namespace>/<name>`
    #[error("malformed host key: {0:?}")]
    MalformedKey(String),

    /// A host record is missing its name or namespace
    #[error("host record missing metadata: {0}")]
    MissingMetadata(String),

    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Api(#[from] kube::Error),
}
