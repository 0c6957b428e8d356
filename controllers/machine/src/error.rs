//! Controller-specific error types.
//!
//! This module defines error types specific to the Machine Controller that
//! are not covered by upstream library errors. Retry-after-delay is not an
//! error here; it is expressed as [`crate::lifecycle::Outcome::Requeue`].

use crate::selector::SelectorError;
use host_inventory::StoreError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the Machine Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Host inventory store error
    #[error("host store error: {0}")]
    Store(#[from] StoreError),

    /// Malformed host selector; aborts candidate selection entirely
    #[error("invalid host selector: {0}")]
    Selector(#[from] SelectorError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A machine expected to be bound has no resolvable host
    #[error("{0}")]
    HostNotFound(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
