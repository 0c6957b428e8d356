//! Metalops CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the Metalops controllers.

pub mod host;
pub mod machine;
pub mod references;

pub use host::*;
pub use machine::*;
pub use references::*;

/// API group for all Metalops CRDs.
pub const API_GROUP: &str = "metal.metalops.io";

/// Full apiVersion string for the current CRD version.
pub const API_VERSION: &str = "metal.metalops.io/v1alpha1";
