//! Shared reference and payload types for Metalops CRDs
//!
//! These types appear in both the machine and host specs: the provisioning
//! image payload, a secret reference for user-data, and the consumer
//! reference a host uses to record which machine currently claims it.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// OS image to provision onto a host.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// URL of the image to deploy
    pub url: String,

    /// Checksum (or checksum URL) used to verify the image
    pub checksum: String,
}

/// Reference to a Secret holding cloud-init style user data.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecretReference {
    /// Name of the secret
    pub name: String,

    /// Namespace of the secret (defaults to the machine's namespace)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Identity of the machine that currently claims a host.
///
/// Stored on the host side of the binding. A host is claimed by a machine
/// iff this reference resolves to that machine's identity; the machine-side
/// annotation is only a cache of the same relation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerRef {
    /// apiVersion of the consuming resource
    pub api_version: String,

    /// Kind of the consuming resource (always "BareMetalMachine" today)
    pub kind: String,

    /// Name of the consuming resource
    pub name: String,

    /// Namespace of the consuming resource
    pub namespace: String,
}
