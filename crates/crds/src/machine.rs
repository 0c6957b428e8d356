//! BareMetalMachine CRD
//!
//! A workload descriptor seeking a bare-metal host: which OS image to
//! provision and a label selector restricting which hosts may be claimed.

use crate::references::{Image, SecretReference};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Annotation key on a BareMetalMachine that references the claimed host
/// as a `<namespace>/<name>` key.
pub const HOST_ANNOTATION: &str = "metal.metalops.io/baremetal-host";

/// Label marking a machine as part of the control plane.
pub const CONTROL_PLANE_LABEL: &str = "metal.metalops.io/control-plane";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "metal.metalops.io",
    version = "v1alpha1",
    kind = "BareMetalMachine",
    namespaced,
    status = "BareMetalMachineStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct BareMetalMachineSpec {
    /// Provider identifier, set once a host has been claimed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,

    /// OS image to provision onto the claimed host
    pub image: Image,

    /// User data to hand to the host at provisioning time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<SecretReference>,

    /// Selector restricting which hosts are eligible for this machine
    #[serde(default)]
    pub host_selector: HostSelector,
}

/// Label-based host selection criteria.
///
/// `match_labels` entries are exact-match requirements; `match_expressions`
/// carry an explicit operator. All requirements are ANDed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HostSelector {
    /// Exact-match label requirements
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub match_labels: BTreeMap<String, String>,

    /// Expression-form label requirements
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_expressions: Vec<HostSelectorRequirement>,
}

/// A single expression-form selector requirement.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HostSelectorRequirement {
    /// Label key the requirement applies to
    pub key: String,

    /// Operator, compared case-insensitively ("In", "NotIn", "Exists", ...)
    pub operator: String,

    /// Operand values; cardinality depends on the operator
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

/// Validation failures for a machine's provisioning descriptor.
///
/// These are terminal: a malformed descriptor requires human correction and
/// is never retried automatically.
#[derive(Debug, Error)]
pub enum MachineConfigError {
    /// The image URL is empty
    #[error("image url must not be empty")]
    MissingImageUrl,

    /// The image checksum is empty
    #[error("image checksum must not be empty")]
    MissingImageChecksum,
}

impl BareMetalMachineSpec {
    /// Validates the provisioning descriptor.
    pub fn validate(&self) -> Result<(), MachineConfigError> {
        if self.image.url.is_empty() {
            return Err(MachineConfigError::MissingImageUrl);
        }
        if self.image.checksum.is_empty() {
            return Err(MachineConfigError::MissingImageChecksum);
        }
        Ok(())
    }
}

impl BareMetalMachine {
    /// Returns true if the machine carries the control-plane label.
    pub fn is_control_plane(&self) -> bool {
        self.metadata
            .labels
            .as_ref()
            .is_some_and(|labels| labels.contains_key(CONTROL_PLANE_LABEL))
    }

    /// Role derived from the machine's labels.
    pub fn role(&self) -> &'static str {
        if self.is_control_plane() {
            "control-plane"
        } else {
            "node"
        }
    }
}

/// Status fields are serialized even when empty or unset: the controller
/// flushes status with a merge patch, and a merge patch can only clear a
/// previously stored field if the key is present with an explicit `null`
/// (or `[]`). Skipping unset keys here would make a cleared error stick to
/// the stored machine forever.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BareMetalMachineStatus {
    /// True once a host is bound and provisioning has been requested
    #[serde(default)]
    pub ready: bool,

    /// Addresses observed on the bound host
    #[serde(default)]
    pub addresses: Vec<MachineAddress>,

    /// Terminal error class, if any
    #[serde(default)]
    pub error_reason: Option<MachineErrorReason>,

    /// Terminal error detail, if any
    #[serde(default)]
    pub error_message: Option<String>,

    /// Timestamp of the last observed status change
    #[serde(default)]
    pub last_updated: Option<chrono::DateTime<chrono::Utc>>,
}

/// A single externally visible address derived from host hardware facts.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MachineAddress {
    /// Kind of address
    #[serde(rename = "type")]
    pub address_type: MachineAddressType,

    /// The address value
    pub address: String,
}

/// Kinds of machine addresses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum MachineAddressType {
    /// IP address on an internal network
    InternalIP,
    /// Hostname reported by inspection
    Hostname,
    /// Internal DNS name
    InternalDNS,
}

/// Terminal machine error classes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum MachineErrorReason {
    /// The machine's provisioning descriptor is malformed
    InvalidConfiguration,
}
