//! BareMetalHost CRD
//!
//! Inventory record for a claimable physical or virtualized resource. Hosts
//! pre-exist in inventory; the machine controller claims one by setting its
//! consumer reference and provisioning payload, and releases it again when
//! the consuming machine is deleted.

use crate::references::{ConsumerRef, Image, SecretReference};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "metal.metalops.io",
    version = "v1alpha1",
    kind = "BareMetalHost",
    namespaced,
    status = "BareMetalHostStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct BareMetalHostSpec {
    /// Desired power/provisioning gate; set when the host is claimed
    #[serde(default)]
    pub online: bool,

    /// Provisioning payload; present iff the host is (being) provisioned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,

    /// User data handed to the host at provisioning time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<SecretReference>,

    /// Identity of the machine that currently claims this host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer_ref: Option<ConsumerRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BareMetalHostStatus {
    /// Progress of the inventory layer's provisioning state machine
    #[serde(default)]
    pub provisioning: ProvisioningStatus,

    /// Whether the host is currently powered on
    #[serde(default)]
    pub powered_on: bool,

    /// Health of the host as reported by the inventory layer
    #[serde(default)]
    pub operational_status: OperationalStatus,

    /// Hardware facts observed during inspection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware: Option<HardwareDetails>,
}

/// Provisioning progress reported by the inventory layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningStatus {
    /// Current provisioning state
    #[serde(default)]
    pub state: ProvisioningState,
}

/// States of the inventory layer's provisioning state machine.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum ProvisioningState {
    /// No state has been reported yet
    #[default]
    #[serde(rename = "")]
    None,
    /// The host is being registered with the inventory layer
    Registering,
    /// Registration failed
    RegistrationError,
    /// A hardware profile is being matched
    MatchProfile,
    /// Hardware inspection is in progress
    Inspecting,
    /// The host passed inspection and is ready to be provisioned
    Ready,
    /// Profile validation failed
    ValidationError,
    /// An image is being written
    Provisioning,
    /// An image has been written and the host booted into it
    Provisioned,
    /// The host was provisioned outside this system's control
    ExternallyProvisioned,
    /// The image is being removed
    Deprovisioning,
    /// The host record is being deleted
    Deleting,
    /// Power management failed
    PowerManagementError,
}

/// Health of a host as reported by the inventory layer.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum OperationalStatus {
    /// The host is operational
    #[default]
    Ok,
    /// The host was discovered but has incomplete credentials
    Discovered,
    /// The inventory layer reported an error for this host
    Error,
}

/// Hardware facts observed during inspection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HardwareDetails {
    /// Hostname reported by inspection; empty if none was observed
    #[serde(default)]
    pub hostname: String,

    /// Network interfaces in observation order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nic: Vec<Nic>,
}

/// A single observed network interface.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Nic {
    /// Interface name
    #[serde(default)]
    pub name: String,

    /// MAC address
    #[serde(default)]
    pub mac: String,

    /// IP address configured on the interface
    #[serde(default)]
    pub ip: String,
}

impl BareMetalHost {
    /// Returns true if the host can be claimed by a machine: nobody claims
    /// it, it is not being deleted, and the inventory layer has not flagged
    /// an error.
    pub fn is_available(&self) -> bool {
        if self.spec.consumer_ref.is_some() {
            return false;
        }
        if self.metadata.deletion_timestamp.is_some() {
            return false;
        }
        if let Some(status) = &self.status {
            if status.operational_status == OperationalStatus::Error {
                return false;
            }
        }
        true
    }
}
