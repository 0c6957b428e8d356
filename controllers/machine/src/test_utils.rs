//! Test utilities for unit testing the machine lifecycle
//!
//! This module provides helpers for creating test machines and hosts and
//! setting up mock inventory scenarios.

use crds::{
    BareMetalHost, BareMetalHostSpec, BareMetalHostStatus, BareMetalMachine, BareMetalMachineSpec,
    ConsumerRef, HardwareDetails, HostSelector, Image, Nic, ProvisioningState, API_VERSION,
    HOST_ANNOTATION,
};
use host_inventory::host_key;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

/// Helper to create a test BareMetalMachine with a valid image payload.
pub fn test_machine(name: &str, namespace: &str) -> BareMetalMachine {
    BareMetalMachine {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: BareMetalMachineSpec {
            provider_id: None,
            image: Image {
                url: "http://images.local/node.qcow2".to_string(),
                checksum: "http://images.local/node.qcow2.md5sum".to_string(),
            },
            user_data: None,
            host_selector: HostSelector::default(),
        },
        status: None,
    }
}

/// Helper to create a test machine whose selector requires the given
/// exact-match labels.
pub fn machine_with_selector(
    name: &str,
    namespace: &str,
    match_labels: &[(&str, &str)],
) -> BareMetalMachine {
    let mut machine = test_machine(name, namespace);
    machine.spec.host_selector.match_labels = match_labels
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    machine
}

/// Helper to create an available test host.
pub fn test_host(name: &str, namespace: &str) -> BareMetalHost {
    BareMetalHost {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: BareMetalHostSpec::default(),
        status: Some(BareMetalHostStatus {
            provisioning: crds::ProvisioningStatus {
                state: ProvisioningState::Ready,
            },
            ..Default::default()
        }),
    }
}

/// Helper to create an available test host carrying labels.
pub fn host_with_labels(name: &str, namespace: &str, labels: &[(&str, &str)]) -> BareMetalHost {
    let mut host = test_host(name, namespace);
    host.metadata.labels = Some(
        labels
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect::<BTreeMap<_, _>>(),
    );
    host
}

/// Helper to create a host already claimed by the given machine.
pub fn host_claimed_by(name: &str, namespace: &str, machine: &BareMetalMachine) -> BareMetalHost {
    let mut host = test_host(name, namespace);
    host.spec.consumer_ref = Some(consumer_ref(machine));
    host
}

/// The consumer reference identifying a test machine.
pub fn consumer_ref(machine: &BareMetalMachine) -> ConsumerRef {
    ConsumerRef {
        api_version: API_VERSION.to_string(),
        kind: "BareMetalMachine".to_string(),
        name: machine.metadata.name.clone().unwrap_or_default(),
        namespace: machine.metadata.namespace.clone().unwrap_or_default(),
    }
}

/// Stamps the binding annotation onto a machine (for test setup).
pub fn annotate_with_host(machine: &mut BareMetalMachine, namespace: &str, name: &str) {
    machine
        .metadata
        .annotations
        .get_or_insert_default()
        .insert(HOST_ANNOTATION.to_string(), host_key(namespace, name));
}

/// Attaches observed hardware facts to a host (for test setup).
pub fn with_hardware(host: &mut BareMetalHost, hostname: &str, ips: &[&str]) {
    let hardware = HardwareDetails {
        hostname: hostname.to_string(),
        nic: ips
            .iter()
            .enumerate()
            .map(|(i, ip)| Nic {
                name: format!("eth{i}"),
                mac: format!("00:00:00:00:00:{i:02x}"),
                ip: (*ip).to_string(),
            })
            .collect(),
    };
    host.status
        .get_or_insert_with(BareMetalHostStatus::default)
        .hardware = Some(hardware);
}
