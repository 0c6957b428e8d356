//! Machine status projection.
//!
//! Derives externally visible machine status (addresses, error fields) from
//! a bound host's observed hardware facts. Status is only rewritten when it
//! actually changed, so steady-state passes cause no update churn.

use chrono::Utc;
use crds::{
    BareMetalHost, BareMetalMachine, BareMetalMachineStatus, MachineAddress, MachineAddressType,
    MachineErrorReason,
};
use tracing::warn;

/// Derives the address list from a host's observed hardware facts.
///
/// One internal-IP entry per observed NIC in observation order, then — only
/// if a hostname was observed — a hostname entry and an internal-DNS entry.
pub fn node_addresses(host: Option<&BareMetalHost>) -> Vec<MachineAddress> {
    let mut addresses = Vec::new();

    let Some(hardware) = host.and_then(|h| h.status.as_ref()).and_then(|s| s.hardware.as_ref())
    else {
        return addresses;
    };

    for nic in &hardware.nic {
        addresses.push(MachineAddress {
            address_type: MachineAddressType::InternalIP,
            address: nic.ip.clone(),
        });
    }

    if !hardware.hostname.is_empty() {
        addresses.push(MachineAddress {
            address_type: MachineAddressType::Hostname,
            address: hardware.hostname.clone(),
        });
        addresses.push(MachineAddress {
            address_type: MachineAddressType::InternalDNS,
            address: hardware.hostname.clone(),
        });
    }

    addresses
}

/// Recomputes the machine's derived status from the bound host.
///
/// The status is compared structurally against the stored value and only
/// replaced (with a fresh lastUpdated stamp) when something changed.
pub fn refresh_machine_status(machine: &mut BareMetalMachine, host: Option<&BareMetalHost>) {
    let current = machine.status.clone().unwrap_or_default();

    let mut next = current.clone();
    next.addresses = node_addresses(host);

    if machine.status.is_some() && next == current {
        // Status did not change
        return;
    }

    next.last_updated = Some(Utc::now());
    machine.status = Some(next);
}

/// Marks the machine ready in its status.
pub fn set_ready(machine: &mut BareMetalMachine) {
    machine
        .status
        .get_or_insert_with(BareMetalMachineStatus::default)
        .ready = true;
}

/// Records a terminal error on the machine's status so operators can inspect
/// it without log access.
pub fn set_error(machine: &mut BareMetalMachine, reason: MachineErrorReason, message: String) {
    warn!(
        "Machine {:?} failed: {} ({:?})",
        machine.metadata.name, message, reason
    );
    let status = machine
        .status
        .get_or_insert_with(BareMetalMachineStatus::default);
    status.error_reason = Some(reason);
    status.error_message = Some(message);
}

/// Clears any previously recorded terminal error.
pub fn clear_error(machine: &mut BareMetalMachine) {
    if let Some(status) = &mut machine.status {
        if status.error_reason.is_some() || status.error_message.is_some() {
            status.error_reason = None;
            status.error_message = None;
        }
    }
}
