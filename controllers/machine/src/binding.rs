//! Binding management between machines and hosts.
//!
//! The binding is recorded twice: the host's consumer reference points at
//! the machine, and the machine carries an annotation holding the host's
//! durable key. The consumer reference is authoritative; the annotation is a
//! cache that gets repaired here. `commit_binding` persists the host side
//! eagerly, while `ensure_binding` only mutates the in-memory machine — the
//! reconciler flushes machine fields once at the end of a pass, and a crash
//! before that flush is recovered by re-deriving the binding from the
//! consumer reference on the next pass.

use crate::error::ControllerError;
use crds::{BareMetalHost, BareMetalMachine, ConsumerRef, HOST_ANNOTATION, API_VERSION};
use host_inventory::{HostStore, StoreError, host_key_for};
use tracing::warn;

/// Kind string recorded in a host's consumer reference.
const MACHINE_KIND: &str = "BareMetalMachine";

pub(crate) fn machine_name(machine: &BareMetalMachine) -> Result<&str, ControllerError> {
    machine
        .metadata
        .name
        .as_deref()
        .ok_or_else(|| ControllerError::InvalidConfig("machine missing name".to_string()))
}

pub(crate) fn machine_namespace(machine: &BareMetalMachine) -> &str {
    machine.metadata.namespace.as_deref().unwrap_or("default")
}

/// Builds the consumer reference identifying a machine.
pub fn consumer_ref_for(machine: &BareMetalMachine) -> Result<ConsumerRef, ControllerError> {
    Ok(ConsumerRef {
        api_version: API_VERSION.to_string(),
        kind: MACHINE_KIND.to_string(),
        name: machine_name(machine)?.to_string(),
        namespace: machine_namespace(machine).to_string(),
    })
}

/// Returns true if a host's consumer reference resolves to this machine's
/// identity (name, namespace, kind, and apiVersion all match).
pub fn consumer_ref_matches(consumer: &ConsumerRef, machine: &BareMetalMachine) -> bool {
    machine.metadata.name.as_deref() == Some(consumer.name.as_str())
        && machine_namespace(machine) == consumer.namespace
        && consumer.kind == MACHINE_KIND
        && consumer.api_version == API_VERSION
}

/// Claims a host for a machine and persists the host record.
///
/// The image is only written if the host does not already carry one: a host
/// with an existing image is already provisioned, and re-imaging requires a
/// full deprovision first. An unset user-data namespace defaults to the
/// machine's namespace. The host is persisted with a single optimistic
/// update; a conflict surfaces to the caller for retry on the next pass.
pub async fn commit_binding(
    store: &dyn HostStore,
    machine: &BareMetalMachine,
    host: &mut BareMetalHost,
) -> Result<(), ControllerError> {
    if host.spec.image.is_none() {
        host.spec.image = Some(machine.spec.image.clone());
        host.spec.user_data = machine.spec.user_data.clone();
        if let Some(user_data) = &mut host.spec.user_data {
            if user_data.namespace.is_none() {
                user_data.namespace = Some(machine_namespace(machine).to_string());
            }
        }
    }

    host.spec.consumer_ref = Some(consumer_ref_for(machine)?);
    host.spec.online = true;

    *host = store.update_host(host).await?;
    Ok(())
}

/// Makes sure the machine's annotation references the host's durable key.
///
/// Mutates only the in-memory machine; persistence is batched with the other
/// machine field updates at the end of the lifecycle operation.
pub fn ensure_binding(
    machine: &mut BareMetalMachine,
    host: &BareMetalHost,
) -> Result<(), ControllerError> {
    let host_key = host_key_for(host)?;
    let machine_name = machine_name(machine)?.to_string();
    let annotations = machine.metadata.annotations.get_or_insert_default();

    if let Some(existing) = annotations.get(HOST_ANNOTATION) {
        if *existing == host_key {
            return Ok(());
        }
        warn!(
            "Found stray annotation for host {} on machine {}. Overwriting.",
            existing, machine_name
        );
    }
    annotations.insert(HOST_ANNOTATION.to_string(), host_key);
    Ok(())
}

/// Releases a host by clearing its consumer reference and persisting it.
///
/// A vanished host is fine at this point; there is nothing left to release.
pub async fn release_binding(
    store: &dyn HostStore,
    host: &mut BareMetalHost,
) -> Result<(), ControllerError> {
    host.spec.consumer_ref = None;
    match store.update_host(host).await {
        Ok(updated) => {
            *host = updated;
            Ok(())
        }
        Err(StoreError::NotFound(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
