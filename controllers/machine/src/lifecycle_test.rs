//! Unit tests for the machine lifecycle state machine

use crate::allocator::Allocator;
use crate::error::ControllerError;
use crate::lifecycle::{Lifecycle, Outcome};
use crate::test_utils::*;
use crds::{HOST_ANNOTATION, MachineErrorReason, ProvisioningState};
use host_inventory::{HostStore, MockHostStore};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;

const REQUEUE: Duration = Duration::from_secs(30);

fn lifecycle(store: &MockHostStore, seed: u64) -> Lifecycle {
    let store: Arc<dyn HostStore> = Arc::new(store.clone());
    let allocator = Allocator::with_rng(Arc::clone(&store), StdRng::seed_from_u64(seed));
    Lifecycle::with_allocator(store, allocator, REQUEUE)
}

fn provider_id(outcome: &Outcome) -> Option<String> {
    match outcome {
        Outcome::Complete { provider_id } => provider_id.clone(),
        Outcome::Requeue(_) => panic!("expected completion, got requeue"),
    }
}

#[tokio::test]
async fn test_create_claims_matching_host() {
    let store = MockHostStore::new();
    store.add_host(host_with_labels("host-1", "ns", &[("tier", "edge")]));
    store.add_host(host_with_labels("host-2", "ns", &[("tier", "core")]));

    let mut machine = machine_with_selector("machine-0", "ns", &[("tier", "core")]);
    let outcome = lifecycle(&store, 3).create(&mut machine).await.unwrap();

    assert_eq!(provider_id(&outcome).as_deref(), Some("host-2"));
    assert_eq!(machine.spec.provider_id.as_deref(), Some("host-2"));
    assert_eq!(
        machine
            .metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(HOST_ANNOTATION))
            .map(String::as_str),
        Some("ns/host-2")
    );

    let claimed = store.stored_host("ns", "host-2").unwrap();
    assert!(claimed.spec.online);
    assert!(claimed.spec.image.is_some());
    assert!(claimed.spec.consumer_ref.is_some());
}

#[tokio::test]
async fn test_create_requeues_when_no_host_available() {
    let store = MockHostStore::new();
    let mut machine = machine_with_selector("machine-0", "ns", &[("tier", "core")]);

    let outcome = lifecycle(&store, 3).create(&mut machine).await.unwrap();
    assert_eq!(outcome, Outcome::Requeue(REQUEUE));
    assert!(machine.metadata.annotations.is_none());
}

#[tokio::test]
async fn test_create_invalid_config_is_terminal() {
    let store = MockHostStore::new();
    store.add_host(test_host("host-1", "ns"));

    let mut machine = test_machine("machine-0", "ns");
    machine.spec.image.url = String::new();

    // Terminal: completes without a provider id instead of requeuing
    let outcome = lifecycle(&store, 3).create(&mut machine).await.unwrap();
    assert_eq!(provider_id(&outcome), None);

    let status = machine.status.unwrap();
    assert_eq!(status.error_reason, Some(MachineErrorReason::InvalidConfiguration));
    assert!(status.error_message.is_some());

    // The host pool was not touched
    assert_eq!(store.update_calls(), 0);
}

#[tokio::test]
async fn test_create_twice_is_idempotent() {
    let store = MockHostStore::new();
    store.add_host(host_with_labels("host-1", "ns", &[("tier", "core")]));
    store.add_host(host_with_labels("host-2", "ns", &[("tier", "core")]));

    let mut machine = machine_with_selector("machine-0", "ns", &[("tier", "core")]);

    let lc = lifecycle(&store, 9);
    let first = provider_id(&lc.create(&mut machine).await.unwrap());

    // Different seed: a re-run must find the binding, not re-randomize
    let lc = lifecycle(&store, 10);
    let second = provider_id(&lc.create(&mut machine).await.unwrap());

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_create_recovers_binding_from_consumer_ref() {
    // The annotation flush was lost (crash before machine patch); the
    // consumer ref alone must bring reconciliation back to the same host.
    let store = MockHostStore::new();
    store.add_host(host_with_labels("host-1", "ns", &[("tier", "core")]));
    store.add_host(host_with_labels("host-2", "ns", &[("tier", "core")]));

    let mut machine = machine_with_selector("machine-0", "ns", &[("tier", "core")]);
    let lc = lifecycle(&store, 9);
    let first = provider_id(&lc.create(&mut machine).await.unwrap());

    // Simulate the lost annotation
    let mut amnesiac = machine_with_selector("machine-0", "ns", &[("tier", "core")]);
    let lc = lifecycle(&store, 10);
    let second = provider_id(&lc.create(&mut amnesiac).await.unwrap());

    assert_eq!(first, second);
    // And the annotation was re-derived
    assert!(
        amnesiac
            .metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(HOST_ANNOTATION))
            .is_some()
    );
}

#[tokio::test]
async fn test_update_requires_existing_binding() {
    let store = MockHostStore::new();
    let mut machine = test_machine("machine-0", "ns");

    let result = lifecycle(&store, 3).update(&mut machine).await;
    match result {
        Err(ControllerError::HostNotFound(message)) => {
            assert!(message.contains("machine-0"));
        }
        other => panic!("expected HostNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_update_repairs_annotation_and_status() {
    let store = MockHostStore::new();
    let machine_for_claim = test_machine("machine-0", "ns");
    let mut host = host_claimed_by("host-1", "ns", &machine_for_claim);
    with_hardware(&mut host, "node-1.local", &["10.0.0.5"]);
    store.add_host(host);

    let mut machine = test_machine("machine-0", "ns");
    annotate_with_host(&mut machine, "ns", "host-1");

    let outcome = lifecycle(&store, 3).update(&mut machine).await.unwrap();
    assert_eq!(provider_id(&outcome).as_deref(), Some("host-1"));

    let status = machine.status.unwrap();
    assert!(status.ready);
    assert_eq!(status.addresses.len(), 3);
    assert!(status.last_updated.is_some());
}

#[tokio::test]
async fn test_delete_no_binding_is_noop() {
    let store = MockHostStore::new();
    let mut machine = test_machine("machine-0", "ns");

    let outcome = lifecycle(&store, 3).delete(&mut machine).await.unwrap();
    assert_eq!(provider_id(&outcome), None);
    assert_eq!(store.update_calls(), 0);
}

#[tokio::test]
async fn test_delete_leaves_other_machines_claim_alone() {
    let store = MockHostStore::new();
    let other = test_machine("machine-1", "ns");
    store.add_host(host_claimed_by("host-1", "ns", &other));

    // Stale annotation pointing at a host now claimed by someone else
    let mut machine = test_machine("machine-0", "ns");
    annotate_with_host(&mut machine, "ns", "host-1");

    let outcome = lifecycle(&store, 3).delete(&mut machine).await.unwrap();
    assert_eq!(provider_id(&outcome), None);
    assert_eq!(store.update_calls(), 0);
    assert!(store.stored_host("ns", "host-1").unwrap().spec.consumer_ref.is_some());
}

#[tokio::test]
async fn test_delete_triggers_deprovision_then_requeues() {
    let store = MockHostStore::new();
    let machine_id = test_machine("machine-0", "ns");
    let mut host = host_claimed_by("host-1", "ns", &machine_id);
    host.spec.image = Some(machine_id.spec.image.clone());
    host.spec.online = true;
    store.add_host(host);

    let mut machine = test_machine("machine-0", "ns");
    annotate_with_host(&mut machine, "ns", "host-1");

    let outcome = lifecycle(&store, 3).delete(&mut machine).await.unwrap();
    assert_eq!(outcome, Outcome::Requeue(REQUEUE));

    // Payload stripped, claim still held until deprovisioning is observed
    let stored = store.stored_host("ns", "host-1").unwrap();
    assert!(stored.spec.image.is_none());
    assert!(!stored.spec.online);
    assert!(stored.spec.user_data.is_none());
    assert!(stored.spec.consumer_ref.is_some());
}

#[tokio::test]
async fn test_delete_releases_never_provisioned_host() {
    let store = MockHostStore::new();
    let machine_id = test_machine("machine-0", "ns");
    let mut host = host_claimed_by("host-1", "ns", &machine_id);
    host.status.as_mut().unwrap().provisioning.state = ProvisioningState::Ready;
    store.add_host(host);

    let mut machine = test_machine("machine-0", "ns");
    annotate_with_host(&mut machine, "ns", "host-1");

    let outcome = lifecycle(&store, 3).delete(&mut machine).await.unwrap();
    assert_eq!(provider_id(&outcome).as_deref(), Some("host-1"));
    assert!(store.stored_host("ns", "host-1").unwrap().spec.consumer_ref.is_none());
}

#[tokio::test]
async fn test_delete_waits_while_deprovisioning() {
    let store = MockHostStore::new();
    let machine_id = test_machine("machine-0", "ns");
    let mut host = host_claimed_by("host-1", "ns", &machine_id);
    host.status.as_mut().unwrap().provisioning.state = ProvisioningState::Deprovisioning;
    store.add_host(host);

    let mut machine = test_machine("machine-0", "ns");
    annotate_with_host(&mut machine, "ns", "host-1");

    let outcome = lifecycle(&store, 3).delete(&mut machine).await.unwrap();
    assert_eq!(outcome, Outcome::Requeue(REQUEUE));
    assert!(store.stored_host("ns", "host-1").unwrap().spec.consumer_ref.is_some());
}

#[tokio::test]
async fn test_delete_externally_provisioned_waits_for_power_off() {
    let store = MockHostStore::new();
    let machine_id = test_machine("machine-0", "ns");
    let mut host = host_claimed_by("host-1", "ns", &machine_id);
    {
        let status = host.status.as_mut().unwrap();
        status.provisioning.state = ProvisioningState::ExternallyProvisioned;
        status.powered_on = true;
    }
    store.add_host(host);

    let mut machine = test_machine("machine-0", "ns");
    annotate_with_host(&mut machine, "ns", "host-1");

    let lc = lifecycle(&store, 3);
    let outcome = lc.delete(&mut machine).await.unwrap();
    assert_eq!(outcome, Outcome::Requeue(REQUEUE));

    // Power goes off between passes; the next delete releases the host
    let mut stored = store.stored_host("ns", "host-1").unwrap();
    stored.status.as_mut().unwrap().powered_on = false;
    store.add_host(stored);

    let outcome = lc.delete(&mut machine).await.unwrap();
    assert_eq!(provider_id(&outcome).as_deref(), Some("host-1"));
    assert!(store.stored_host("ns", "host-1").unwrap().spec.consumer_ref.is_none());
}

#[tokio::test]
async fn test_exists_reflects_binding() {
    let store = MockHostStore::new();
    store.add_host(test_host("host-1", "ns"));

    let mut machine = test_machine("machine-0", "ns");
    let lc = lifecycle(&store, 3);
    assert!(!lc.exists(&machine).await.unwrap());

    annotate_with_host(&mut machine, "ns", "host-1");
    assert!(lc.exists(&machine).await.unwrap());
}
