//! Kubernetes resource watcher.
//!
//! Watches BareMetalMachine resources and triggers reconciliation using
//! `kube_runtime::Controller`, which handles automatic reconnection, retries,
//! and delayed requeues. Retry cadence for "no actionable work yet" passes is
//! entirely driven by the `Action` the reconciler returns.

use crate::error::ControllerError;
use crate::reconciler::MachineReconciler;
use crds::BareMetalMachine;
use futures::StreamExt;
use kube::{Api, Client};
use kube_runtime::{Controller, controller::Action, watcher};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Starts watching BareMetalMachine resources until the stream ends.
pub async fn watch_machines(
    client: Client,
    reconciler: Arc<MachineReconciler>,
    namespace: Option<&str>,
) -> Result<(), ControllerError> {
    info!("Starting BareMetalMachine watcher");

    let machine_api: Api<BareMetalMachine> = match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    };

    // Error policy: requeue with a fixed backoff on genuine errors. Requeue
    // signals never land here; they are returned as successful Actions.
    let error_policy = |obj: Arc<BareMetalMachine>, error: &ControllerError, _ctx: Arc<MachineReconciler>| {
        error!(
            "Reconciliation error for machine {:?}: {}",
            obj.metadata.name, error
        );
        Action::requeue(Duration::from_secs(60))
    };

    let reconcile = |obj: Arc<BareMetalMachine>, ctx: Arc<MachineReconciler>| async move {
        debug!("Reconciling machine {:?}", obj.metadata.name);
        ctx.reconcile(obj).await
    };

    Controller::new(machine_api, watcher::Config::default())
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| async move {
            match res {
                Ok(obj) => debug!("Reconciled {:?}", obj),
                Err(e) => error!("Controller error: {}", e),
            }
        })
        .await;

    Ok(())
}
