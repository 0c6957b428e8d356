//! Reconciliation entry point for BareMetalMachine resources.
//!
//! Maps a watch event to a lifecycle verb (deletion timestamp set → Delete;
//! otherwise Exists decides between Create and Update), runs the verb
//! against an in-memory copy of the machine, and flushes changed machine
//! fields back to the API in one pass: metadata/spec via a merge patch,
//! status via the status subresource. A requeue outcome becomes
//! `Action::requeue` for the scheduler.

use crate::error::ControllerError;
use crate::lifecycle::{Lifecycle, Outcome};
use crds::BareMetalMachine;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use kube_runtime::controller::Action;
use std::sync::Arc;
use tracing::{debug, info};

/// Finalizer ensuring the delete verb runs before the machine disappears.
pub const MACHINE_FINALIZER: &str = "metal.metalops.io/machine-controller";

/// Reconciles BareMetalMachine resources.
pub struct MachineReconciler {
    client: Client,
    lifecycle: Lifecycle,
}

impl std::fmt::Debug for MachineReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MachineReconciler").finish_non_exhaustive()
    }
}

impl MachineReconciler {
    /// Creates a new reconciler instance.
    pub fn new(client: Client, lifecycle: Lifecycle) -> Self {
        Self { client, lifecycle }
    }

    /// Reconciles one machine.
    pub async fn reconcile(
        &self,
        machine: Arc<BareMetalMachine>,
    ) -> Result<Action, ControllerError> {
        let name = machine
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| ControllerError::InvalidConfig("machine missing name".to_string()))?;
        let namespace = machine.metadata.namespace.as_deref().unwrap_or("default");
        let api: Api<BareMetalMachine> = Api::namespaced(self.client.clone(), namespace);

        let mut desired = (*machine).clone();

        let outcome = if machine.metadata.deletion_timestamp.is_some() {
            let outcome = self.lifecycle.delete(&mut desired).await?;
            if matches!(outcome, Outcome::Complete { .. }) {
                remove_finalizer(&mut desired);
            }
            outcome
        } else {
            add_finalizer(&mut desired);
            if self.lifecycle.exists(&desired).await? {
                self.lifecycle.update(&mut desired).await?
            } else {
                self.lifecycle.create(&mut desired).await?
            }
        };

        self.flush(&api, name, &machine, &desired).await?;

        Ok(match outcome {
            Outcome::Complete { provider_id } => {
                info!(
                    "Reconciled machine {}/{} (provider id: {:?})",
                    namespace, name, provider_id
                );
                Action::await_change()
            }
            Outcome::Requeue(delay) => Action::requeue(delay),
        })
    }

    /// Flushes machine fields that the lifecycle pass changed. Writes are
    /// batched here so a verb sees a consistent in-memory machine and the
    /// API sees at most one metadata/spec patch and one status patch.
    async fn flush(
        &self,
        api: &Api<BareMetalMachine>,
        name: &str,
        original: &BareMetalMachine,
        desired: &BareMetalMachine,
    ) -> Result<(), ControllerError> {
        let pp = PatchParams::default();

        let metadata_changed = original.metadata.annotations != desired.metadata.annotations
            || original.metadata.finalizers != desired.metadata.finalizers;
        let spec_changed = original.spec.provider_id != desired.spec.provider_id;

        if metadata_changed || spec_changed {
            let patch = serde_json::json!({
                "metadata": {
                    "annotations": desired.metadata.annotations,
                    "finalizers": desired.metadata.finalizers,
                },
                "spec": {
                    "providerId": desired.spec.provider_id,
                },
            });
            api.patch(name, &pp, &Patch::Merge(&patch)).await?;
            debug!("Patched machine {} metadata/spec", name);
        }

        if original.status != desired.status {
            let patch = serde_json::json!({ "status": desired.status });
            api.patch_status(name, &pp, &Patch::Merge(&patch)).await?;
            debug!("Patched machine {} status", name);
        }

        Ok(())
    }
}

fn add_finalizer(machine: &mut BareMetalMachine) {
    let finalizers = machine.metadata.finalizers.get_or_insert_default();
    if !finalizers.iter().any(|f| f == MACHINE_FINALIZER) {
        finalizers.push(MACHINE_FINALIZER.to_string());
    }
}

fn remove_finalizer(machine: &mut BareMetalMachine) {
    if let Some(finalizers) = &mut machine.metadata.finalizers {
        finalizers.retain(|f| f != MACHINE_FINALIZER);
    }
}
