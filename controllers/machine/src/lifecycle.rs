//! Machine lifecycle operations.
//!
//! Orchestrates the Create/Update/Delete/Exists verbs for a single machine:
//! sequencing allocation and binding, translating host provisioning state
//! into the deprovisioning protocol on delete, and surfacing "come back
//! later" as a [`Outcome::Requeue`] result rather than an error.
//!
//! Verbs mutate only the in-memory machine they are handed; the reconciler
//! flushes machine fields to the API once at the end of a pass. Host records
//! are persisted eagerly through the store.

use crate::allocator::Allocator;
use crate::binding;
use crate::error::ControllerError;
use crate::status;
use crds::{BareMetalMachine, MachineErrorReason, ProvisioningState};
use host_inventory::{HostStore, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Result of a lifecycle verb.
///
/// `Requeue` is a control signal, not a failure: there is no actionable work
/// yet and the verb should be re-invoked after the delay. Genuine failures
/// travel as `Err(ControllerError)` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The verb ran to completion; carries the provider identifier when a
    /// host is (still) associated
    Complete {
        /// Name of the bound host, if any
        provider_id: Option<String>,
    },
    /// No actionable work yet; re-invoke after the delay
    Requeue(Duration),
}

impl Outcome {
    fn done(provider_id: Option<String>) -> Self {
        Self::Complete { provider_id }
    }
}

/// Executes lifecycle verbs for machines.
pub struct Lifecycle {
    store: Arc<dyn HostStore>,
    allocator: Allocator,
    requeue_after: Duration,
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("requeue_after", &self.requeue_after)
            .finish_non_exhaustive()
    }
}

impl Lifecycle {
    /// Creates a lifecycle executor over a host store.
    pub fn new(store: Arc<dyn HostStore>, requeue_after: Duration) -> Self {
        let allocator = Allocator::new(Arc::clone(&store));
        Self::with_allocator(store, allocator, requeue_after)
    }

    /// Creates a lifecycle executor with a caller-provided allocator
    /// (lets tests inject a seeded random source).
    pub fn with_allocator(
        store: Arc<dyn HostStore>,
        allocator: Allocator,
        requeue_after: Duration,
    ) -> Self {
        Self {
            store,
            allocator,
            requeue_after,
        }
    }

    /// Create: validate the descriptor, find or choose a host, claim it and
    /// record the binding.
    pub async fn create(&self, machine: &mut BareMetalMachine) -> Result<Outcome, ControllerError> {
        let name = binding::machine_name(machine)?.to_string();
        info!("Creating machine {} (role: {})", name, machine.role());

        // Malformed config is terminal: record it and do not requeue
        if let Err(e) = machine.spec.validate() {
            status::set_error(machine, MachineErrorReason::InvalidConfiguration, e.to_string());
            return Ok(Outcome::done(None));
        }

        // clear an error if one was previously set
        status::clear_error(machine);

        let host = match self.allocator.bound_host(machine).await? {
            Some(host) => {
                info!(
                    "Machine {} already associated with host {:?}",
                    name, host.metadata.name
                );
                Some(host)
            }
            None => self.allocator.choose_host(machine).await?,
        };

        let Some(mut host) = host else {
            info!("No available host found. Requeuing.");
            return Ok(Outcome::Requeue(self.requeue_after));
        };

        let provider_id = host.metadata.name.clone().unwrap_or_default();
        info!("Associating machine {} with host {}", name, provider_id);

        binding::commit_binding(self.store.as_ref(), machine, &mut host).await?;
        binding::ensure_binding(machine, &host)?;

        machine.spec.provider_id = Some(provider_id.clone());
        status::set_ready(machine);
        status::refresh_machine_status(machine, Some(&host));

        info!("Finished creating machine {}", name);
        Ok(Outcome::done(Some(provider_id)))
    }

    /// Update: repair annotation drift and refresh derived status. A machine
    /// with no resolvable binding is a hard error here — Update implies
    /// Create already succeeded.
    pub async fn update(&self, machine: &mut BareMetalMachine) -> Result<Outcome, ControllerError> {
        let name = binding::machine_name(machine)?.to_string();
        info!("Updating machine {}", name);

        // clear any error message that was previously set; this verb does
        // not set error messages yet, so any present is stale
        status::clear_error(machine);

        let host = self
            .allocator
            .bound_host(machine)
            .await?
            .ok_or_else(|| ControllerError::HostNotFound(format!("host not found for machine {name}")))?;

        let provider_id = host.metadata.name.clone().unwrap_or_default();

        binding::ensure_binding(machine, &host)?;
        machine.spec.provider_id = Some(provider_id.clone());
        status::set_ready(machine);
        status::refresh_machine_status(machine, Some(&host));

        info!("Finished updating machine {}", name);
        Ok(Outcome::done(Some(provider_id)))
    }

    /// Delete: walk the bound host through deprovisioning, then release it.
    pub async fn delete(&self, machine: &mut BareMetalMachine) -> Result<Outcome, ControllerError> {
        let name = binding::machine_name(machine)?.to_string();
        info!("Deleting machine {}", name);

        let Some(mut host) = self.allocator.bound_host(machine).await? else {
            info!("finished deleting machine {}.", name);
            return Ok(Outcome::done(None));
        };

        let Some(consumer) = &host.spec.consumer_ref else {
            info!("finished deleting machine {}.", name);
            return Ok(Outcome::done(None));
        };

        // don't remove the consumer ref if it references some other machine
        if !binding::consumer_ref_matches(consumer, machine) {
            info!(
                "host associated with {}, not machine {}.",
                consumer.name, name
            );
            return Ok(Outcome::done(None));
        }

        let provider_id = host.metadata.name.clone().unwrap_or_default();

        // Phase one: strip the provisioning payload so the inventory layer
        // starts deprovisioning, then come back to observe progress
        if host.spec.image.is_some() || host.spec.online || host.spec.user_data.is_some() {
            host.spec.image = None;
            host.spec.online = false;
            host.spec.user_data = None;
            match self.store.update_host(&host).await {
                Ok(_) | Err(StoreError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
            return Ok(Outcome::Requeue(self.requeue_after));
        }

        // Phase two: wait for the inventory layer unless the host never got
        // provisioned in the first place
        let state = host
            .status
            .as_ref()
            .map(|s| s.provisioning.state)
            .unwrap_or_default();
        let waiting = match state {
            ProvisioningState::RegistrationError
            | ProvisioningState::Registering
            | ProvisioningState::MatchProfile
            | ProvisioningState::Inspecting
            | ProvisioningState::Ready
            | ProvisioningState::ValidationError => false,
            ProvisioningState::ExternallyProvisioned => {
                // Provisioning is outside this system's control; wait until
                // the host is powered off
                host.status.as_ref().is_some_and(|s| s.powered_on)
            }
            _ => true,
        };
        if waiting {
            info!("Waiting for host {} to deprovision. Requeuing.", provider_id);
            return Ok(Outcome::Requeue(self.requeue_after));
        }

        binding::release_binding(self.store.as_ref(), &mut host).await?;

        info!("finished deleting machine {}.", name);
        Ok(Outcome::done(Some(provider_id)))
    }

    /// Exists: true iff the machine's binding is present and resolvable.
    pub async fn exists(&self, machine: &BareMetalMachine) -> Result<bool, ControllerError> {
        let exists = self.allocator.bound_host(machine).await?.is_some();
        if exists {
            info!("Machine {:?} exists.", machine.metadata.name);
        } else {
            info!("Machine {:?} does not exist.", machine.metadata.name);
        }
        Ok(exists)
    }
}
