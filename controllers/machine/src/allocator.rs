//! Host allocation for machines.
//!
//! `choose_host` scans the machine's namespace for a claimable host. A host
//! whose consumer reference already points at this machine wins immediately,
//! regardless of availability or selector match — a crash or retry after a
//! partial claim must converge on the same host, not re-randomize. Among
//! fresh candidates the tie-break is uniformly random to avoid deterministic
//! hot-spotting when many machines race to claim from one pool.

use crate::binding::{consumer_ref_matches, machine_name, machine_namespace};
use crate::error::ControllerError;
use crate::selector;
use crds::{BareMetalHost, BareMetalMachine, HOST_ANNOTATION};
use host_inventory::{HostStore, parse_host_key};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info};

/// Chooses and re-discovers hosts for machines.
pub struct Allocator {
    store: Arc<dyn HostStore>,
    // Injected so tests can seed it; production seeds from OS entropy
    rng: Mutex<StdRng>,
}

impl std::fmt::Debug for Allocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Allocator").finish_non_exhaustive()
    }
}

impl Allocator {
    /// Creates an allocator with an OS-seeded random source.
    pub fn new(store: Arc<dyn HostStore>) -> Self {
        Self::with_rng(store, StdRng::from_os_rng())
    }

    /// Creates an allocator with a caller-provided random source.
    pub fn with_rng(store: Arc<dyn HostStore>, rng: StdRng) -> Self {
        Self {
            store,
            rng: Mutex::new(rng),
        }
    }

    /// Resolves the machine's binding annotation to a host.
    ///
    /// Returns `Ok(None)` when the annotation is absent or the referenced
    /// host no longer exists — a machine with no binding is a normal state.
    /// A malformed annotation value is a parse error, not an empty result.
    pub async fn bound_host(
        &self,
        machine: &BareMetalMachine,
    ) -> Result<Option<BareMetalHost>, ControllerError> {
        let Some(annotations) = &machine.metadata.annotations else {
            return Ok(None);
        };
        let Some(host_key) = annotations.get(HOST_ANNOTATION) else {
            return Ok(None);
        };
        let (namespace, name) = parse_host_key(host_key).inspect_err(|e| {
            error!("Error parsing annotation value {:?}: {}", host_key, e);
        })?;

        match self.store.get_host(&namespace, &name).await? {
            Some(host) => Ok(Some(host)),
            None => {
                info!("Annotated host {} not found", host_key);
                Ok(None)
            }
        }
    }

    /// Iterates through known hosts and returns one that can be associated
    /// with the machine. All hosts are searched in case one already carries
    /// an association with this machine.
    pub async fn choose_host(
        &self,
        machine: &BareMetalMachine,
    ) -> Result<Option<BareMetalHost>, ControllerError> {
        let name = machine_name(machine)?;
        let namespace = machine_namespace(machine);

        let hosts = self.store.list_hosts(namespace).await?;
        let requirements = selector::build_requirements(&machine.spec.host_selector)
            .inspect_err(|e| error!("Failed to build selector requirement, not choosing host: {}", e))?;

        let mut available = Vec::new();
        for host in hosts {
            let host_name = host.metadata.name.clone().unwrap_or_default();
            if host.is_available() {
                let labels = host.metadata.labels.clone().unwrap_or_default();
                if selector::matches(&requirements, &labels) {
                    debug!("Host '{}' matched hostSelector for machine '{}'", host_name, name);
                    available.push(host);
                } else {
                    debug!(
                        "Host '{}' did not match hostSelector for machine '{}'",
                        host_name, name
                    );
                }
            } else if host
                .spec
                .consumer_ref
                .as_ref()
                .is_some_and(|consumer| consumer_ref_matches(consumer, machine))
            {
                info!("Found host {} with existing consumer ref", host_name);
                return Ok(Some(host));
            }
        }

        info!(
            "{} hosts available while choosing host for machine '{}'",
            available.len(),
            name
        );
        if available.is_empty() {
            return Ok(None);
        }

        // choose a host at random from available hosts
        let index = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .random_range(0..available.len());
        Ok(Some(available.swap_remove(index)))
    }
}
