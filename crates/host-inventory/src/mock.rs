//! Mock host store for unit testing
//!
//! This module provides an in-memory implementation of [`HostStore`] that
//! can be used in unit tests without requiring a running cluster. It
//! emulates the API server's optimistic concurrency: records carry a
//! resourceVersion, and an update whose resourceVersion does not match the
//! stored record fails with a conflict.

use crate::error::StoreError;
use crate::store::HostStore;
use crds::BareMetalHost;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory host store for testing.
#[derive(Clone, Default)]
pub struct MockHostStore {
    // In-memory storage keyed by (namespace, name)
    hosts: Arc<Mutex<HashMap<(String, String), BareMetalHost>>>,
    // Counter for generating resource versions
    next_revision: Arc<Mutex<u64>>,
    // Number of update_host calls observed (for no-mutation assertions)
    update_calls: Arc<Mutex<usize>>,
    // When set, the next update fails with a conflict regardless of version
    conflict_on_next_update: Arc<Mutex<bool>>,
}

impl std::fmt::Debug for MockHostStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockHostStore").finish_non_exhaustive()
    }
}

impl MockHostStore {
    /// Create a new empty mock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a host to the mock store, stamping a fresh resource version
    /// (for test setup).
    pub fn add_host(&self, mut host: BareMetalHost) {
        let namespace = host.metadata.namespace.clone().unwrap_or_default();
        let name = host.metadata.name.clone().unwrap_or_default();
        host.metadata.resource_version = Some(self.bump_revision());
        self.hosts.lock().unwrap().insert((namespace, name), host);
    }

    /// Fetch a host directly, bypassing the trait (for test assertions).
    pub fn stored_host(&self, namespace: &str, name: &str) -> Option<BareMetalHost> {
        self.hosts
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Number of update calls seen so far (for no-mutation assertions).
    pub fn update_calls(&self) -> usize {
        *self.update_calls.lock().unwrap()
    }

    /// Force the next update to fail with a conflict.
    pub fn conflict_on_next_update(&self) {
        *self.conflict_on_next_update.lock().unwrap() = true;
    }

    fn bump_revision(&self) -> String {
        let mut next = self.next_revision.lock().unwrap();
        *next += 1;
        next.to_string()
    }
}

#[async_trait::async_trait]
impl HostStore for MockHostStore {
    async fn list_hosts(&self, namespace: &str) -> Result<Vec<BareMetalHost>, StoreError> {
        let hosts = self.hosts.lock().unwrap();
        let mut items: Vec<BareMetalHost> = hosts
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|(_, host)| host.clone())
            .collect();
        // Stable order so tests do not depend on map iteration
        items.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        Ok(items)
    }

    async fn get_host(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BareMetalHost>, StoreError> {
        Ok(self
            .hosts
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn update_host(&self, host: &BareMetalHost) -> Result<BareMetalHost, StoreError> {
        *self.update_calls.lock().unwrap() += 1;

        let namespace = host.metadata.namespace.clone().unwrap_or_default();
        let name = host.metadata.name.clone().unwrap_or_default();
        let key = (namespace.clone(), name.clone());

        if std::mem::take(&mut *self.conflict_on_next_update.lock().unwrap()) {
            return Err(StoreError::Conflict(format!("{namespace}/{name}")));
        }

        let mut hosts = self.hosts.lock().unwrap();
        let stored = hosts
            .get(&key)
            .ok_or_else(|| StoreError::NotFound(format!("{namespace}/{name}")))?;

        if stored.metadata.resource_version != host.metadata.resource_version {
            return Err(StoreError::Conflict(format!("{namespace}/{name}")));
        }

        let mut updated = host.clone();
        updated.metadata.resource_version = Some({
            let mut next = self.next_revision.lock().unwrap();
            *next += 1;
            next.to_string()
        });
        hosts.insert(key, updated.clone());
        Ok(updated)
    }
}
