//! Kubernetes-backed host store.

use crate::error::StoreError;
use crate::store::HostStore;
use crds::BareMetalHost;
use kube::api::{ListParams, PostParams};
use kube::{Api, Client};
use tracing::debug;

/// [`HostStore`] implementation over the Kubernetes API.
///
/// Replace-based updates carry the record's resourceVersion, so the API
/// server rejects an update of a record that changed since it was read;
/// that rejection is surfaced as [`StoreError::Conflict`].
#[derive(Clone)]
pub struct KubeHostStore {
    client: Client,
}

impl std::fmt::Debug for KubeHostStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeHostStore").finish_non_exhaustive()
    }
}

impl KubeHostStore {
    /// Creates a new store over an existing Kubernetes client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<BareMetalHost> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait::async_trait]
impl HostStore for KubeHostStore {
    async fn list_hosts(&self, namespace: &str) -> Result<Vec<BareMetalHost>, StoreError> {
        let hosts = self.api(namespace).list(&ListParams::default()).await?;
        debug!("Listed {} hosts in namespace {}", hosts.items.len(), namespace);
        Ok(hosts.items)
    }

    async fn get_host(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BareMetalHost>, StoreError> {
        Ok(self.api(namespace).get_opt(name).await?)
    }

    async fn update_host(&self, host: &BareMetalHost) -> Result<BareMetalHost, StoreError> {
        let name = host
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| StoreError::MissingMetadata("host has no name".to_string()))?;
        let namespace = host
            .metadata
            .namespace
            .as_deref()
            .ok_or_else(|| StoreError::MissingMetadata(format!("host {name} has no namespace")))?;

        match self
            .api(namespace)
            .replace(name, &PostParams::default(), host)
            .await
        {
            Ok(updated) => Ok(updated),
            Err(kube::Error::Api(ae)) if ae.code == 409 => {
                Err(StoreError::Conflict(format!("{namespace}/{name}")))
            }
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                Err(StoreError::NotFound(format!("{namespace}/{name}")))
            }
            Err(e) => Err(StoreError::Api(e)),
        }
    }
}
