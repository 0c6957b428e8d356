//! The host store trait.

use crate::error::StoreError;
use crds::BareMetalHost;

/// Read/update access to the host inventory.
///
/// A "not found" lookup is a valid, non-error outcome (`Ok(None)`), distinct
/// from a transport failure. Updates are optimistic: the store rejects an
/// update with [`StoreError::Conflict`] if the record changed since it was
/// read, which is the only concurrency-safety mechanism the controller
/// relies on when many machines race to claim from the same pool.
///
/// All async methods must be `Send` to work with Tokio's work-stealing
/// runtime.
#[async_trait::async_trait]
pub trait HostStore: Send + Sync {
    /// Lists all hosts in a namespace.
    async fn list_hosts(&self, namespace: &str) -> Result<Vec<BareMetalHost>, StoreError>;

    /// Fetches a single host; `Ok(None)` if it does not exist.
    async fn get_host(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BareMetalHost>, StoreError>;

    /// Persists an updated host record via a single optimistic update.
    async fn update_host(&self, host: &BareMetalHost) -> Result<BareMetalHost, StoreError>;
}
