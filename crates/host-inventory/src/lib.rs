//! Host inventory store abstraction
//!
//! The machine controller never talks to the Kubernetes API for hosts
//! directly; it goes through the [`HostStore`] trait so the allocation and
//! binding logic can be unit tested against an in-memory mock. The concrete
//! [`KubeHostStore`] is a thin adapter over `kube::Api<BareMetalHost>` that
//! preserves the store's optimistic-concurrency semantics: an update of a
//! record that changed since it was read fails with a conflict.

mod error;
mod key;
mod kube_store;
mod mock;
mod store;

pub use error::StoreError;
pub use key::{host_key, host_key_for, parse_host_key};
pub use kube_store::KubeHostStore;
pub use mock::MockHostStore;
pub use store::HostStore;
