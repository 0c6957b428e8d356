//! Machine Controller
//!
//! Binds BareMetalMachine workload descriptors to BareMetalHost inventory
//! records: finds an available host matching the machine's selector, claims
//! it, writes the provisioning payload, and walks the host back through
//! deprovisioning when the machine is deleted.

mod allocator;
mod binding;
mod controller;
mod error;
mod lifecycle;
mod reconciler;
mod selector;
mod status;
mod watcher;

#[cfg(test)]
mod test_utils;

#[cfg(test)]
mod lifecycle_test;

use crate::controller::Controller;
use crate::error::ControllerError;
use std::env;
use std::time::Duration;
use tracing::info;

/// Default delay before a "no actionable work yet" pass is retried.
const DEFAULT_REQUEUE_SECONDS: u64 = 30;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt::init();

    info!("Starting Machine Controller");

    // Load configuration from environment variables
    let namespace = env::var("WATCH_NAMESPACE").ok();
    let requeue_seconds = env::var("REQUEUE_SECONDS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_REQUEUE_SECONDS);

    info!("Configuration:");
    info!("  Namespace: {}", namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Requeue delay: {}s", requeue_seconds);

    // Initialize and run controller
    let controller = Controller::new(namespace, Duration::from_secs(requeue_seconds)).await?;
    controller.run().await?;

    Ok(())
}
