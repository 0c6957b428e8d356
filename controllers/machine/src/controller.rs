//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the Kubernetes
//! client, the host store, and the machine lifecycle together and runs the
//! machine watcher.

use crate::error::ControllerError;
use crate::lifecycle::Lifecycle;
use crate::reconciler::MachineReconciler;
use crate::watcher;
use host_inventory::KubeHostStore;
use kube::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

/// Main controller for machine-to-host binding.
pub struct Controller {
    machine_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance.
    pub async fn new(
        namespace: Option<String>,
        requeue_after: Duration,
    ) -> Result<Self, ControllerError> {
        info!("Initializing Machine Controller");

        // Create Kubernetes client
        let client = Client::try_default().await.map_err(ControllerError::Kube)?;

        // Host inventory access goes through the store trait so the
        // allocation logic stays testable against a mock
        let store = Arc::new(KubeHostStore::new(client.clone()));

        let lifecycle = Lifecycle::new(store, requeue_after);
        let reconciler = Arc::new(MachineReconciler::new(client.clone(), lifecycle));

        // Start the watcher in a background task
        let machine_watcher = tokio::spawn(async move {
            watcher::watch_machines(client, reconciler, namespace.as_deref()).await
        });

        Ok(Self { machine_watcher })
    }

    /// Runs the controller until shutdown.
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("Machine Controller running");

        self.machine_watcher
            .await
            .map_err(|e| ControllerError::Watch(format!("Machine watcher panicked: {e}")))??;

        Ok(())
    }
}
