//! Recording runtime for unit and scenario tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{
    ContainerRuntime, ContainerSpec, ContainerState, ContainerSummary, NetworkSummary,
    RuntimeError, RuntimeResult, VolumeSummary,
};
use crate::types::ImageRef;

/// Records every call as `"op:target"` and can be told to fail or stall
/// on a specific call.
#[derive(Default)]
pub(crate) struct RecordingRuntime {
    calls: Mutex<Vec<String>>,
    fail_on: Option<(String, RuntimeError)>,
    delay_on: Option<(String, Duration)>,
    running: Vec<String>,
    pub(crate) containers: Vec<ContainerSummary>,
    pub(crate) volumes: Vec<VolumeSummary>,
    pub(crate) networks: Vec<NetworkSummary>,
}

impl RecordingRuntime {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fail the call whose record equals `call` (e.g. `"create_network:net1"`).
    pub(crate) fn failing_on(mut self, call: &str, err: RuntimeError) -> Self {
        self.fail_on = Some((call.to_string(), err));
        self
    }

    /// Sleep for `delay` before completing the call recorded as `call`.
    pub(crate) fn delaying(mut self, call: &str, delay: Duration) -> Self {
        self.delay_on = Some((call.to_string(), delay));
        self
    }

    /// Report the named container as already running on inspect.
    pub(crate) fn with_running(mut self, name: &str) -> Self {
        self.running.push(name.to_string());
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    async fn record(&self, op: &str, target: &str) -> RuntimeResult<()> {
        let call = format!("{}:{}", op, target);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call.clone());
        }
        if let Some((delayed, delay)) = &self.delay_on {
            if *delayed == call {
                tokio::time::sleep(*delay).await;
            }
        }
        match &self.fail_on {
            Some((failing, err)) if *failing == call => Err(err.clone()),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ContainerRuntime for RecordingRuntime {
    async fn create_network(&self, name: &str) -> RuntimeResult<()> {
        self.record("create_network", name).await
    }

    async fn create_volume(&self, name: &str) -> RuntimeResult<()> {
        self.record("create_volume", name).await
    }

    async fn create_container(&self, spec: &ContainerSpec) -> RuntimeResult<String> {
        self.record("create_container", &spec.name).await?;
        Ok(format!("id-{}", spec.name))
    }

    async fn inspect_container(&self, name: &str) -> RuntimeResult<ContainerState> {
        self.record("inspect_container", name).await?;
        Ok(ContainerState {
            id: format!("id-{}", name),
            running: self.running.iter().any(|r| r == name),
        })
    }

    async fn start_container(&self, id: &str) -> RuntimeResult<()> {
        self.record("start_container", id).await
    }

    async fn pull_image(&self, image: &ImageRef) -> RuntimeResult<()> {
        self.record("pull_image", image.as_str()).await
    }

    async fn list_containers(&self, label: &str) -> RuntimeResult<Vec<ContainerSummary>> {
        self.record("list_containers", label).await?;
        Ok(self.containers.clone())
    }

    async fn list_volumes(&self, label: &str) -> RuntimeResult<Vec<VolumeSummary>> {
        self.record("list_volumes", label).await?;
        Ok(self.volumes.clone())
    }

    async fn list_networks(&self, label: &str) -> RuntimeResult<Vec<NetworkSummary>> {
        self.record("list_networks", label).await?;
        Ok(self.networks.clone())
    }
}
