//! In-memory runtime that simulates a Docker daemon.
//!
//! Used for `--dry-run` serving: plans are validated end-to-end, including
//! dependency order (a container can only join networks that exist), without
//! touching a real engine.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use super::{
    ContainerRuntime, ContainerSpec, ContainerState, ContainerSummary, NetworkSummary,
    RuntimeError, RuntimeResult, VolumeSummary,
};
use crate::types::ImageRef;

#[derive(Debug, Clone)]
struct SimulatedContainer {
    id: String,
    spec: ContainerSpec,
    running: bool,
}

#[derive(Debug, Default)]
struct State {
    networks: BTreeMap<String, String>,
    volumes: BTreeSet<String>,
    images: BTreeSet<String>,
    containers: BTreeMap<String, SimulatedContainer>,
}

/// Simulated engine. Label filters are ignored; every resource created
/// through this runtime belongs to every project.
#[derive(Debug, Default)]
pub struct DryRunRuntime {
    state: Mutex<State>,
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

impl DryRunRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Images pulled so far, in sorted order.
    pub async fn images(&self) -> Vec<String> {
        self.state.lock().await.images.iter().cloned().collect()
    }
}

#[async_trait]
impl ContainerRuntime for DryRunRuntime {
    async fn create_network(&self, name: &str) -> RuntimeResult<()> {
        let mut state = self.state.lock().await;
        if state.networks.contains_key(name) {
            return Err(RuntimeError::Conflict(format!(
                "network with name {} already exists",
                name
            )));
        }
        state.networks.insert(name.to_string(), short_id());
        info!(network = %name, "[dry-run] created network");
        Ok(())
    }

    async fn create_volume(&self, name: &str) -> RuntimeResult<()> {
        // Docker treats re-creating a volume with the same name as a no-op.
        self.state.lock().await.volumes.insert(name.to_string());
        info!(volume = %name, "[dry-run] created volume");
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> RuntimeResult<String> {
        let mut state = self.state.lock().await;
        if state.containers.contains_key(&spec.name) {
            return Err(RuntimeError::Conflict(format!(
                "Conflict. The container name \"/{}\" is already in use",
                spec.name
            )));
        }
        if let Some(missing) = spec
            .networks
            .iter()
            .find(|n| !state.networks.contains_key(n.as_str()))
        {
            return Err(RuntimeError::NotFound(format!("network {} not found", missing)));
        }

        let id = short_id();
        state.containers.insert(
            spec.name.clone(),
            SimulatedContainer {
                id: id.clone(),
                spec: spec.clone(),
                running: false,
            },
        );
        info!(container = %spec.name, image = %spec.image, "[dry-run] created container");
        Ok(id)
    }

    async fn inspect_container(&self, name: &str) -> RuntimeResult<ContainerState> {
        let state = self.state.lock().await;
        state
            .containers
            .values()
            .find(|c| c.spec.name == name || c.id == name)
            .map(|c| ContainerState {
                id: c.id.clone(),
                running: c.running,
            })
            .ok_or_else(|| RuntimeError::NotFound(format!("No such container: {}", name)))
    }

    async fn start_container(&self, id: &str) -> RuntimeResult<()> {
        let mut state = self.state.lock().await;
        let container = state
            .containers
            .values_mut()
            .find(|c| c.id == id || c.spec.name == id)
            .ok_or_else(|| RuntimeError::NotFound(format!("No such container: {}", id)))?;
        container.running = true;
        info!(container = %container.spec.name, "[dry-run] started container");
        Ok(())
    }

    async fn pull_image(&self, image: &ImageRef) -> RuntimeResult<()> {
        self.state.lock().await.images.insert(image.to_string());
        info!(image = %image, "[dry-run] pulled image");
        Ok(())
    }

    async fn list_containers(&self, _label: &str) -> RuntimeResult<Vec<ContainerSummary>> {
        let state = self.state.lock().await;
        Ok(state
            .containers
            .values()
            .map(|c| ContainerSummary {
                id: c.id.clone(),
                names: vec![format!("/{}", c.spec.name)],
                image: c.spec.image.clone(),
                image_id: String::new(),
                status: if c.running { "Up".into() } else { "Created".into() },
                ports: Vec::new(),
            })
            .collect())
    }

    async fn list_volumes(&self, _label: &str) -> RuntimeResult<Vec<VolumeSummary>> {
        let state = self.state.lock().await;
        Ok(state
            .volumes
            .iter()
            .map(|name| VolumeSummary { name: name.clone() })
            .collect())
    }

    async fn list_networks(&self, _label: &str) -> RuntimeResult<Vec<NetworkSummary>> {
        let state = self.state.lock().await;
        Ok(state
            .networks
            .iter()
            .map(|(name, id)| NetworkSummary {
                name: name.clone(),
                id: id.clone(),
                containers: state
                    .containers
                    .values()
                    .filter(|c| c.spec.networks.iter().any(|n| n == name))
                    .map(|c| c.id.clone())
                    .collect(),
            })
            .collect())
    }
}
