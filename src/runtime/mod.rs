//! Container runtime capability.
//!
//! Tool handlers never talk to a container engine directly; they go through
//! [`ContainerRuntime`]. Two implementations ship with the crate:
//! [`DockerEngine`] for a real daemon and [`DryRunRuntime`] which simulates
//! one in memory.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::types::ImageRef;

mod docker;
mod dry_run;
#[cfg(test)]
pub(crate) mod testing;

pub use docker::{DEFAULT_API_VERSION, DEFAULT_DOCKER_HOST, DockerEngine};
pub use dry_run::DryRunRuntime;

/// Label key used to group resources into a compose-style project.
pub const PROJECT_LABEL_KEY: &str = "mcp-server-docker.project";

/// Errors surfaced by a container runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// The referenced object does not exist.
    NotFound(String),
    /// The object already exists or is in a conflicting state.
    Conflict(String),
    /// Any other error reply from the engine.
    Api { status: u16, message: String },
    /// The engine could not be reached or replied with garbage.
    Transport(String),
    /// A streamed operation reported an error mid-stream.
    Stream(String),
    /// The execution deadline elapsed before the operation completed.
    DeadlineExceeded,
    /// The execution was cancelled by the caller.
    Cancelled,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::NotFound(msg) => write!(f, "{}", msg),
            RuntimeError::Conflict(msg) => write!(f, "{}", msg),
            RuntimeError::Api { status, message } => {
                write!(f, "engine returned {}: {}", status, message)
            }
            RuntimeError::Transport(msg) => write!(f, "engine unreachable: {}", msg),
            RuntimeError::Stream(msg) => write!(f, "{}", msg),
            RuntimeError::DeadlineExceeded => write!(f, "context deadline exceeded"),
            RuntimeError::Cancelled => write!(f, "context canceled"),
        }
    }
}

impl std::error::Error for RuntimeError {}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Everything needed to create one container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    /// `KEY=VALUE` entries.
    #[serde(default)]
    pub env: Vec<String>,
    /// Bind mounts in `source:target[:mode]` form.
    #[serde(default)]
    pub binds: Vec<String>,
    /// Networks to attach at creation time.
    #[serde(default)]
    pub networks: Vec<String>,
}

/// Result of inspecting a container.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerState {
    pub id: String,
    pub running: bool,
}

/// A container as reported by a label-filtered listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerSummary {
    pub id: String,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub image: String,
    #[serde(default, rename = "ImageID")]
    pub image_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub ports: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeSummary {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkSummary {
    pub name: String,
    #[serde(default)]
    pub id: String,
    /// Ids of attached containers.
    #[serde(default, skip_deserializing)]
    pub containers: Vec<String>,
}

/// Operations the tool handlers and prompt builder need from a container
/// engine. Implementations must be safe to call from concurrent requests.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn create_network(&self, name: &str) -> RuntimeResult<()>;

    async fn create_volume(&self, name: &str) -> RuntimeResult<()>;

    /// Create a container and return its id.
    async fn create_container(&self, spec: &ContainerSpec) -> RuntimeResult<String>;

    async fn inspect_container(&self, name: &str) -> RuntimeResult<ContainerState>;

    async fn start_container(&self, id: &str) -> RuntimeResult<()>;

    /// Pull an image, returning only once the pull has completed.
    async fn pull_image(&self, image: &ImageRef) -> RuntimeResult<()>;

    async fn list_containers(&self, label: &str) -> RuntimeResult<Vec<ContainerSummary>>;

    async fn list_volumes(&self, label: &str) -> RuntimeResult<Vec<VolumeSummary>>;

    async fn list_networks(&self, label: &str) -> RuntimeResult<Vec<NetworkSummary>>;
}
