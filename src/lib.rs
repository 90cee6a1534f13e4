// Core modules
pub mod types;
pub mod error;
pub mod envelope;
pub mod runtime;
pub mod tools;
pub mod core;

// Collaborators and services
pub mod llm;
pub mod prompts;
mod orchestrator;
pub mod config;

// Transports
pub mod api;
pub mod server;
pub mod rpc_client;

// Re-export key types and functions
pub use config::AppConfig;
pub use crate::core::{ExecutionContext, Plan, PlanExecutor};
pub use envelope::{RpcError, RpcRequest, RpcResponse, ToolCallArgs};
pub use error::{PlanError, ToolError};
pub use orchestrator::Orchestrator;
pub use runtime::{ContainerRuntime, DockerEngine, DryRunRuntime};
pub use server::McpServer;
pub use tools::{ToolHandler, ToolRegistry, builtin_registry};

use std::sync::Arc;
use anyhow::Result;
use tracing::info;

use llm::{OpenAiPlanner, PlanGenerator};

/// How a service instance should be wired.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceOptions {
    /// Simulate the engine in memory instead of talking to Docker.
    pub dry_run: bool,
    /// Start without a language model; plan generation then fails per request.
    pub no_llm: bool,
}

/// Convenience function to create a fully configured orchestrator.
///
/// Registers the built-in tools, connects the runtime and, unless disabled,
/// the language model. A missing API key is fatal here.
pub fn create_orchestrator(config: &AppConfig, options: ServiceOptions) -> Result<Arc<Orchestrator>> {
    let runtime: Arc<dyn ContainerRuntime> = if options.dry_run {
        info!("Using in-memory dry-run runtime");
        Arc::new(DryRunRuntime::new())
    } else {
        let engine = DockerEngine::new(config.docker_host(), &config.docker.api_version)?;
        info!(host = config.docker_host(), "Using Docker engine");
        Arc::new(engine)
    };

    let planner: Option<Arc<dyn PlanGenerator>> = if options.no_llm {
        info!("Plan generation disabled");
        None
    } else {
        let api_key = config.api_key().unwrap_or_default();
        let planner = OpenAiPlanner::new(api_key, config.llm.model.clone(), &config.llm.base_url)?;
        info!(model = planner.model(), "Plan generation enabled");
        Some(Arc::new(planner))
    };

    let registry = Arc::new(builtin_registry(config.pull_timeout()));
    let executor = PlanExecutor::new(registry, runtime).with_plan_timeout(config.plan_timeout());

    Ok(Arc::new(Orchestrator::new(executor, planner)))
}
