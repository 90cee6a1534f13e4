//! The dispatch service: ties the tool registry, the container runtime, the
//! plan generator and the executor together behind the operations the
//! transports expose.

use std::sync::Arc;

use tracing::{info, warn};

use crate::core::PlanExecutor;
use crate::envelope::{RpcResponse, ToolCallArgs};
use crate::llm::{LlmError, PlanGenerator};
use crate::prompts::{self, GetPromptArgs, GetPromptResult, PromptDescriptor, PromptError};
use crate::tools::{ToolDescriptor, ToolRegistry};

#[derive(Clone)]
pub struct Orchestrator {
    executor: PlanExecutor,
    planner: Option<Arc<dyn PlanGenerator>>,
}

impl Orchestrator {
    /// `planner` is `None` when plan generation is disabled.
    pub fn new(executor: PlanExecutor, planner: Option<Arc<dyn PlanGenerator>>) -> Self {
        Self { executor, planner }
    }

    pub fn executor(&self) -> &PlanExecutor {
        &self.executor
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        self.executor.registry()
    }

    pub fn has_planner(&self) -> bool {
        self.planner.is_some()
    }

    /// Live tool catalogue, sorted by name.
    pub fn tools(&self) -> Vec<ToolDescriptor> {
        self.registry().descriptors()
    }

    /// Ask the language model for a plan covering `instruction`.
    pub async fn generate_plan(&self, instruction: &str) -> Result<String, LlmError> {
        let Some(planner) = &self.planner else {
            warn!("Plan requested but no language model is configured");
            return Err(LlmError::Disabled);
        };

        info!(instruction, "Generating plan");
        planner.generate_plan(instruction, &self.tools()).await
    }

    pub async fn execute_plan(&self, plan: &str) -> RpcResponse {
        RpcResponse::from_result(self.executor.execute_plan(plan).await)
    }

    pub async fn call_tool(&self, args: ToolCallArgs) -> RpcResponse {
        info!(tool = %args.tool_name, "Calling tool");
        RpcResponse::from_result(
            self.executor
                .call_tool(&args.tool_name, args.parameters)
                .await,
        )
    }

    pub fn list_prompts(&self) -> Vec<PromptDescriptor> {
        prompts::list_prompts()
    }

    pub async fn get_prompt(&self, args: &GetPromptArgs) -> Result<GetPromptResult, PromptError> {
        prompts::get_prompt(self.executor.runtime().as_ref(), &args.name, &args.arguments).await
    }
}
