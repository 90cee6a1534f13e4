//! Plan execution engine.
//!
//! Runs a plan's actions strictly in order under one shared deadline and
//! stops at the first failure. Actions that already ran are not undone;
//! tools are expected to be additive.

use std::sync::Arc;
use std::time::Duration;

use rmcp::model::JsonObject;
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::context::{DEFAULT_PLAN_TIMEOUT, ExecutionContext};
use super::plan::{Action, Plan};
use crate::error::PlanError;
use crate::runtime::ContainerRuntime;
use crate::tools::{RegisteredTool, ToolRegistry};

/// Resolves actions against a registry and drives their handlers.
#[derive(Clone)]
pub struct PlanExecutor {
    registry: Arc<ToolRegistry>,
    runtime: Arc<dyn ContainerRuntime>,
    plan_timeout: Duration,
}

impl PlanExecutor {
    pub fn new(registry: Arc<ToolRegistry>, runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self {
            registry,
            runtime,
            plan_timeout: DEFAULT_PLAN_TIMEOUT,
        }
    }

    /// Deadline applied to a whole plan (or a single direct tool call).
    pub fn with_plan_timeout(mut self, timeout: Duration) -> Self {
        self.plan_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn runtime(&self) -> &Arc<dyn ContainerRuntime> {
        &self.runtime
    }

    pub fn plan_timeout(&self) -> Duration {
        self.plan_timeout
    }

    /// A fresh context bounded by the configured plan timeout.
    pub fn new_context(&self) -> ExecutionContext {
        ExecutionContext::with_timeout(self.plan_timeout)
    }

    /// Parse and run plan text.
    pub async fn execute_plan(&self, input: &str) -> Result<Value, PlanError> {
        let plan = Plan::parse(input).inspect_err(|e| {
            warn!(error = %e, "Rejected plan");
        })?;
        self.run_plan(&self.new_context(), &plan).await
    }

    /// Run an already parsed plan under a caller-supplied context.
    pub async fn run_plan(&self, ctx: &ExecutionContext, plan: &Plan) -> Result<Value, PlanError> {
        let plan_id = Uuid::new_v4();
        info!(%plan_id, actions = plan.len(), "Executing plan");

        for (index, action) in plan.actions().enumerate() {
            let action = action.inspect_err(|e| {
                warn!(%plan_id, index, error = %e, "Plan halted");
            })?;

            debug!(%plan_id, index, action = %action.name, "Processing action");
            self.dispatch(ctx, &action).await.inspect_err(|e| {
                warn!(%plan_id, index, action = %action.name, error = %e, "Plan halted");
            })?;
        }

        info!(%plan_id, actions = plan.len(), "Plan executed successfully");
        Ok(json!({
            "status": "success",
            "message": "Plan executed successfully",
        }))
    }

    /// Invoke one named tool outside any plan.
    pub async fn call_tool(&self, name: &str, parameters: JsonObject) -> Result<Value, PlanError> {
        self.call_tool_with(&self.new_context(), name, parameters).await
    }

    pub async fn call_tool_with(
        &self,
        ctx: &ExecutionContext,
        name: &str,
        parameters: JsonObject,
    ) -> Result<Value, PlanError> {
        let action = Action::new(name, parameters);
        match self.dispatch(ctx, &action).await {
            Ok(()) => {
                info!(tool = %name, "Tool executed successfully");
                Ok(json!({
                    "status": "success",
                    "message": format!("Tool {} executed successfully", name),
                }))
            }
            Err(e) => {
                warn!(tool = %name, error = %e, "Tool call failed");
                Err(e)
            }
        }
    }

    fn resolve(&self, name: &str) -> Result<&RegisteredTool, PlanError> {
        self.registry
            .get(name)
            .ok_or_else(|| PlanError::UnknownTool(name.to_string()))
    }

    async fn dispatch(&self, ctx: &ExecutionContext, action: &Action) -> Result<(), PlanError> {
        let name = action.name.as_str();
        let tool = self.resolve(name)?;

        // A deadline spent by an earlier action fails this one before it starts.
        ctx.check()
            .map_err(|e| PlanError::from_tool_error(name, e.into()))?;

        tool.handler
            .execute(ctx, self.runtime.as_ref(), &action.parameters)
            .await
            .map_err(|e| PlanError::from_tool_error(name, e))
    }
}
