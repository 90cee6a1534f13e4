//! Handler for the `run_container` action.

use rmcp::model::JsonObject;
use serde_json::json;
use tracing::debug;

use crate::core::ExecutionContext;
use crate::error::ToolError;
use crate::runtime::ContainerRuntime;
use crate::tools::params::required_str;
use crate::tools::{ToolFuture, ToolHandler};

/// Starts an existing container unless it is already running.
pub struct RunContainerHandler;

impl RunContainerHandler {
    pub const NAME: &'static str = "run_container";
    pub const DESCRIPTION: &'static str = "Run (start) a Docker container";

    pub fn input_schema() -> JsonObject {
        let mut schema = JsonObject::new();
        schema.insert("type".to_string(), json!("object"));

        let mut properties = serde_json::Map::new();
        properties.insert(
            "name".to_string(),
            json!({
                "type": "string",
                "description": "Name of the container"
            }),
        );

        schema.insert("properties".to_string(), json!(properties));
        schema.insert("required".to_string(), json!(["name"]));
        schema
    }

    async fn run(
        &self,
        ctx: &ExecutionContext,
        runtime: &dyn ContainerRuntime,
        params: &JsonObject,
    ) -> Result<(), ToolError> {
        let name = required_str(params, "name")?;

        let state = ctx.run(runtime.inspect_container(name)).await?;
        if state.running {
            debug!(container = %name, "Container already running, skipping start");
            return Ok(());
        }

        ctx.run(runtime.start_container(&state.id)).await?;
        Ok(())
    }
}

impl ToolHandler for RunContainerHandler {
    fn execute<'a>(
        &'a self,
        ctx: &'a ExecutionContext,
        runtime: &'a dyn ContainerRuntime,
        params: &'a JsonObject,
    ) -> ToolFuture<'a> {
        Box::pin(self.run(ctx, runtime, params))
    }
}
