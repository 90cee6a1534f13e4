//! Handler for the `create_container` action.

use rmcp::model::JsonObject;
use serde_json::json;

use crate::core::ExecutionContext;
use crate::error::ToolError;
use crate::runtime::{ContainerRuntime, ContainerSpec};
use crate::tools::params::{env_entries, required_str, string_list};
use crate::tools::{ToolFuture, ToolHandler};

/// Creates (but does not start) a container.
pub struct CreateContainerHandler;

impl CreateContainerHandler {
    pub const NAME: &'static str = "create_container";
    pub const DESCRIPTION: &'static str = "Create a Docker container";

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
        properties.insert(
            "image".to_string(),
            json!({
                "type": "string",
                "description": "Docker image to use"
            }),
        );
        properties.insert(
            "environment".to_string(),
            json!({
                "type": "object",
                "description": "Environment variables for the container",
                "additionalProperties": { "type": "string" }
            }),
        );
        properties.insert(
            "volumes".to_string(),
            json!({
                "type": "array",
                "description": "Bind mounts in `source:target[:mode]` form",
                "items": { "type": "string" }
            }),
        );
        properties.insert(
            "networks".to_string(),
            json!({
                "type": "array",
                "description": "Networks to attach the container to",
                "items": { "type": "string" }
            }),
        );

        schema.insert("properties".to_string(), json!(properties));
        schema.insert("required".to_string(), json!(["name", "image"]));
        schema
    }

    /// Validate the parameter bag into a container spec.
    pub fn spec_from_params(params: &JsonObject) -> Result<ContainerSpec, ToolError> {
        Ok(ContainerSpec {
            name: required_str(params, "name")?.to_string(),
            image: required_str(params, "image")?.to_string(),
            env: env_entries(params, "environment")?,
            binds: string_list(params, "volumes")?,
            networks: string_list(params, "networks")?,
        })
    }

    async fn run(
        &self,
        ctx: &ExecutionContext,
        runtime: &dyn ContainerRuntime,
        params: &JsonObject,
    ) -> Result<(), ToolError> {
        let spec = Self::spec_from_params(params)?;
        ctx.run(runtime.create_container(&spec)).await?;
        Ok(())
    }
}

impl ToolHandler for CreateContainerHandler {
    fn execute<'a>(
        &'a self,
        ctx: &'a ExecutionContext,
        runtime: &'a dyn ContainerRuntime,
        params: &'a JsonObject,
    ) -> ToolFuture<'a> {
        Box::pin(self.run(ctx, runtime, params))
    }
}
