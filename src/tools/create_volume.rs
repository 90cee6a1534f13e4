//! Handler for the `create_volume` action.

use rmcp::model::JsonObject;
use serde_json::json;

use crate::core::ExecutionContext;
use crate::error::ToolError;
use crate::runtime::ContainerRuntime;
use crate::tools::params::required_str;
use crate::tools::{ToolFuture, ToolHandler};

pub struct CreateVolumeHandler;

impl CreateVolumeHandler {
    pub const NAME: &'static str = "create_volume";
    pub const DESCRIPTION: &'static str = "Create a Docker volume";

    pub fn input_schema() -> JsonObject {
        let mut schema = JsonObject::new();
        schema.insert("type".to_string(), json!("object"));

        let mut properties = serde_json::Map::new();
        properties.insert(
            "name".to_string(),
            json!({
                "type": "string",
                "description": "Name of the volume"
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
        ctx.run(runtime.create_volume(name)).await?;
        Ok(())
    }
}

impl ToolHandler for CreateVolumeHandler {
    fn execute<'a>(
        &'a self,
        ctx: &'a ExecutionContext,
        runtime: &'a dyn ContainerRuntime,
        params: &'a JsonObject,
    ) -> ToolFuture<'a> {
        Box::pin(self.run(ctx, runtime, params))
    }
}
