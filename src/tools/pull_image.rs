//! Handler for the `pull_image` action.

use std::time::Duration;

use rmcp::model::JsonObject;
use serde_json::json;

use crate::core::ExecutionContext;
use crate::error::ToolError;
use crate::runtime::ContainerRuntime;
use crate::tools::params::optional_str;
use crate::tools::{ToolFuture, ToolHandler};
use crate::types::ImageRef;

/// Pulls are slow, so they run under their own deadline instead of the
/// plan's.
pub const DEFAULT_PULL_TIMEOUT: Duration = Duration::from_secs(120);

pub struct PullImageHandler {
    timeout: Duration,
}

impl Default for PullImageHandler {
    fn default() -> Self {
        Self::new(DEFAULT_PULL_TIMEOUT)
    }
}

impl PullImageHandler {
    pub const NAME: &'static str = "pull_image";
    pub const DESCRIPTION: &'static str = "Pull a Docker image";

    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn input_schema() -> JsonObject {
        let mut schema = JsonObject::new();
        schema.insert("type".to_string(), json!("object"));

        let mut properties = serde_json::Map::new();
        properties.insert(
            "image".to_string(),
            json!({
                "type": "string",
                "description": "Full image reference to pull (e.g. `nginx:latest`)"
            }),
        );
        properties.insert(
            "name".to_string(),
            json!({
                "type": "string",
                "description": "Image repository, used when `image` is not given"
            }),
        );
        properties.insert(
            "tag".to_string(),
            json!({
                "type": "string",
                "description": "Image tag to combine with `name` (defaults to `latest`)"
            }),
        );

        schema.insert("properties".to_string(), json!(properties));
        schema.insert(
            "anyOf".to_string(),
            json!([{ "required": ["image"] }, { "required": ["name"] }]),
        );
        schema
    }

    /// `image` wins; otherwise `name` plus `tag` (default `latest`).
    pub fn resolve_image(params: &JsonObject) -> Result<ImageRef, ToolError> {
        if let Some(image) = optional_str(params, "image")? {
            return Ok(ImageRef::new(image));
        }

        let name = optional_str(params, "name")?.ok_or_else(|| {
            ToolError::InvalidParameters("missing image name for pull_image".to_string())
        })?;
        let tag = optional_str(params, "tag")?;
        Ok(ImageRef::from_parts(name, tag))
    }

    async fn run(
        &self,
        ctx: &ExecutionContext,
        runtime: &dyn ContainerRuntime,
        params: &JsonObject,
    ) -> Result<(), ToolError> {
        let image = Self::resolve_image(params)?;
        let pull_ctx = ctx.with_deadline_override(self.timeout);
        pull_ctx.run(runtime.pull_image(&image)).await?;
        Ok(())
    }
}

impl ToolHandler for PullImageHandler {
    fn execute<'a>(
        &'a self,
        ctx: &'a ExecutionContext,
        runtime: &'a dyn ContainerRuntime,
        params: &'a JsonObject,
    ) -> ToolFuture<'a> {
        Box::pin(self.run(ctx, runtime, params))
    }
}
