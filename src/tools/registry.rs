//! Tool registry mapping action names to handlers.
//!
//! Provides a `ToolHandler` trait for implementing tools and a `ToolRegistry`
//! that is populated once at startup and shared read-only afterwards.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use rmcp::model::{JsonObject, Tool as McpTool};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::ExecutionContext;
use crate::error::ToolError;
use crate::runtime::ContainerRuntime;
use crate::types::ToolName;

/// Boxed future returned by [`ToolHandler::execute`].
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ToolError>> + Send + 'a>>;

/// Trait for handling one kind of action.
///
/// Handlers validate their own parameters, then perform one side-effecting
/// runtime operation under the supplied context.
pub trait ToolHandler: Send + Sync {
    fn execute<'a>(
        &'a self,
        ctx: &'a ExecutionContext,
        runtime: &'a dyn ContainerRuntime,
        params: &'a JsonObject,
    ) -> ToolFuture<'a>;
}

/// Registry entry: metadata plus the handler.
#[derive(Clone)]
pub struct RegisteredTool {
    pub name: ToolName,
    pub description: String,
    /// Accepted parameter shape, published to callers and the language model.
    /// Not enforced at dispatch time; handlers validate for themselves.
    pub input_schema: JsonObject,
    pub handler: Arc<dyn ToolHandler>,
}

impl RegisteredTool {
    pub fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }

    /// Converts this entry to an `McpTool` for MCP `list_tools`.
    pub fn to_mcp_tool(&self) -> McpTool {
        McpTool::new(
            self.name.to_string(),
            self.description.clone(),
            Arc::new(self.input_schema.clone()),
        )
    }
}

/// Serializable view of a registered tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: ToolName,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: JsonObject,
}

/// Registry of tools keyed by name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<ToolName, RegisteredTool>,
}

impl ToolRegistry {
    /// Create a new empty tool registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A second registration under the same name replaces
    /// the first.
    pub fn register<H: ToolHandler + 'static>(
        mut self,
        name: impl Into<ToolName>,
        description: impl Into<String>,
        input_schema: JsonObject,
        handler: H,
    ) -> Self {
        self.insert(RegisteredTool {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler: Arc::new(handler),
        });
        self
    }

    /// Insert an entry, returning the one it replaced.
    pub fn insert(&mut self, tool: RegisteredTool) -> Option<RegisteredTool> {
        let replaced = self.tools.insert(tool.name.clone(), tool);
        if let Some(previous) = &replaced {
            debug!(tool = %previous.name, "Replacing previously registered tool");
        }
        replaced
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    /// Check if a tool with the given name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// List all registered tool names, sorted.
    pub fn list_names(&self) -> Vec<String> {
        self.tools.keys().map(|k| k.to_string()).collect()
    }

    /// Descriptors of every tool, sorted by name.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.values().map(RegisteredTool::descriptor).collect()
    }

    /// Get all registered tools as `McpTool` instances.
    pub fn list_tools(&self) -> Vec<McpTool> {
        self.tools.values().map(RegisteredTool::to_mcp_tool).collect()
    }

    /// Return the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Return `true` if no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
