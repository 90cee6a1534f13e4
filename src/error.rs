//! Error types for tool dispatch and plan execution.
//!
//! Every failure that can reach a caller carries a stable JSON-RPC code
//! (see [`crate::envelope`]) so clients branch on the code, not the text.

use std::fmt;

use crate::envelope::{EXECUTION_FAILED, INVALID_PARAMS, METHOD_NOT_FOUND, PARSE_ERROR};
use crate::runtime::RuntimeError;

/// Failure reported by a single tool handler.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolError {
    /// A required parameter is missing, empty or of the wrong primitive type.
    InvalidParameters(String),
    /// The container runtime rejected or failed the operation.
    Runtime(RuntimeError),
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolError::InvalidParameters(msg) => write!(f, "{}", msg),
            ToolError::Runtime(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ToolError {}

impl From<RuntimeError> for ToolError {
    fn from(err: RuntimeError) -> Self {
        ToolError::Runtime(err)
    }
}

/// Terminal outcome of a failed plan execution or direct tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanError {
    /// The plan or tool-call payload is not valid structured data.
    MalformedInput(String),
    /// A syntactically valid plan with no actions.
    EmptyPlan,
    /// The entry at `index` (0-based) has no usable `action` name.
    InvalidActionShape { index: usize },
    /// No tool is registered under the requested name.
    UnknownTool(String),
    /// The handler rejected its parameters before touching the runtime.
    InvalidParameters { action: String, message: String },
    /// The runtime failed while the handler was executing.
    ExecutionFailed { action: String, message: String },
}

impl PlanError {
    /// JSON-RPC error code for this failure kind.
    pub fn code(&self) -> i32 {
        match self {
            PlanError::MalformedInput(_) => PARSE_ERROR,
            PlanError::EmptyPlan => INVALID_PARAMS,
            PlanError::InvalidActionShape { .. } => INVALID_PARAMS,
            PlanError::UnknownTool(_) => METHOD_NOT_FOUND,
            PlanError::InvalidParameters { .. } => INVALID_PARAMS,
            PlanError::ExecutionFailed { .. } => EXECUTION_FAILED,
        }
    }

    /// Name of the action this failure is attributed to, if any.
    pub fn action(&self) -> Option<&str> {
        match self {
            PlanError::UnknownTool(name) => Some(name),
            PlanError::InvalidParameters { action, .. } => Some(action),
            PlanError::ExecutionFailed { action, .. } => Some(action),
            _ => None,
        }
    }

    /// Attribute a handler failure to the action that produced it.
    pub fn from_tool_error(action: &str, err: ToolError) -> Self {
        match err {
            ToolError::InvalidParameters(message) => PlanError::InvalidParameters {
                action: action.to_string(),
                message,
            },
            ToolError::Runtime(err) => PlanError::ExecutionFailed {
                action: action.to_string(),
                message: err.to_string(),
            },
        }
    }
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::MalformedInput(msg) => write!(f, "failed to parse plan JSON: {}", msg),
            PlanError::EmptyPlan => write!(f, "received empty plan"),
            PlanError::InvalidActionShape { index } => {
                write!(f, "invalid action format at position {}", index + 1)
            }
            PlanError::UnknownTool(name) => write!(f, "unknown action: {}", name),
            PlanError::InvalidParameters { action, message } => {
                write!(f, "invalid parameters for tool {}: {}", action, message)
            }
            PlanError::ExecutionFailed { action, message } => {
                write!(f, "failed to execute tool {}: {}", action, message)
            }
        }
    }
}

impl std::error::Error for PlanError {}
