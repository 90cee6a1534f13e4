//! Plan generation through a language model.
//!
//! The model is shown the registry's tools and asked for a plan in the wire
//! shape the executor parses. Only the syntax of the reply is checked here;
//! the executor validates everything else.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::envelope::{EXECUTION_FAILED, PARSE_ERROR, RpcError};
use crate::tools::ToolDescriptor;

mod openai;
mod prompt;

pub use openai::{DEFAULT_BASE_URL, DEFAULT_MODEL, OpenAiPlanner};
pub use prompt::SYSTEM_PROMPT;

#[derive(Debug, Clone, PartialEq)]
pub enum LlmError {
    /// No API key was configured.
    MissingApiKey,
    /// Plan generation is switched off for this process.
    Disabled,
    /// The request never produced a usable HTTP response.
    Request(String),
    /// The provider answered with a non-success status.
    Api { status: u16, message: String },
    EmptyResponse,
    /// The reply is not a JSON array of actions.
    InvalidPlan(String),
}

impl LlmError {
    pub fn code(&self) -> i32 {
        match self {
            LlmError::InvalidPlan(_) => PARSE_ERROR,
            _ => EXECUTION_FAILED,
        }
    }
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::MissingApiKey => write!(f, "OPENAI_API_KEY environment variable not set"),
            LlmError::Disabled => write!(f, "plan generation is disabled on this server"),
            LlmError::Request(msg) => write!(f, "language model request failed: {}", msg),
            LlmError::Api { status, message } => {
                write!(f, "language model API returned {}: {}", status, message)
            }
            LlmError::EmptyResponse => write!(f, "received an empty response from the language model"),
            LlmError::InvalidPlan(msg) => write!(f, "language model returned invalid JSON: {}", msg),
        }
    }
}

impl std::error::Error for LlmError {}

impl From<&LlmError> for RpcError {
    fn from(err: &LlmError) -> Self {
        RpcError::new(err.code(), err.to_string())
    }
}

/// Turns an instruction into plan text.
#[async_trait]
pub trait PlanGenerator: Send + Sync {
    async fn generate_plan(
        &self,
        instruction: &str,
        tools: &[ToolDescriptor],
    ) -> Result<String, LlmError>;
}

/// Strip an optional Markdown code fence from a model reply.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`, `JSON`, ...) on the opening line.
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Validate a model reply as a JSON array and re-serialise it compactly.
pub fn normalize_plan(content: &str) -> Result<String, LlmError> {
    let body = strip_code_fence(content);
    let actions: Vec<Value> =
        serde_json::from_str(body).map_err(|e| LlmError::InvalidPlan(e.to_string()))?;
    serde_json::to_string(&actions).map_err(|e| LlmError::InvalidPlan(e.to_string()))
}
