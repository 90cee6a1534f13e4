//! JSON-RPC 2.0 request/response envelope.
//!
//! The response envelope always serialises both `result` and `error`, with
//! exactly one of them non-null.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::PlanError;

pub const JSON_RPC_VERSION: &str = "2.0";

/// Invalid JSON was received (malformed plan or request body).
pub const PARSE_ERROR: i32 = -32700;
/// The request object is not a valid JSON-RPC request.
pub const INVALID_REQUEST: i32 = -32600;
/// Unknown RPC method, action or tool.
pub const METHOD_NOT_FOUND: i32 = -32601;
/// Invalid parameters, including an empty plan.
pub const INVALID_PARAMS: i32 = -32602;
/// A handler or collaborator failed while executing.
pub const EXECUTION_FAILED: i32 = -32000;

/// Incoming JSON-RPC request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    #[serde(rename = "jsonrpc", default = "default_version")]
    pub version: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub id: Option<Value>,
}

fn default_version() -> String {
    JSON_RPC_VERSION.to_string()
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, params: Value, id: u64) -> Self {
        Self {
            version: JSON_RPC_VERSION.to_string(),
            method: method.into(),
            params: Some(params),
            id: Some(Value::from(id)),
        }
    }
}

/// Error object carried in a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl RpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RPC Error [Code: {}]: {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}

impl From<&PlanError> for RpcError {
    fn from(err: &PlanError) -> Self {
        RpcError::new(err.code(), err.to_string())
    }
}

/// Outgoing JSON-RPC response; the uniform result envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(rename = "jsonrpc")]
    pub version: String,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
    #[serde(default)]
    pub id: Option<Value>,
}

impl RpcResponse {
    pub fn success(result: Value) -> Self {
        Self {
            version: JSON_RPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id: None,
        }
    }

    pub fn failure(error: RpcError) -> Self {
        Self {
            version: JSON_RPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id: None,
        }
    }

    pub fn from_result(result: Result<Value, PlanError>) -> Self {
        match result {
            Ok(value) => Self::success(value),
            Err(err) => Self::failure(RpcError::from(&err)),
        }
    }

    /// Attach the id of the request this response answers.
    pub fn with_id(mut self, id: Option<Value>) -> Self {
        self.id = id;
        self
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Split into the payload or the carried error.
    pub fn into_result(self) -> Result<Value, RpcError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Arguments of a direct tool invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolCallArgs {
    #[serde(alias = "toolName", alias = "name")]
    pub tool_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub parameters: Map<String, Value>,
}

/// `"parameters": null` reads as an empty bag.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}
