// JSON-RPC over HTTP endpoint for the dispatch service

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::envelope::{
    INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR, RpcError, RpcRequest,
    RpcResponse, ToolCallArgs,
};
use crate::orchestrator::Orchestrator;
use crate::prompts::GetPromptArgs;

pub type AppState = Arc<Orchestrator>;

/// Operations reachable through `POST /rpc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcMethod {
    GeneratePlan,
    ExecutePlan,
    CallTool,
    ListTools,
    ListPrompts,
    GetPrompt,
}

impl RpcMethod {
    /// Accepts both the `Server.*` names and their snake_case forms.
    pub fn parse(method: &str) -> Option<Self> {
        match method {
            "Server.CallLLM" | "generate_plan" => Some(Self::GeneratePlan),
            "Server.ExecutePlan" | "execute_plan" => Some(Self::ExecutePlan),
            "Server.CallTool" | "call_tool" => Some(Self::CallTool),
            "Server.ListTools" | "list_tools" => Some(Self::ListTools),
            "Server.ListPrompts" | "list_prompts" => Some(Self::ListPrompts),
            "Server.GetPrompt" | "get_prompt" => Some(Self::GetPrompt),
            _ => None,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/rpc", post(handle_rpc))
        .route("/health", get(health_check))
        .route("/tools", get(list_tools))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health_check() -> Result<Json<Value>, StatusCode> {
    Ok(Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

async fn list_tools(State(state): State<AppState>) -> Json<Value> {
    let tools = state.tools();
    Json(json!({
        "tools": tools,
        "count": tools.len(),
    }))
}

async fn handle_rpc(State(state): State<AppState>, body: Bytes) -> Json<RpcResponse> {
    let raw: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Unparseable JSON-RPC body");
            return Json(RpcResponse::failure(RpcError::new(
                PARSE_ERROR,
                format!("parse error: {}", e),
            )));
        }
    };

    let id = raw.get("id").cloned();
    let request: RpcRequest = match serde_json::from_value(raw) {
        Ok(request) => request,
        Err(e) => {
            return Json(
                RpcResponse::failure(RpcError::new(
                    INVALID_REQUEST,
                    format!("invalid request: {}", e),
                ))
                .with_id(id),
            );
        }
    };

    debug!(method = %request.method, "JSON-RPC request");
    let response = dispatch(&state, &request.method, request.params).await;
    Json(response.with_id(request.id))
}

async fn dispatch(state: &Orchestrator, method: &str, params: Option<Value>) -> RpcResponse {
    let Some(method) = RpcMethod::parse(method) else {
        warn!(method, "Unknown JSON-RPC method");
        return RpcResponse::failure(RpcError::new(
            METHOD_NOT_FOUND,
            format!("method not found: {}", method),
        ));
    };
    let param = first_param(params);

    match method {
        RpcMethod::GeneratePlan => {
            let instruction = match param {
                Value::String(s) => s,
                other => return invalid_params(format!("expected instruction string, got {}", other)),
            };
            match state.generate_plan(&instruction).await {
                Ok(plan) => RpcResponse::success(Value::String(plan)),
                Err(e) => RpcResponse::failure(RpcError::from(&e)),
            }
        }
        RpcMethod::ExecutePlan => {
            let plan = match param {
                Value::String(s) => s,
                Value::Null => String::new(),
                // A plan sent as structured JSON instead of text.
                plan @ Value::Array(_) => plan.to_string(),
                other => return invalid_params(format!("expected plan string, got {}", other)),
            };
            state.execute_plan(&plan).await
        }
        RpcMethod::CallTool => match decode::<ToolCallArgs>(param) {
            Ok(args) => state.call_tool(args).await,
            Err(response) => response,
        },
        RpcMethod::ListTools => RpcResponse::success(json!(state.tools())),
        RpcMethod::ListPrompts => RpcResponse::success(json!(state.list_prompts())),
        RpcMethod::GetPrompt => match decode::<GetPromptArgs>(param) {
            Ok(args) => match state.get_prompt(&args).await {
                Ok(result) => RpcResponse::success(json!(result)),
                Err(e) => RpcResponse::failure(RpcError::from(&e)),
            },
            Err(response) => response,
        },
    }
}

/// Positional params carry the argument as their first element.
fn first_param(params: Option<Value>) -> Value {
    match params {
        Some(Value::Array(mut items)) if !items.is_empty() => items.swap_remove(0),
        Some(Value::Array(_)) | None => Value::Null,
        Some(other) => other,
    }
}

fn decode<T: DeserializeOwned>(param: Value) -> Result<T, RpcResponse> {
    serde_json::from_value(param).map_err(|e| invalid_params(e.to_string()))
}

fn invalid_params(message: String) -> RpcResponse {
    RpcResponse::failure(RpcError::new(INVALID_PARAMS, message))
}
