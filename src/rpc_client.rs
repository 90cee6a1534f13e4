//! JSON-RPC client for a running `serve` instance.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::envelope::{RpcRequest, RpcResponse};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:1234/rpc";

/// Plans can include long pulls, so the client waits well past the server's
/// own deadlines.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(300);

pub struct RpcClient {
    http: Client,
    endpoint: String,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(CLIENT_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one request with positional params and return the envelope.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<RpcResponse> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::new(method, Value::Array(params), id);
        debug!(method, id, endpoint = %self.endpoint, "Sending JSON-RPC request");

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Server returned {}: {}", status, body);
        }

        response
            .json::<RpcResponse>()
            .await
            .context("Malformed JSON-RPC response")
    }

    pub async fn generate_plan(&self, instruction: &str) -> Result<String> {
        let result = self
            .call("Server.CallLLM", vec![json!(instruction)])
            .await?
            .into_result()?;
        match result {
            Value::String(plan) => Ok(plan),
            other => Ok(other.to_string()),
        }
    }

    pub async fn execute_plan(&self, plan: &str) -> Result<RpcResponse> {
        self.call("Server.ExecutePlan", vec![json!(plan)]).await
    }

    pub async fn call_tool(&self, tool_name: &str, parameters: Map<String, Value>) -> Result<RpcResponse> {
        self.call(
            "Server.CallTool",
            vec![json!({"tool_name": tool_name, "parameters": parameters})],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_generate_then_execute() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rpc"))
            .and(body_partial_json(json!({"method": "Server.CallLLM", "params": ["deploy redis"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "result": "[{\"action\":\"pull_image\",\"parameters\":{\"image\":\"redis\"}}]",
                "error": null,
                "id": 1
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rpc"))
            .and(body_partial_json(json!({"method": "Server.ExecutePlan"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "result": null,
                "error": {"code": -32000, "message": "failed to execute tool pull_image: manifest unknown"},
                "id": 2
            })))
            .mount(&server)
            .await;

        let client = RpcClient::new(format!("{}/rpc", server.uri())).unwrap();
        let plan = client.generate_plan("deploy redis").await.unwrap();
        assert!(plan.contains("pull_image"));

        let response = client.execute_plan(&plan).await.unwrap();
        assert!(!response.is_success());
        let err = response.into_result().unwrap_err();
        assert_eq!(err.code, -32000);
        assert_eq!(
            err.to_string(),
            "RPC Error [Code: -32000]: failed to execute tool pull_image: manifest unknown"
        );
    }

    #[tokio::test]
    async fn test_ids_increase_and_http_errors_surface() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = RpcClient::new(format!("{}/rpc", server.uri())).unwrap();
        let err = client.call_tool("create_volume", Map::new()).await.unwrap_err();
        assert!(err.to_string().contains("502"));
        client.call("list_tools", vec![]).await.unwrap_err();

        let requests = server.received_requests().await.unwrap();
        let ids: Vec<Value> = requests
            .iter()
            .map(|r| serde_json::from_slice::<Value>(&r.body).unwrap()["id"].clone())
            .collect();
        assert_eq!(ids, vec![json!(1), json!(2)]);
    }
}
