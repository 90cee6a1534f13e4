//! OpenAI chat-completions planner.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::{LlmError, PlanGenerator, SYSTEM_PROMPT, normalize_plan};
use crate::tools::ToolDescriptor;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct OpenAiPlanner {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl OpenAiPlanner {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: &str,
    ) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| LlmError::Request(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, instruction: &str, tools: &[ToolDescriptor]) -> Value {
        let functions: Vec<Value> = tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.input_schema,
                    }
                })
            })
            .collect();

        let mut body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": instruction},
            ],
        });
        if !functions.is_empty() {
            body["tools"] = Value::Array(functions);
        }
        body
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

/// A model that answers with function calls instead of text is read as a
/// plan with one action per call, in call order.
fn plan_from_tool_calls(calls: &[ToolCall]) -> Result<String, LlmError> {
    let actions = calls
        .iter()
        .map(|call| {
            let parameters = if call.function.arguments.trim().is_empty() {
                json!({})
            } else {
                serde_json::from_str::<Value>(&call.function.arguments)
                    .map_err(|e| LlmError::InvalidPlan(e.to_string()))?
            };
            Ok(json!({"action": call.function.name, "parameters": parameters}))
        })
        .collect::<Result<Vec<_>, LlmError>>()?;

    serde_json::to_string(&actions).map_err(|e| LlmError::InvalidPlan(e.to_string()))
}

#[async_trait]
impl PlanGenerator for OpenAiPlanner {
    async fn generate_plan(
        &self,
        instruction: &str,
        tools: &[ToolDescriptor],
    ) -> Result<String, LlmError> {
        info!(model = %self.model, tools = tools.len(), "Requesting plan");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(instruction, tools))
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Language model request failed");
                LlmError::Request(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(text);
            warn!(status = status.as_u16(), %message, "Language model API error");
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let Some(choice) = completion.choices.into_iter().next() else {
            warn!("Language model returned no choices");
            return Err(LlmError::EmptyResponse);
        };

        let content = choice.message.content.unwrap_or_default();
        let plan = if content.trim().is_empty() && !choice.message.tool_calls.is_empty() {
            plan_from_tool_calls(&choice.message.tool_calls)?
        } else {
            normalize_plan(&content).inspect_err(|e| {
                warn!(error = %e, "Language model reply is not a plan");
            })?
        };

        debug!(%plan, "Generated plan");
        Ok(plan)
    }
}
