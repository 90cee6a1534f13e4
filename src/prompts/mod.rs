//! Prompt catalogue.
//!
//! One prompt is served: `docker_compose`, which turns the assistant into a
//! plan+apply project manager seeded with the resources already labelled for
//! the project.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::envelope::{EXECUTION_FAILED, INVALID_PARAMS, METHOD_NOT_FOUND, RpcError};
use crate::runtime::{ContainerRuntime, PROJECT_LABEL_KEY, RuntimeError};
use crate::types::PromptName;

pub const DOCKER_COMPOSE_PROMPT: &str = "docker_compose";

/// Error types for prompt operations.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptError {
    /// Prompt name not found.
    NotFound(String),
    /// A required argument is missing or empty.
    MissingArgument(&'static str),
    /// Listing project resources failed.
    Runtime(String),
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::NotFound(name) => write!(f, "unknown prompt name: {}", name),
            PromptError::MissingArgument(arg) => write!(f, "missing required argument '{}'", arg),
            PromptError::Runtime(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for PromptError {}

impl PromptError {
    pub fn code(&self) -> i32 {
        match self {
            PromptError::NotFound(_) => METHOD_NOT_FOUND,
            PromptError::MissingArgument(_) => INVALID_PARAMS,
            PromptError::Runtime(_) => EXECUTION_FAILED,
        }
    }
}

impl From<&PromptError> for RpcError {
    fn from(err: &PromptError) -> Self {
        RpcError::new(err.code(), err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    pub description: String,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptDescriptor {
    pub name: PromptName,
    pub description: String,
    pub arguments: Vec<PromptArgument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: TextContent,
}

impl PromptMessage {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: TextContent {
                kind: "text".to_string(),
                text: text.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetPromptResult {
    pub messages: Vec<PromptMessage>,
}

/// Arguments of a `get_prompt` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetPromptArgs {
    pub name: String,
    #[serde(default)]
    pub arguments: BTreeMap<String, String>,
}

pub fn list_prompts() -> Vec<PromptDescriptor> {
    vec![PromptDescriptor {
        name: PromptName::new(DOCKER_COMPOSE_PROMPT),
        description: "Treat the LLM like a Docker Compose manager".to_string(),
        arguments: vec![
            PromptArgument {
                name: "name".to_string(),
                description: "Unique name of the project".to_string(),
                required: true,
            },
            PromptArgument {
                name: "containers".to_string(),
                description: "Describe containers you want".to_string(),
                required: true,
            },
        ],
    }]
}

pub async fn get_prompt(
    runtime: &dyn ContainerRuntime,
    name: &str,
    arguments: &BTreeMap<String, String>,
) -> Result<GetPromptResult, PromptError> {
    if name != DOCKER_COMPOSE_PROMPT {
        return Err(PromptError::NotFound(name.to_string()));
    }

    let project = arguments
        .get("name")
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .ok_or(PromptError::MissingArgument("name"))?;
    let containers = arguments.get("containers").map(String::as_str).unwrap_or("");

    let label = format!("{}={}", PROJECT_LABEL_KEY, project);
    debug!(%label, "Collecting project resources");

    let container_infos: Vec<Value> = runtime
        .list_containers(&label)
        .await
        .map_err(|e| listing_failed("containers", e))?
        .into_iter()
        .map(|c| {
            json!({
                "name": c.names.first().cloned().unwrap_or_default(),
                "image": {"id": c.image_id, "tags": [c.image]},
                "status": c.status,
                "id": c.id,
                "ports": c.ports,
            })
        })
        .collect();

    let volume_infos: Vec<Value> = runtime
        .list_volumes(&label)
        .await
        .map_err(|e| listing_failed("volumes", e))?
        .into_iter()
        .map(|v| json!({"name": v.name, "id": v.name}))
        .collect();

    let network_infos: Vec<Value> = runtime
        .list_networks(&label)
        .await
        .map_err(|e| listing_failed("networks", e))?
        .into_iter()
        .map(|n| {
            let members: Vec<Value> = n.containers.iter().map(|id| json!({"id": id})).collect();
            json!({"name": n.name, "id": n.id, "containers": members})
        })
        .collect();

    let text = compose_manager_text(
        &label,
        project,
        &pretty(&container_infos)?,
        &pretty(&volume_infos)?,
        &pretty(&network_infos)?,
        containers,
    );

    Ok(GetPromptResult {
        messages: vec![PromptMessage::user_text(text)],
    })
}

fn listing_failed(what: &str, err: RuntimeError) -> PromptError {
    PromptError::Runtime(format!("error listing {}: {}", what, err))
}

fn pretty(values: &[Value]) -> Result<String, PromptError> {
    serde_json::to_string_pretty(values).map_err(|e| PromptError::Runtime(e.to_string()))
}

fn compose_manager_text(
    label: &str,
    project: &str,
    containers_json: &str,
    volumes_json: &str,
    networks_json: &str,
    requested: &str,
) -> String {
    format!(
        r#"
You are going to act as a Docker Compose manager, using the Docker Tools
available to you. Instead of being provided a 'docker-compose.yml' file,
you will be given instructions in plain language, and interact with the
user through a plan+apply loop, akin to how Terraform operates.

Every Docker resource you create must be assigned the following label:

    {label}

You should use this label to filter resources when possible.

Every Docker resource you create must also be prefixed with the project name, followed by a dash ('-'):

    {project}-{{ResourceName}}

Here are the resources currently present in the project, based on the presence of the above label:

<BEGIN CONTAINERS>
{containers_json}
<END CONTAINERS>
<BEGIN VOLUMES>
{volumes_json}
<END VOLUMES>
<BEGIN NETWORKS>
{networks_json}
<END NETWORKS>

Do not retry the same failed action more than once. Prefer terminating your output
when presented with 3 errors in a row, and ask a clarifying question to
form better inputs or address the error.

For container images, always prefer using the 'latest' image tag, unless the user specifies a tag specifically.
So if a user asks to deploy Nginx, you should pull 'nginx:latest'.

Below is a description of the state of the Docker resources which the user would like you to manage:

<BEGIN DOCKER-RESOURCES>
{requested}
<END DOCKER-RESOURCES>

Respond to this message with a plan of what you will do, in the EXACT format below:

<BEGIN FORMAT>
## Introduction

I will be assisting with deploying Docker containers for project: '{project}'.

### Plan+Apply Loop

I will run in a plan+apply loop when you request changes to the project. This is
to ensure that you are aware of the changes I am about to make, and to give you
the opportunity to ask questions or make tweaks.

Instruct me to apply immediately (without confirming the plan with you) when you desire to do so.

## Commands

Instruct me with the following commands at any point:

- 'help': print this list of commands
- 'apply': apply a given plan
- 'down': stop containers in the project
- 'ps': list containers in the project
- 'quiet': turn on quiet mode (default)
- 'verbose': turn on verbose mode (I will explain a lot!)
- 'destroy': produce a plan to destroy all resources in the project

## Plan

I plan to take the following actions:

1. CREATE ...
2. READ ...
3. UPDATE ...
4. DESTROY ...
5. RECREATE ...
...
N. ...

Respond 'apply' to apply this plan. Otherwise, provide feedback and I will present you with an updated plan.
<END FORMAT>

Always apply a plan in dependency order. For example, if you are creating a container that depends on a
database, create the database first, and abort the apply if dependency creation fails. Likewise,
destruction should occur in the reverse dependency order, and be aborted if destroying a particular resource fails.

Plans should only create, update, or destroy resources in the project. Relatedly, 'recreate' should
be used to indicate a destroy followed by a create; always prefer updating a resource when possible,
only recreating it if required (e.g. for immutable resources like containers).
"#
    )
}
