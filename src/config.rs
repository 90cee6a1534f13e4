use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{env, fs, path::Path, path::PathBuf, time::Duration};

use crate::llm::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::runtime::{DEFAULT_API_VERSION, DEFAULT_DOCKER_HOST};

pub const DEFAULT_BIND: &str = "0.0.0.0:1234";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bind: String,
    pub docker: DockerConfig,
    pub llm: LlmConfig,
    pub execution: ExecutionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    /// Engine address; falls back to `DOCKER_HOST`.
    pub host: Option<String>,
    pub api_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Falls back to `OPENAI_API_KEY`.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub plan_timeout_secs: u64,
    pub pull_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            docker: DockerConfig::default(),
            llm: LlmConfig::default(),
            execution: ExecutionConfig::default(),
        }
    }
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            host: None,
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            plan_timeout_secs: 30,
            pull_timeout_secs: 120,
        }
    }
}

impl AppConfig {
    /// Load the config file if one is found, then fill gaps from the
    /// environment.
    pub fn load() -> anyhow::Result<Self> {
        let lookup = |name: &str| env::var(name).ok();
        let mut config = match resolve_config_path()? {
            Some(path) => Self::load_from(&path, &lookup)?,
            None => Self::default(),
        };
        config.apply_env(&lookup);
        Ok(config)
    }

    pub fn load_from(path: &Path, lookup: &dyn Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
        Self::from_json_str(&raw, lookup)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path.display(), e))
    }

    /// Parse config JSON, expanding `${VAR}` references in string values.
    pub fn from_json_str(raw: &str, lookup: &dyn Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut value: Value = serde_json::from_str(raw)?;
        expand_value(&mut value, lookup);
        Ok(serde_json::from_value(value)?)
    }

    /// Environment values only fill settings the file left unset.
    pub fn apply_env(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        if self.docker.host.as_deref().is_none_or(str::is_empty) {
            self.docker.host = lookup("DOCKER_HOST").filter(|h| !h.is_empty());
        }
        if self.llm.api_key.as_deref().is_none_or(str::is_empty) {
            self.llm.api_key = lookup("OPENAI_API_KEY").filter(|k| !k.is_empty());
        }
    }

    pub fn docker_host(&self) -> &str {
        self.docker.host.as_deref().unwrap_or(DEFAULT_DOCKER_HOST)
    }

    pub fn api_key(&self) -> Option<&str> {
        self.llm.api_key.as_deref().filter(|k| !k.is_empty())
    }

    pub fn plan_timeout(&self) -> Duration {
        Duration::from_secs(self.execution.plan_timeout_secs)
    }

    pub fn pull_timeout(&self) -> Duration {
        Duration::from_secs(self.execution.pull_timeout_secs)
    }
}

pub fn resolve_config_path() -> anyhow::Result<Option<PathBuf>> {
    if let Ok(p) = env::var("MCP_DOCKER_CONFIG") {
        let path = PathBuf::from(p);
        if !path.exists() {
            return Err(anyhow::anyhow!(
                "MCP_DOCKER_CONFIG points to {}, which does not exist",
                path.display()
            ));
        }
        return Ok(Some(path));
    }

    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        let candidate = PathBuf::from(xdg).join("mcp-docker").join("config.json");
        if candidate.exists() {
            return Ok(Some(candidate));
        }
    }

    let candidate = PathBuf::from("mcp-docker.json");
    if candidate.exists() {
        return Ok(Some(candidate));
    }

    Ok(None)
}

fn expand_value(value: &mut Value, lookup: &dyn Fn(&str) -> Option<String>) {
    match value {
        Value::String(s) => *s = expand_env_vars(s, lookup),
        Value::Array(items) => items.iter_mut().for_each(|v| expand_value(v, lookup)),
        Value::Object(map) => map.values_mut().for_each(|v| expand_value(v, lookup)),
        _ => {}
    }
}

/// Replace `${NAME}` with the variable's value; unknown names are left as is.
fn expand_env_vars(input: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next(); // consume '{'
            let mut name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                name.push(c);
            }
            if let Some(val) = lookup(&name) {
                out.push_str(&val);
            } else {
                out.push_str("${");
                out.push_str(&name);
                out.push('}');
            }
        } else {
            out.push(ch);
        }
    }

    out
}
