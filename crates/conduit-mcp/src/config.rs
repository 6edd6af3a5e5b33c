//! Endpoint descriptors and the JSON endpoint list.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use conduit_types::ConfigError;
use serde::{Deserialize, Serialize};

use crate::error::McpError;

fn default_timeout() -> u64 {
    30000
}

/// One configured tool endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    /// Unique name; also the `<endpoint>` half of an action target.
    pub name: String,
    #[serde(flatten)]
    pub kind: EndpointKind,
    /// Per-request timeout in milliseconds (default: 30000).
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

/// How an endpoint is reached, tagged by `"type"` in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EndpointKind {
    Stdio(StdioLaunch),
    Url { url: String },
}

impl EndpointKind {
    pub fn label(&self) -> &'static str {
        match self {
            EndpointKind::Stdio(_) => "stdio",
            EndpointKind::Url { .. } => "url",
        }
    }
}

/// How to launch a stdio endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StdioLaunch {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    /// Required environment variables, each with a default used when the
    /// process environment does not provide a non-empty value.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl StdioLaunch {
    /// Resolve every required variable from `lookup` first, then from the
    /// descriptor default. Empty values count as missing.
    pub fn resolve_env_with(
        &self,
        endpoint: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<HashMap<String, String>, McpError> {
        let mut names: Vec<&String> = self.env.keys().collect();
        names.sort();

        let mut resolved = HashMap::with_capacity(names.len());
        for name in names {
            let value = lookup(name)
                .filter(|v| !v.is_empty())
                .or_else(|| self.env.get(name).filter(|v| !v.is_empty()).cloned())
                .ok_or_else(|| McpError::MissingEnvironment {
                    name: name.clone(),
                    endpoint: endpoint.to_string(),
                })?;
            resolved.insert(name.clone(), value);
        }
        Ok(resolved)
    }

    /// Resolve required variables against the process environment.
    pub fn resolve_env(&self, endpoint: &str) -> Result<HashMap<String, String>, McpError> {
        self.resolve_env_with(endpoint, |name| std::env::var(name).ok())
    }
}

/// Load the endpoint list from a JSON file.
pub fn load_endpoints(path: &Path) -> Result<Vec<EndpointDescriptor>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    parse_endpoints(&content, &path.display().to_string())
}

/// Parse and validate an endpoint list. `origin` names the source in errors.
pub fn parse_endpoints(content: &str, origin: &str) -> Result<Vec<EndpointDescriptor>, ConfigError> {
    let endpoints: Vec<EndpointDescriptor> =
        serde_json::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })?;

    if endpoints.is_empty() {
        return Err(ConfigError::NoEndpoints {
            path: origin.to_string(),
        });
    }

    let mut seen = HashSet::new();
    for endpoint in &endpoints {
        if endpoint.name.trim().is_empty() || endpoint.name.contains('.') {
            return Err(ConfigError::InvalidValue {
                key: "name".to_string(),
                message: format!(
                    "endpoint name '{}' must be non-empty and contain no '.'",
                    endpoint.name
                ),
            });
        }
        if !seen.insert(endpoint.name.as_str()) {
            return Err(ConfigError::DuplicateEndpoint {
                name: endpoint.name.clone(),
            });
        }
        if let EndpointKind::Url { url } = &endpoint.kind {
            reqwest::Url::parse(url).map_err(|e| ConfigError::InvalidValue {
                key: format!("{}.url", endpoint.name),
                message: e.to_string(),
            })?;
        }
    }

    Ok(endpoints)
}
