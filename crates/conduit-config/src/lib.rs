//! Layered configuration for Conduit.
//!
//! Reads configuration from multiple sources with precedence:
//! CLI flags > env vars > `config.toml` > defaults.
//! The endpoint list itself is a separate JSON file whose path is resolved
//! the same way.

use std::path::{Path, PathBuf};

use conduit_mcp::EndpointDescriptor;
use conduit_types::ConfigError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE_URL: &str = "https://api.anthropic.com";

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";

pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Upper bound for one model call, including retries.
pub const DEFAULT_MODEL_TIMEOUT_MS: u64 = 120_000;

pub const DEFAULT_SERVERS_FILE: &str = "mcp_config.json";

pub const DEFAULT_LOG_FILE: &str = "chatlog.json";

/// Resolved configuration for a Conduit session.
#[derive(Debug, Clone)]
pub struct ConduitConfig {
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub api_base_url: String,
    pub model_timeout_ms: u64,
    pub summarize: bool,
    pub log_file: PathBuf,
    pub servers_file: PathBuf,
    pub endpoints: Vec<EndpointDescriptor>,
    pub config_dir: PathBuf,
}

/// Settings that can be read from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub servers: ServersSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiSettings {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub base_url: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSettings {
    pub summarize: Option<bool>,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServersSettings {
    /// Path to the JSON endpoint list.
    pub config: Option<PathBuf>,
}

/// CLI overrides that take highest precedence.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub servers: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub no_summarize: bool,
}

impl ConduitConfig {
    /// Load configuration from all sources, applying precedence rules.
    ///
    /// Precedence (highest to lowest):
    /// 1. CLI flags
    /// 2. Environment variables
    /// 3. `config.toml` in the config directory
    /// 4. Defaults
    pub fn load(overrides: CliOverrides) -> Result<Self, ConfigError> {
        let config_dir = config_dir();
        Self::load_from(overrides, &config_dir, |key| std::env::var(key).ok())
    }

    /// [`load`](Self::load) with an explicit config directory and environment.
    pub fn load_from(
        overrides: CliOverrides,
        config_dir: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let settings = load_settings_file(&config_dir.join("config.toml"));

        // Resolve API key: CLI > env > config file
        let api_key = overrides
            .api_key
            .or_else(|| var("ANTHROPIC_API_KEY"))
            .or(settings.api.api_key)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingKey {
                key: "api_key (set ANTHROPIC_API_KEY or add it to config.toml)".into(),
            })?;

        let model = overrides
            .model
            .or_else(|| var("CONDUIT_MODEL"))
            .or(settings.api.model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let max_tokens = overrides
            .max_tokens
            .or(settings.api.max_tokens)
            .unwrap_or(DEFAULT_MAX_TOKENS);
        if max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_tokens".into(),
                message: "must be greater than zero".into(),
            });
        }

        let api_base_url = var("ANTHROPIC_API_BASE_URL")
            .or(settings.api.base_url)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let model_timeout_ms = settings
            .api
            .timeout_ms
            .unwrap_or(DEFAULT_MODEL_TIMEOUT_MS);

        let summarize = !overrides.no_summarize && settings.session.summarize.unwrap_or(true);

        let log_file = overrides
            .log_file
            .or(settings.session.log_file)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));

        let servers_file = overrides
            .servers
            .or_else(|| var("CONDUIT_SERVERS").map(PathBuf::from))
            .or(settings.servers.config)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SERVERS_FILE));

        let endpoints = conduit_mcp::load_endpoints(&servers_file)?;

        Ok(ConduitConfig {
            api_key,
            model,
            max_tokens,
            api_base_url,
            model_timeout_ms,
            summarize,
            log_file,
            servers_file,
            endpoints,
            config_dir: config_dir.to_path_buf(),
        })
    }
}

/// The Conduit config directory (`$CONDUIT_CONFIG_DIR` or `~/.conduit`).
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CONDUIT_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".conduit")
}

/// Load and parse a TOML settings file, returning defaults on any error.
fn load_settings_file(path: &Path) -> SettingsFile {
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("Failed to parse {}: {}", path.display(), e);
            SettingsFile::default()
        }),
        Err(_) => SettingsFile::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    const ENDPOINTS: &str = r#"[{"name": "mathy", "type": "stdio", "command": "mathy"}]"#;

    struct Fixture {
        dir: TempDir,
        env: HashMap<&'static str, String>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let servers = dir.path().join("mcp_config.json");
            std::fs::write(&servers, ENDPOINTS).unwrap();
            let mut env = HashMap::new();
            env.insert("ANTHROPIC_API_KEY", "sk-env".to_string());
            env.insert("CONDUIT_SERVERS", servers.display().to_string());
            Self { dir, env }
        }

        fn settings(&self, toml: &str) {
            std::fs::write(self.dir.path().join("config.toml"), toml).unwrap();
        }

        fn load(&self, overrides: CliOverrides) -> Result<ConduitConfig, ConfigError> {
            ConduitConfig::load_from(overrides, self.dir.path(), |k| self.env.get(k).cloned())
        }
    }

    #[test]
    fn defaults_apply() {
        let fx = Fixture::new();
        let config = fx.load(CliOverrides::default()).unwrap();
        assert_eq!(config.api_key, "sk-env");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert!(config.summarize);
        assert_eq!(config.log_file, PathBuf::from(DEFAULT_LOG_FILE));
        assert_eq!(config.endpoints.len(), 1);
        assert_eq!(config.endpoints[0].name, "mathy");
    }

    #[test]
    fn cli_beats_env_beats_file() {
        let mut fx = Fixture::new();
        fx.settings(
            r#"
[api]
api_key = "sk-file"
model = "file-model"
max_tokens = 300

[session]
summarize = false
log_file = "from-file.json"
"#,
        );
        fx.env.insert("CONDUIT_MODEL", "env-model".to_string());

        let config = fx
            .load(CliOverrides {
                api_key: Some("sk-cli".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(config.api_key, "sk-cli");
        assert_eq!(config.model, "env-model");
        assert_eq!(config.max_tokens, 300);
        assert!(!config.summarize);
        assert_eq!(config.log_file, PathBuf::from("from-file.json"));
    }

    #[test]
    fn missing_api_key_is_fatal() {
        let mut fx = Fixture::new();
        fx.env.insert("ANTHROPIC_API_KEY", "   ".to_string());
        assert!(matches!(
            fx.load(CliOverrides::default()),
            Err(ConfigError::MissingKey { .. })
        ));
    }

    #[test]
    fn missing_servers_file_is_fatal() {
        let mut fx = Fixture::new();
        fx.env.insert("CONDUIT_SERVERS", "/no/such/mcp_config.json".into());
        assert!(matches!(
            fx.load(CliOverrides::default()),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn servers_flag_overrides_env() {
        let fx = Fixture::new();
        let other = fx.dir.path().join("other.json");
        std::fs::write(
            &other,
            r#"[{"name": "remote", "type": "url", "url": "http://localhost:8080/"}]"#,
        )
        .unwrap();
        let config = fx
            .load(CliOverrides {
                servers: Some(other.clone()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(config.servers_file, other);
        assert_eq!(config.endpoints[0].name, "remote");
    }

    #[test]
    fn no_summarize_flag_wins() {
        let fx = Fixture::new();
        fx.settings("[session]\nsummarize = true\n");
        let config = fx
            .load(CliOverrides {
                no_summarize: true,
                ..Default::default()
            })
            .unwrap();
        assert!(!config.summarize);
    }

    #[test]
    fn zero_max_tokens_is_rejected() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.load(CliOverrides {
                max_tokens: Some(0),
                ..Default::default()
            }),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn broken_settings_file_is_ignored() {
        let fx = Fixture::new();
        fx.settings("[api\nmodel = ");
        let config = fx.load(CliOverrides::default()).unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn servers_settings_parse() {
        let settings: SettingsFile = toml::from_str(
            r#"
[servers]
config = "/etc/conduit/servers.json"
"#,
        )
        .unwrap();
        assert_eq!(
            settings.servers.config,
            Some(PathBuf::from("/etc/conduit/servers.json"))
        );
    }
}
