//! Host configuration.
//!
//! Loaded from YAML, then patched from `TABGUARD_*` environment variables.
//! Durations are written in humantime form (`5s`, `1h`).

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use tabguard_core_types::DEFAULT_MAX_CONTENT_CHARS;
use tabguard_decision_cache::{CacheConfig, DEFAULT_TTL};
use tabguard_extension_bridge::BridgeConfig;
use tabguard_gate::model::DEFAULT_BLOCKED_PAGE;
use tabguard_gate::GateConfig;
use tabguard_oracle::{OracleConfig, PolicyKind, PromptPolicy, DEFAULT_ENDPOINT, DEFAULT_MODEL};
use tabguard_scheduler::DEFAULT_QUIET_PERIOD;

pub const ENV_ORACLE_ENDPOINT: &str = "TABGUARD_ORACLE_ENDPOINT";
pub const ENV_ORACLE_MODEL: &str = "TABGUARD_ORACLE_MODEL";
pub const ENV_ORACLE_API_KEY: &str = "TABGUARD_ORACLE_API_KEY";
pub const ENV_QUIET_PERIOD: &str = "TABGUARD_QUIET_PERIOD";
pub const ENV_CACHE_TTL: &str = "TABGUARD_CACHE_TTL";
pub const ENV_BIND: &str = "TABGUARD_BIND";

pub const DEFAULT_BIND: &str = "127.0.0.1:7878";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gate: GateSection,
    pub oracle: OracleSection,
    pub server: ServerSection,
    pub bridge: BridgeConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GateSection {
    #[serde(with = "humantime_duration")]
    pub quiet_period: Duration,
    #[serde(with = "humantime_duration")]
    pub cache_ttl: Duration,
    /// `None` keeps every decision for the lifetime of the process.
    pub cache_capacity: Option<usize>,
    pub max_content_chars: usize,
    pub blocked_page: String,
    pub extra_ineligible_prefixes: Vec<String>,
}

impl Default for GateSection {
    fn default() -> Self {
        Self {
            quiet_period: DEFAULT_QUIET_PERIOD,
            cache_ttl: DEFAULT_TTL,
            cache_capacity: None,
            max_content_chars: DEFAULT_MAX_CONTENT_CHARS,
            blocked_page: DEFAULT_BLOCKED_PAGE.to_string(),
            extra_ineligible_prefixes: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSection {
    pub endpoint: String,
    pub model: String,
    pub policy: PolicyKind,
    /// Required for the `custom` policy, ignored by the presets.
    pub system_prompt: Option<String>,
    /// Overrides the user message template of any policy.
    pub user_template: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub api_key: Option<String>,
    #[serde(with = "humantime_duration::option")]
    pub request_timeout: Option<Duration>,
}

impl Default for OracleSection {
    fn default() -> Self {
        let defaults = OracleConfig::default();
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            policy: PolicyKind::default(),
            system_prompt: None,
            user_template: None,
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
            api_key: None,
            request_timeout: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
    pub cors: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            cors: true,
        }
    }
}

impl Config {
    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Copy safe to print: the API key is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.oracle.api_key.is_some() {
            copy.oracle.api_key = Some("********".to_string());
        }
        copy
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from any key lookup. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(endpoint) = get(ENV_ORACLE_ENDPOINT) {
            self.oracle.endpoint = endpoint;
        }
        if let Some(model) = get(ENV_ORACLE_MODEL) {
            self.oracle.model = model;
        }
        if let Some(key) = get(ENV_ORACLE_API_KEY) {
            self.oracle.api_key = Some(key);
        }
        if let Some(raw) = get(ENV_QUIET_PERIOD) {
            self.gate.quiet_period = parse_duration(ENV_QUIET_PERIOD, &raw)?;
        }
        if let Some(raw) = get(ENV_CACHE_TTL) {
            self.gate.cache_ttl = parse_duration(ENV_CACHE_TTL, &raw)?;
        }
        if let Some(bind) = get(ENV_BIND) {
            self.server.bind = bind;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gate.quiet_period.is_zero() {
            return Err(ConfigError::invalid("gate.quiet_period", "must be non-zero"));
        }
        if self.gate.cache_ttl.is_zero() {
            return Err(ConfigError::invalid("gate.cache_ttl", "must be non-zero"));
        }
        if self.gate.max_content_chars == 0 {
            return Err(ConfigError::invalid(
                "gate.max_content_chars",
                "must be at least 1",
            ));
        }
        if self.gate.cache_capacity == Some(0) {
            return Err(ConfigError::invalid(
                "gate.cache_capacity",
                "use null for an unbounded cache",
            ));
        }
        if self.gate.blocked_page.trim().is_empty() {
            return Err(ConfigError::invalid("gate.blocked_page", "must not be empty"));
        }
        self.prompt_policy()?;
        let endpoint = Url::parse(&self.oracle.endpoint)
            .map_err(|err| ConfigError::invalid("oracle.endpoint", err.to_string()))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(
                "oracle.endpoint",
                format!("unsupported scheme {}", endpoint.scheme()),
            ));
        }
        if self.oracle.model.trim().is_empty() {
            return Err(ConfigError::invalid("oracle.model", "must not be empty"));
        }
        self.bind_addr()?;
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind
            .parse()
            .map_err(|err: std::net::AddrParseError| {
                ConfigError::invalid("server.bind", err.to_string())
            })
    }

    pub fn gate_config(&self) -> GateConfig {
        GateConfig {
            quiet_period: self.gate.quiet_period,
            max_content_chars: self.gate.max_content_chars,
            blocked_page: self.gate.blocked_page.clone(),
            extra_ineligible_prefixes: self.gate.extra_ineligible_prefixes.clone(),
        }
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: self.gate.cache_ttl,
            capacity: self.gate.cache_capacity,
        }
    }

    pub fn prompt_policy(&self) -> Result<PromptPolicy, ConfigError> {
        let mut policy = match PromptPolicy::preset(self.oracle.policy) {
            Some(preset) => preset,
            None => {
                let prompt = self
                    .oracle
                    .system_prompt
                    .as_deref()
                    .filter(|prompt| !prompt.trim().is_empty())
                    .ok_or_else(|| {
                        ConfigError::invalid(
                            "oracle.system_prompt",
                            "required when policy is custom",
                        )
                    })?;
                PromptPolicy::custom(prompt, None)
            }
        };
        if let Some(template) = &self.oracle.user_template {
            policy.user_template = template.clone();
        }
        Ok(policy)
    }

    pub fn oracle_config(&self) -> Result<OracleConfig, ConfigError> {
        Ok(OracleConfig {
            endpoint: self.oracle.endpoint.clone(),
            model: self.oracle.model.clone(),
            policy: self.prompt_policy()?,
            temperature: self.oracle.temperature,
            max_tokens: self.oracle.max_tokens,
            api_key: self.oracle.api_key.clone(),
            request_timeout: self.oracle.request_timeout,
        })
    }
}

fn parse_duration(key: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw.trim()).map_err(|err| ConfigError::invalid(key, err.to_string()))
}

mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use std::time::Duration;

        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(duration) => super::serialize(duration, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_document_yields_defaults() {
        let config = Config::from_yaml_str("").unwrap();
        assert_eq!(config.gate.quiet_period, Duration::from_secs(5));
        assert_eq!(config.gate.cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.server.bind, DEFAULT_BIND);
        assert!(config.oracle.request_timeout.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn parses_humantime_durations() {
        let config = Config::from_yaml_str(
            "gate:\n  quiet_period: 750ms\n  cache_ttl: 2h\noracle:\n  request_timeout: 30s\n",
        )
        .unwrap();
        assert_eq!(config.gate.quiet_period, Duration::from_millis(750));
        assert_eq!(config.gate.cache_ttl, Duration::from_secs(7200));
        assert_eq!(config.oracle.request_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn overrides_patch_selected_fields() {
        let mut vars = HashMap::new();
        vars.insert(ENV_QUIET_PERIOD, "2s");
        vars.insert(ENV_ORACLE_MODEL, "tiny-model");
        vars.insert(ENV_BIND, "");

        let mut config = Config::default();
        config
            .apply_overrides(|key| vars.get(key).map(|value| value.to_string()))
            .unwrap();
        assert_eq!(config.gate.quiet_period, Duration::from_secs(2));
        assert_eq!(config.oracle.model, "tiny-model");
        assert_eq!(config.server.bind, DEFAULT_BIND);
    }

    #[test]
    fn bad_override_duration_is_reported() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(|key| (key == ENV_CACHE_TTL).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_CACHE_TTL));
    }

    #[test]
    fn validation_rejects_zero_quiet_period() {
        let mut config = Config::default();
        config.gate.quiet_period = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                key: "gate.quiet_period",
                ..
            })
        ));
    }

    #[test]
    fn validation_rejects_non_http_endpoint() {
        let mut config = Config::default();
        config.oracle.endpoint = "ftp://models.local/v1".to_string();
        assert!(config.validate().is_err());
        config.oracle.endpoint = "/v1/chat/completions".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn custom_policy_needs_a_prompt() {
        let mut config = Config::default();
        config.oracle.policy = PolicyKind::Custom;
        assert!(config.validate().is_err());

        config.oracle.system_prompt = Some("Block anything about football.".to_string());
        let policy = config.prompt_policy().unwrap();
        assert_eq!(policy.name, "custom");
        assert_eq!(policy.system_prompt, "Block anything about football.");
    }

    #[test]
    fn redacted_masks_api_key() {
        let mut config = Config::default();
        config.oracle.api_key = Some("sk-secret".to_string());
        let yaml = config.redacted().to_yaml().unwrap();
        assert!(!yaml.contains("sk-secret"));
        assert_eq!(config.oracle.api_key.as_deref(), Some("sk-secret"));
    }
}
