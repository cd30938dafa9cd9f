use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tabguard_core_types::{ClassificationRequest, Verdict};
use tracing::{debug, warn};

use crate::error::OracleError;
use crate::metrics;
use crate::policy::PromptPolicy;
use crate::wire::{build_request_body, parse_completion};

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:1234/v1/chat/completions";
pub const DEFAULT_MODEL: &str =
    "lmstudio-community/Meta-Llama-3.1-8B-Instruct-GGUF/Meta-Llama-3.1-8B-Instruct-Q4_K_M.gguf";

/// External classification service deciding block/allow for a page sample.
#[async_trait]
pub trait OracleClient: Send + Sync {
    async fn classify(&self, request: &ClassificationRequest) -> Result<Verdict, OracleError>;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Full chat-completions URL.
    pub endpoint: String,
    pub model: String,
    pub policy: PromptPolicy,
    pub temperature: f32,
    pub max_tokens: u32,
    pub api_key: Option<String>,
    /// `None` waits until the transport gives up.
    pub request_timeout: Option<Duration>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            policy: PromptPolicy::default(),
            temperature: 0.0,
            max_tokens: 50,
            api_key: None,
            request_timeout: None,
        }
    }
}

/// Oracle backed by an OpenAI-compatible chat-completions endpoint.
pub struct ChatOracle {
    client: Client,
    config: OracleConfig,
}

impl ChatOracle {
    pub fn new(config: OracleConfig) -> Result<Self, OracleError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| OracleError::Config(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client, config })
    }

    async fn invoke(&self, request: &ClassificationRequest) -> Result<Verdict, OracleError> {
        let body = build_request_body(
            &self.config.model,
            &self.config.policy,
            self.config.temperature,
            self.config.max_tokens,
            request,
        )?;

        let mut call = self.client.post(&self.config.endpoint).json(&body);
        if let Some(key) = self.config.api_key.as_deref() {
            call = call.bearer_auth(key);
        }

        let response = call
            .send()
            .await
            .map_err(|err| OracleError::Transport(err.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| OracleError::Transport(format!("failed to read body: {err}")))?;
        if !status.is_success() {
            return Err(OracleError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        debug!(target: "oracle", url = %request.url, raw = %text, "oracle response");
        parse_completion(&text)
    }
}

#[async_trait]
impl OracleClient for ChatOracle {
    async fn classify(&self, request: &ClassificationRequest) -> Result<Verdict, OracleError> {
        debug!(target: "oracle", tab = %request.tab, url = %request.url, "checking with oracle");
        let result = self.invoke(request).await;
        match &result {
            Ok(verdict) => {
                metrics::record_call(if verdict.should_block { "block" } else { "allow" })
            }
            Err(OracleError::Response(_)) => metrics::record_call("invalid"),
            Err(err) => {
                warn!(target: "oracle", url = %request.url, %err, "oracle call failed");
                metrics::record_call("error");
            }
        }
        result
    }
}
