//! HTTP transport for the vision oracle.
//!
//! Talks to an OpenAI-style chat-completions endpoint with images inlined as
//! base64 data URIs. Transport failures retry inside the client (the
//! controller's one-retry policy sits above this and is independent);
//! malformed model output is returned immediately for the controller to
//! decide.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde_json::{json, Value};
use tracing::{debug, warn};

use scenealign_core::{
    EvaluationError, EvaluationResult, PositioningOracle, SceneReference, SceneState, TargetSpec,
};

use crate::parse::parse_verdict;
use crate::prompt::build_prompt;

/// Vision oracle configuration.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Chat-completions endpoint URL.
    pub endpoint: String,

    /// API key, sent as a bearer token.
    pub api_key: String,

    /// Model name.
    pub model: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Transport attempts per evaluation before giving up.
    pub max_attempts: u32,

    /// Response token budget.
    pub max_tokens: u32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        OracleConfig {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            model: "gpt-4o".to_string(),
            timeout_secs: 30,
            max_attempts: 3,
            max_tokens: 500,
        }
    }
}

impl OracleConfig {
    pub fn new(endpoint: &str, api_key: &str, model: &str) -> Self {
        OracleConfig {
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            ..Default::default()
        }
    }
}

/// `PositioningOracle` implementation backed by a hosted vision model.
pub struct VisionOracle {
    config: OracleConfig,
    http_client: reqwest::Client,
    calls: AtomicU32,
}

impl VisionOracle {
    pub fn new(config: OracleConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent("scenealign-oracle/0.2.0")
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        VisionOracle {
            config,
            http_client,
            calls: AtomicU32::new(0),
        }
    }

    /// Build the chat-completions payload: prompt text, the reference panel
    /// (for image targets) first, then every scene capture in angle order.
    fn build_payload(&self, prompt: &str, target: &TargetSpec, state: &SceneState) -> Value {
        let mut content = vec![json!({ "type": "text", "text": prompt })];

        if let SceneReference::Image { data, .. } = &target.reference {
            content.push(image_part(data));
        }
        for image in state.images() {
            content.push(image_part(&image.data));
        }

        json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": [
                { "role": "user", "content": content }
            ]
        })
    }

    async fn post_once(&self, payload: &Value) -> Result<String, EvaluationError> {
        let response = self
            .http_client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| EvaluationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EvaluationError::Transport(format!(
                "HTTP {status} from {}",
                self.config.endpoint
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| EvaluationError::Transport(e.to_string()))?;

        body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| EvaluationError::Malformed {
                reason: "response carries no message content".to_string(),
            })
    }

    /// Transport retry loop: rate limits and connection failures back off and
    /// retry; malformed content is not retried here.
    async fn request_with_retry(&self, payload: &Value) -> Result<String, EvaluationError> {
        let mut last_error = EvaluationError::Transport("no attempts made".to_string());

        for attempt in 1..=self.config.max_attempts {
            debug!(
                attempt = attempt,
                max_attempts = self.config.max_attempts,
                model = %self.config.model,
                "Oracle request"
            );

            match self.post_once(payload).await {
                Ok(content) => return Ok(content),
                Err(EvaluationError::Transport(message)) => {
                    warn!(attempt = attempt, error = %message, "Oracle transport failure");
                    last_error = EvaluationError::Transport(message);
                    if attempt < self.config.max_attempts {
                        let wait = 2u64.saturating_pow(attempt).min(10);
                        tokio::time::sleep(Duration::from_secs(wait)).await;
                    }
                }
                Err(other) => return Err(other),
            }
        }

        Err(last_error)
    }
}

fn image_part(data: &[u8]) -> Value {
    let encoded = general_purpose::STANDARD.encode(data);
    json!({
        "type": "image_url",
        "image_url": { "url": format!("data:image/png;base64,{encoded}") }
    })
}

#[async_trait]
impl PositioningOracle for VisionOracle {
    async fn evaluate(
        &self,
        target: &TargetSpec,
        state: &SceneState,
    ) -> Result<EvaluationResult, EvaluationError> {
        let iteration = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let prompt = build_prompt(target, state.transform(), iteration);
        let payload = self.build_payload(&prompt, target, state);
        let content = self.request_with_retry(&payload).await?;
        parse_verdict(&content)
    }
}
