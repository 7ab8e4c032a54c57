use std::time::Duration;

use autopilot_core::Settings;
use serde::{Deserialize, Serialize};

use crate::{AssistError, AssistRequest, Assistant, ModelTier};

const API_VERSION: &str = "2023-06-01";

// ── Wire types ──

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [WireMessage<'a>; 1],
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

/// Only text blocks matter; anything else is skipped.
#[derive(Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

// ── Client ──

/// Blocking client for the Anthropic Messages API.
pub struct AnthropicAssistant {
    api_key: String,
    base_url: String,
    model_fast: String,
    model_smart: String,
    agent: ureq::Agent,
}

impl AnthropicAssistant {
    pub fn new(api_key: impl Into<String>, settings: &Settings) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: settings.api_base_url.clone(),
            model_fast: settings.model_fast.clone(),
            model_smart: settings.model_smart.clone(),
            agent: build_agent(settings.timeout()),
        }
    }

    /// Client from `ANTHROPIC_API_KEY`, or `None` when the key is absent.
    pub fn from_env(settings: &Settings) -> Option<Self> {
        autopilot_core::config::api_key_from_env().map(|key| Self::new(key, settings))
    }

    fn endpoint(&self) -> String {
        format!("{}/messages", self.base_url.trim_end_matches('/'))
    }

    fn model(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.model_fast,
            ModelTier::Smart => &self.model_smart,
        }
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .new_agent()
}

fn map_ureq_error(e: ureq::Error) -> AssistError {
    match e {
        ureq::Error::StatusCode(code) => AssistError::Status(code),
        ureq::Error::Timeout(_) => AssistError::Timeout,
        other => AssistError::Transport(other.to_string()),
    }
}

/// Concatenated text blocks of a Messages API response body, trimmed.
fn extract_text(body: &str) -> Result<String, AssistError> {
    let parsed: MessagesResponse =
        serde_json::from_str(body).map_err(|e| AssistError::Decode(e.to_string()))?;
    let text: String = parsed
        .content
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Other => None,
        })
        .collect();
    let text = text.trim();
    if text.is_empty() {
        return Err(AssistError::Empty);
    }
    Ok(text.to_string())
}

impl Assistant for AnthropicAssistant {
    fn complete(&self, request: &AssistRequest) -> Result<String, AssistError> {
        let model = self.model(request.tier);
        let payload = MessagesRequest {
            model,
            max_tokens: request.max_tokens,
            messages: [WireMessage {
                role: "user",
                content: &request.prompt,
            }],
        };
        let body = serde_json::to_string(&payload).map_err(|e| AssistError::Decode(e.to_string()))?;

        tracing::debug!(model, max_tokens = request.max_tokens, "assistant request");
        let mut response = self
            .agent
            .post(&self.endpoint())
            .header("x-api-key", self.api_key.as_str())
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .send(body)
            .map_err(map_ureq_error)?;
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(map_ureq_error)?;
        extract_text(&text)
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}
