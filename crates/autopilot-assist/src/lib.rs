//! Request/response boundary to a language-model assistant.
//!
//! Callers hold an `Option<&dyn Assistant>`: `None` means deterministic-only
//! mode, decided once at startup. Every failure is an [`AssistError`] the
//! caller answers with its own fallback.

pub mod anthropic;
pub mod mock;

pub use anthropic::AnthropicAssistant;
pub use mock::ScriptedAssistant;

/// Which model class a request should go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    /// Cheap and quick; used for commit grouping.
    Fast,
    /// Strongest available; used for conflict resolution.
    Smart,
}

/// A single-turn prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistRequest {
    pub prompt: String,
    pub tier: ModelTier,
    pub max_tokens: u32,
}

impl AssistRequest {
    pub fn new(prompt: impl Into<String>, tier: ModelTier, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            tier,
            max_tokens,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssistError {
    #[error("assistant unavailable: {0}")]
    Unavailable(String),
    #[error("assistant request timed out")]
    Timeout,
    #[error("assistant returned HTTP {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("cannot decode assistant response: {0}")]
    Decode(String),
    #[error("assistant returned no text")]
    Empty,
}

/// Something that answers prompts with plain text.
pub trait Assistant {
    fn complete(&self, request: &AssistRequest) -> Result<String, AssistError>;

    /// Short label for logs.
    fn name(&self) -> &str {
        "assistant"
    }
}
