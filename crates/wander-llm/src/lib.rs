pub mod openai;
mod timebox;

use std::{fmt, future::Future, pin::Pin};

pub use timebox::{timebox, Elapsed, LLM_TIMEOUT};

/// A pending single-turn completion, resolving to the reply text.
pub type Completion<'a> = Pin<Box<dyn Future<Output = exn::Result<String, LlmError>> + Send + 'a>>;

/// A language-model provider that answers single-turn prompts.
pub trait Provider: Send + Sync {
    /// Human-readable provider name (e.g. "openai").
    fn name(&self) -> &str;

    /// The model identifier used in API requests.
    fn model_id(&self) -> &str;

    /// Send `prompt` as a single user message and return the trimmed reply.
    ///
    /// The returned future is not bounded in time; callers wrap it with
    /// [`timebox`].
    fn complete<'a>(&'a self, prompt: &'a str, options: &'a GenOptions) -> Completion<'a>;
}

/// Options controlling LLM generation.
#[derive(Debug, Clone, Default)]
pub struct GenOptions {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl GenOptions {
    /// Deterministic sampling capped to `max_tokens`.
    #[must_use]
    pub const fn deterministic(max_tokens: u32) -> Self {
        Self {
            temperature: Some(0.0),
            max_tokens: Some(max_tokens),
        }
    }

    /// Exploratory sampling at `temperature`, capped to `max_tokens`.
    #[must_use]
    pub const fn exploratory(temperature: f64, max_tokens: u32) -> Self {
        Self {
            temperature: Some(temperature),
            max_tokens: Some(max_tokens),
        }
    }
}

/// Errors from LLM operations.
#[derive(Debug)]
pub enum LlmError {
    Api { status: u16, body: String },
    Network(String),
    Malformed(String),
    EmptyReply,
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api { status, body } => write!(f, "API error ({status}): {body}"),
            Self::Network(msg) => write!(f, "network error: {msg}"),
            Self::Malformed(msg) => write!(f, "malformed response: {msg}"),
            Self::EmptyReply => f.write_str("response has no content"),
        }
    }
}

impl std::error::Error for LlmError {}
