use exn::ResultExt;
use isahc::{AsyncReadResponseExt, HttpClient, Request};
use serde::{Deserialize, Serialize};

use crate::{Completion, GenOptions, LlmError, Provider};

const BASE_URL: &str = "https://api.openai.com/v1";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// `OpenAI` chat completions backend.
///
/// Also works against any OpenAI-compatible endpoint via
/// [`OpenAi::with_base_url`].
pub struct OpenAi {
    client: HttpClient,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Debug)]
pub enum Error {
    Network(String),
    MissingApiKey,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "Network error: {msg}"),
            Self::MissingApiKey => write!(f, "Missing API key"),
        }
    }
}

impl std::error::Error for Error {}

impl OpenAi {
    /// Create a new backend. The key is not validated until the first call.
    pub fn new(api_key: &str, model: &str) -> exn::Result<Self, Error> {
        if api_key.trim().is_empty() {
            exn::bail!(Error::MissingApiKey);
        }
        let client = HttpClient::new().or_raise(|| Error::Network("create HTTP client".into()))?;
        Ok(Self {
            client,
            api_key: api_key.trim().to_owned(),
            model: model.to_owned(),
            base_url: BASE_URL.to_owned(),
        })
    }

    /// Point the backend at another OpenAI-compatible API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        base_url.trim_end_matches('/').clone_into(&mut self.base_url);
        self
    }
}

impl Provider for OpenAi {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "openai"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn complete<'a>(&'a self, prompt: &'a str, options: &'a GenOptions) -> Completion<'a> {
        Box::pin(async move {
            let body = ChatRequest {
                model: &self.model,
                messages: [WireMessage {
                    role: "user",
                    content: prompt,
                }],
                max_tokens: options.max_tokens,
                temperature: options.temperature,
            };
            let json_body = serde_json::to_vec(&body)
                .or_raise(|| LlmError::Network("serialize chat request".into()))?;

            tracing::debug!(
                model = %self.model,
                prompt_len = prompt.len(),
                max_tokens = options.max_tokens,
                "sending chat completion request"
            );

            let request = Request::post(format!("{}/chat/completions", self.base_url))
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .body(json_body)
                .or_raise(|| LlmError::Network("build HTTP request".into()))?;
            let mut response = self
                .client
                .send_async(request)
                .await
                .or_raise(|| LlmError::Network("send HTTP request".into()))?;

            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .or_raise(|| LlmError::Network("read response body".into()))?;

            tracing::debug!(status, bytes = body.len(), "chat completion response");
            parse_completion(status, &body)
        })
    }
}

/// Interpret a chat completion HTTP response.
///
/// An `error` member anywhere at the top level of the body is a failure no
/// matter what the status says.
pub fn parse_completion(status: u16, body: &str) -> exn::Result<String, LlmError> {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        if let Some(error) = envelope.error.filter(|e| !e.is_null()) {
            let message = error
                .get("message")
                .and_then(serde_json::Value::as_str)
                .map_or_else(|| error.to_string(), str::to_owned);
            tracing::warn!(status, %message, "chat completion API error");
            exn::bail!(LlmError::Api {
                status,
                body: message,
            });
        }
    }

    if !(200..300).contains(&status) {
        tracing::warn!(status, "chat completion API error");
        exn::bail!(LlmError::Api {
            status,
            body: body.to_owned(),
        });
    }

    let reply: ChatResponse = serde_json::from_str(body)
        .or_raise(|| LlmError::Malformed("parse chat completion JSON".into()))?;

    reply
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_owned())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| LlmError::EmptyReply.into())
}

// -- Wire types (OpenAI chat completions format) ----------------------------

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [WireMessage<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}
