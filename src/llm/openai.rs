//! OpenAI chat-completions backend
//!
//! Sends the conversation to `{api_base}/chat/completions` with a blocking
//! client and returns the first choice's message content. Compiled in with
//! the `openai` feature; without it every call reports the backend as
//! unavailable.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::model::{ChatMessage, GenerationRequest, TextGenerator};
use crate::config::Config;
use crate::error::GenerationError;

/// Default API root
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Default request timeout (reasoning models can take a while)
pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;

/// Request body for the chat-completions endpoint
#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_completion_tokens: u32,
}

/// Response from the chat-completions endpoint
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(any(feature = "openai", test))]
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[cfg(any(feature = "openai", test))]
#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Real OpenAI backend
pub struct OpenAiGenerator {
    api_key: Option<String>,
    api_base: String,
    timeout_ms: u64,
}

impl OpenAiGenerator {
    /// Create a generator from validated configuration
    pub fn from_config(config: &Config) -> Self {
        Self::with_config(config.api_key.clone(), config.api_base.clone(), config.timeout_ms)
    }

    /// Create a new instance with custom configuration
    pub fn with_config(api_key: Option<String>, api_base: String, timeout_ms: u64) -> Self {
        Self {
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            timeout_ms,
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }

    /// Send request to the API
    #[cfg(feature = "openai")]
    fn send_request(&self, body: &ChatCompletionBody<'_>) -> Result<ChatCompletionResponse, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| GenerationError::Authentication {
                message: "OPENAI_API_KEY is not set".to_string(),
            })?;

        let endpoint = self.endpoint();
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .build()
            .map_err(|e| GenerationError::Transport {
                endpoint: endpoint.clone(),
                message: e.to_string(),
            })?;

        let response = client
            .post(&endpoint)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout {
                        timeout_ms: self.timeout_ms,
                    }
                } else {
                    GenerationError::Transport {
                        endpoint: endpoint.clone(),
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(classify_status(status.as_u16(), api_error_message(&text)));
        }

        response
            .json::<ChatCompletionResponse>()
            .map_err(|e| GenerationError::MalformedResponse {
                reason: e.to_string(),
            })
    }

    #[cfg(not(feature = "openai"))]
    fn send_request(&self, _body: &ChatCompletionBody<'_>) -> Result<ChatCompletionResponse, GenerationError> {
        Err(GenerationError::Unavailable {
            reason: "OpenAI support not compiled. Build with --features openai".to_string(),
        })
    }
}

impl Default for OpenAiGenerator {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl TextGenerator for OpenAiGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    fn cache_namespace(&self) -> String {
        // Key fingerprint only; the key itself never leaves this struct
        let key_digest = self
            .api_key
            .as_deref()
            .map(|k| format!("{:x}", Sha256::digest(k.as_bytes())))
            .unwrap_or_default();
        let short = key_digest.get(..12).unwrap_or("");
        format!("openai:{}:{}", self.api_base, short)
    }

    fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let body = ChatCompletionBody {
            model: &request.model,
            messages: &request.messages,
            max_completion_tokens: request.max_tokens,
        };

        tracing::debug!(
            endpoint = %self.endpoint(),
            model = %request.model,
            messages = request.messages.len(),
            "sending chat completion"
        );

        let response = self.send_request(&body)?;
        first_choice_content(response)
    }
}

fn first_choice_content(response: ChatCompletionResponse) -> Result<String, GenerationError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| GenerationError::MalformedResponse {
            reason: "response contained no choices".to_string(),
        })?;

    if choice.finish_reason.as_deref() == Some("length") {
        tracing::warn!("completion hit the token ceiling; script may be truncated");
    }

    choice
        .message
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or(GenerationError::EmptyResponse)
}

#[cfg(any(feature = "openai", test))]
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[cfg(any(feature = "openai", test))]
fn classify_status(status: u16, message: String) -> GenerationError {
    match status {
        401 | 403 => GenerationError::Authentication { message },
        429 => GenerationError::RateLimited { message },
        _ => GenerationError::Api { status, message },
    }
}
