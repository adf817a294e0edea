//! Text generator trait and core types
//!
//! Defines the interface every text-generation backend implements.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::GenerationError;

/// Who authored a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One role/content pair sent to the generator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A complete generation request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model identifier, e.g. "o4-mini"
    pub model: String,

    /// Ordered conversation, system instruction first
    pub messages: Vec<ChatMessage>,

    /// Ceiling on generated tokens
    pub max_tokens: u32,
}

impl GenerationRequest {
    pub fn new(model: &str, max_tokens: u32) -> Self {
        Self {
            model: model.to_string(),
            messages: Vec::new(),
            max_tokens,
        }
    }

    pub fn with_message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_messages<I: IntoIterator<Item = ChatMessage>>(mut self, messages: I) -> Self {
        self.messages.extend(messages);
        self
    }

    /// Content of the final user message, if any
    pub fn last_user_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
    }
}

/// Trait implemented by all text-generation backends
///
/// Calls are synchronous and run to completion. Implementations must not
/// retry on their own.
pub trait TextGenerator {
    /// Short backend name used in logs
    fn name(&self) -> &str;

    /// Identifies everything besides the request that changes the answer
    /// (endpoint, credentials). Used to partition cached responses.
    fn cache_namespace(&self) -> String {
        self.name().to_string()
    }

    /// Produce a completion for the request
    fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

impl<T: TextGenerator + ?Sized> TextGenerator for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn cache_namespace(&self) -> String {
        (**self).cache_namespace()
    }

    fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        (**self).complete(request)
    }
}
