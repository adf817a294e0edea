//! Text generator interfaces and implementations
//!
//! This module provides:
//! - `TextGenerator` trait for all script-producing backends
//! - `OpenAiGenerator`, the chat-completions client
//! - `CachedGenerator`, a memoizing wrapper
//! - `MockGenerator` for testing

mod cache;
mod mock;
mod model;
mod openai;
mod prompt;

pub use cache::{CacheStats, CachedGenerator, DEFAULT_CACHE_CAPACITY};
pub use mock::{MockGenerator, MOCK_DEFAULT_SCRIPT};
pub use model::{ChatMessage, ChatRole, GenerationRequest, TextGenerator};
pub use openai::{OpenAiGenerator, DEFAULT_API_BASE, DEFAULT_TIMEOUT_MS};
pub use prompt::{clean_reply, DEFAULT_SYSTEM_PROMPT};
