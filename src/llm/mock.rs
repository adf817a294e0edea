//! Mock text generator for pipeline testing
//!
//! Replies come from a queue (or a fixed fallback) instead of a model. Every
//! request is recorded so tests can inspect what the orchestrator sent.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::model::{GenerationRequest, TextGenerator};
use crate::error::GenerationError;

/// Script returned when nothing was queued
pub const MOCK_DEFAULT_SCRIPT: &str = "// Mock parametric box\n\
width = 40;\n\
depth = 30;\n\
height = 20;\n\
wall = 2;\n\
difference() {\n    cube([width, depth, height]);\n    translate([wall, wall, wall])\n        cube([width - 2 * wall, depth - 2 * wall, height]);\n}\n";

#[derive(Debug, Default)]
struct MockState {
    replies: VecDeque<Result<String, GenerationError>>,
    requests: Vec<GenerationRequest>,
}

/// Generator with scripted replies
#[derive(Debug)]
pub struct MockGenerator {
    fallback: Option<String>,
    state: Mutex<MockState>,
}

impl MockGenerator {
    /// Mock that answers every prompt with `MOCK_DEFAULT_SCRIPT`
    pub fn new() -> Self {
        Self::with_fallback(MOCK_DEFAULT_SCRIPT)
    }

    /// Mock that answers with `reply` once the queue is empty
    pub fn with_fallback(reply: &str) -> Self {
        Self {
            fallback: Some(reply.to_string()),
            state: Mutex::new(MockState::default()),
        }
    }

    /// Mock that only answers from its queue
    pub fn scripted<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mock = Self {
            fallback: None,
            state: Mutex::new(MockState::default()),
        };
        for reply in replies {
            mock.push_reply(reply);
        }
        mock
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.lock().replies.push_back(Ok(reply.into()));
    }

    pub fn push_failure(&self, error: GenerationError) {
        self.lock().replies.push_back(Err(error));
    }

    /// Requests seen so far, oldest first
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.lock().requests.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().requests.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TextGenerator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let mut state = self.lock();
        state.requests.push(request.clone());

        match state.replies.pop_front() {
            Some(reply) => reply,
            None => self.fallback.clone().ok_or_else(|| GenerationError::Unavailable {
                reason: "mock generator has no reply queued".to_string(),
            }),
        }
    }
}
