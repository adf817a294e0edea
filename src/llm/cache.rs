//! Content-addressed memoization of generation requests
//!
//! Wraps any `TextGenerator`. The key is the SHA-256 of the inner
//! generator's cache namespace plus the JSON-serialized request, so the
//! same conversation against the same endpoint and credentials is answered
//! from memory. Only successful completions are stored.

use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use super::model::{GenerationRequest, TextGenerator};
use crate::error::GenerationError;

/// Default number of cached completions
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub evictions: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, String>,
    /// Insertion order, oldest first
    order: VecDeque<String>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// Memoizing wrapper around a generator
pub struct CachedGenerator<G: TextGenerator> {
    inner: G,
    capacity: usize,
    state: Mutex<CacheState>,
}

impl<G: TextGenerator> CachedGenerator<G> {
    pub fn new(inner: G) -> Self {
        Self::with_capacity(inner, DEFAULT_CACHE_CAPACITY)
    }

    /// A capacity of zero disables caching
    pub fn with_capacity(inner: G, capacity: usize) -> Self {
        Self {
            inner,
            capacity,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    pub fn into_inner(self) -> G {
        self.inner
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            entries: state.entries.len(),
            evictions: state.evictions,
        }
    }

    /// Drop every cached completion
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.order.clear();
    }

    /// Cache key for a request
    pub fn key_for(&self, request: &GenerationRequest) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.inner.cache_namespace().as_bytes());
        hasher.update([0u8]);
        // Serializing plain strings and integers cannot fail
        hasher.update(serde_json::to_vec(request).unwrap_or_default());
        format!("{:x}", hasher.finalize())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn store(&self, key: String, value: String) {
        if self.capacity == 0 {
            return;
        }

        let mut state = self.lock();
        if state.entries.contains_key(&key) {
            return;
        }
        while state.entries.len() >= self.capacity {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            state.entries.remove(&oldest);
            state.evictions += 1;
        }
        state.order.push_back(key.clone());
        state.entries.insert(key, value);
    }
}

impl<G: TextGenerator> TextGenerator for CachedGenerator<G> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn cache_namespace(&self) -> String {
        self.inner.cache_namespace()
    }

    fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let key = self.key_for(request);

        {
            let mut state = self.lock();
            if let Some(hit) = state.entries.get(&key).cloned() {
                state.hits += 1;
                tracing::debug!(key = %&key[..12], "generation cache hit");
                return Ok(hit);
            }
            state.misses += 1;
        }

        // Lock released while the collaborator runs
        let reply = self.inner.complete(request)?;
        self.store(key, reply.clone());
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatMessage, MockGenerator};

    fn request(prompt: &str) -> GenerationRequest {
        GenerationRequest::new("o4-mini", 4500)
            .with_message(ChatMessage::system("sys"))
            .with_message(ChatMessage::user(prompt))
    }

    #[test]
    fn test_hit_skips_inner_call() {
        let cache = CachedGenerator::new(MockGenerator::with_fallback("cube(1);"));

        assert_eq!(cache.complete(&request("a cube")).unwrap(), "cube(1);");
        assert_eq!(cache.complete(&request("a cube")).unwrap(), "cube(1);");

        assert_eq!(cache.inner().call_count(), 1);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
    }

    #[test]
    fn test_history_is_part_of_key() {
        let cache = CachedGenerator::new(MockGenerator::new());
        let first = request("bigger");
        let with_history = GenerationRequest::new("o4-mini", 4500)
            .with_message(ChatMessage::system("sys"))
            .with_message(ChatMessage::user("a cube"))
            .with_message(ChatMessage::assistant("cube(1);"))
            .with_message(ChatMessage::user("bigger"));

        assert_ne!(cache.key_for(&first), cache.key_for(&with_history));
    }

    #[test]
    fn test_failures_not_cached() {
        let mock = MockGenerator::with_fallback("cube(2);");
        mock.push_failure(GenerationError::Timeout { timeout_ms: 10 });
        let cache = CachedGenerator::new(mock);

        assert!(cache.complete(&request("x")).is_err());
        assert_eq!(cache.complete(&request("x")).unwrap(), "cube(2);");
        assert_eq!(cache.inner().call_count(), 2);
    }

    #[test]
    fn test_oldest_entry_evicted() {
        let cache = CachedGenerator::with_capacity(MockGenerator::new(), 2);
        for prompt in ["a", "b", "c"] {
            cache.complete(&request(prompt)).unwrap();
        }
        assert_eq!(cache.stats().entries, 2);
        assert_eq!(cache.stats().evictions, 1);

        // "a" was evicted, "c" is still there
        cache.complete(&request("c")).unwrap();
        cache.complete(&request("a")).unwrap();
        assert_eq!(cache.inner().call_count(), 4);
    }

    #[test]
    fn test_zero_capacity_and_clear() {
        let disabled = CachedGenerator::with_capacity(MockGenerator::new(), 0);
        disabled.complete(&request("a")).unwrap();
        disabled.complete(&request("a")).unwrap();
        assert_eq!(disabled.inner().call_count(), 2);

        let cache = CachedGenerator::new(MockGenerator::new());
        cache.complete(&request("a")).unwrap();
        cache.clear();
        assert_eq!(cache.stats().entries, 0);
    }
}
