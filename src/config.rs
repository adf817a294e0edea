//! Runtime configuration
//!
//! Read from the process environment with defaults for everything except
//! the API key.

use serde::Serialize;
use std::env;

use crate::compiler::{parse_format_list, MeshFormat, DEFAULT_PROGRAM};
use crate::error::{ForgeError, Result};
use crate::llm::{DEFAULT_API_BASE, DEFAULT_CACHE_CAPACITY, DEFAULT_SYSTEM_PROMPT, DEFAULT_TIMEOUT_MS};

/// Default model name
pub const DEFAULT_MODEL: &str = "o4-mini";

/// Default completion token ceiling
pub const DEFAULT_MAX_TOKENS: u32 = 4500;

/// Effective configuration
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Bearer token for the generation API
    #[serde(serialize_with = "redact")]
    pub api_key: Option<String>,

    /// API root, without trailing slash
    pub api_base: String,

    /// Model name
    pub model: String,

    /// Completion token ceiling
    pub max_tokens: u32,

    /// HTTP timeout in milliseconds
    pub timeout_ms: u64,

    /// Compiler program
    pub openscad: String,

    /// Formats compiled for new prompts, in order
    pub formats: Vec<MeshFormat>,

    /// Generation cache size (0 disables)
    pub cache_capacity: usize,

    /// Instruction sent ahead of every conversation
    #[serde(skip)]
    pub system_prompt: String,
}

fn redact<S: serde::Serializer>(key: &Option<String>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match key {
        Some(_) => serializer.serialize_some("<redacted>"),
        None => serializer.serialize_none(),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            openscad: DEFAULT_PROGRAM.to_string(),
            formats: MeshFormat::DEFAULT_SET.to_vec(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl Config {
    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from any key → value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        config.api_key = get("OPENAI_API_KEY");
        if let Some(base) = get("SCADFORGE_API_BASE") {
            config.api_base = base.trim_end_matches('/').to_string();
        }
        if let Some(model) = get("SCADFORGE_MODEL") {
            config.model = model;
        }
        if let Some(raw) = get("SCADFORGE_MAX_TOKENS") {
            config.max_tokens = parse_number("SCADFORGE_MAX_TOKENS", &raw)?;
        }
        if let Some(raw) = get("SCADFORGE_TIMEOUT_MS") {
            config.timeout_ms = parse_number("SCADFORGE_TIMEOUT_MS", &raw)?;
        }
        if let Some(program) = get("SCADFORGE_OPENSCAD") {
            config.openscad = program;
        }
        if let Some(raw) = get("SCADFORGE_FORMATS") {
            config.formats = parse_formats("SCADFORGE_FORMATS", &raw)?;
        }
        if let Some(raw) = get("SCADFORGE_CACHE_CAPACITY") {
            config.cache_capacity = parse_number("SCADFORGE_CACHE_CAPACITY", &raw)?;
        }

        Ok(config)
    }

    /// Override the format list, e.g. from command-line flags
    pub fn with_formats(mut self, formats: Vec<MeshFormat>) -> Self {
        if !formats.is_empty() {
            self.formats = formats;
        }
        self
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| ForgeError::InvalidConfig {
        key: key.to_string(),
        value: raw.to_string(),
        reason: "expected a non-negative integer".to_string(),
    })
}

fn parse_formats(key: &str, raw: &str) -> Result<Vec<MeshFormat>> {
    let formats = parse_format_list(raw).map_err(|_| ForgeError::InvalidConfig {
        key: key.to_string(),
        value: raw.to_string(),
        reason: "expected a comma separated list of stl, 3mf, off, amf".to_string(),
    })?;
    if formats.is_empty() {
        return Err(ForgeError::InvalidConfig {
            key: key.to_string(),
            value: raw.to_string(),
            reason: "at least one format is required".to_string(),
        });
    }
    Ok(formats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.model, "o4-mini");
        assert_eq!(config.max_tokens, 4500);
        assert_eq!(config.formats, vec![MeshFormat::Stl, MeshFormat::ThreeMf]);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("SCADFORGE_API_BASE", "http://localhost:8080/v1/"),
            ("SCADFORGE_MAX_TOKENS", "2000"),
            ("SCADFORGE_FORMATS", "stl"),
            ("SCADFORGE_CACHE_CAPACITY", "0"),
        ]))
        .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.api_base, "http://localhost:8080/v1");
        assert_eq!(config.max_tokens, 2000);
        assert_eq!(config.formats, vec![MeshFormat::Stl]);
        assert_eq!(config.cache_capacity, 0);
    }

    #[test]
    fn test_invalid_values() {
        let err = Config::from_lookup(lookup(&[("SCADFORGE_MAX_TOKENS", "lots")])).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");

        let err = Config::from_lookup(lookup(&[("SCADFORGE_FORMATS", "obj")])).unwrap_err();
        assert!(err.to_string().contains("SCADFORGE_FORMATS"));
    }

    #[test]
    fn test_serialized_key_is_redacted() {
        let config = Config::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-secret")])).unwrap();
        let json = serde_json::to_string(&config).unwrap();

        assert!(!json.contains("sk-secret"));
        assert!(json.contains("<redacted>"));
    }
}
