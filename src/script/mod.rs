//! OpenSCAD script text and its editable parameters
//!
//! This module provides:
//! - `ScriptText`, an immutable version of a generated script
//! - `ParameterSet`, the ordered `name = number;` values found in a script
//! - `extract_parameters` / `apply_parameters`, the line-oriented round trip

mod assignment;
mod extract;
mod parameters;
mod patch;

pub use extract::extract_parameters;
pub use parameters::{Parameter, ParameterSet};
pub use patch::{apply_parameters, format_value, is_writable, validate_edits};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// One immutable version of a procedural-model script
///
/// Cloning is cheap; a changed script is always a new value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScriptText(Arc<str>);

impl ScriptText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(Arc::from(text.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Number of lines, counting a final unterminated line
    pub fn line_count(&self) -> usize {
        self.0.lines().count()
    }
}

impl fmt::Display for ScriptText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ScriptText {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&str> for ScriptText {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl AsRef<str> for ScriptText {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

// Serialized as a plain string.
impl Serialize for ScriptText {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ScriptText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}
