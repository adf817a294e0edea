//! Compiled mesh handles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::MeshFormat;
use crate::error::CompilationError;

/// Handle to one compiled output file
///
/// A fresh handle (new id, new path) is minted every time a script is
/// compiled; handles are never reused across script versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshArtifact {
    /// Unique handle id
    pub id: Uuid,

    /// Output format
    pub format: MeshFormat,

    /// Location inside the session workspace
    pub path: PathBuf,

    /// File size in bytes
    pub size_bytes: u64,

    /// SHA-256 of the file contents
    pub sha256: String,

    /// When the compiler produced it
    pub created_at: DateTime<Utc>,
}

impl MeshArtifact {
    /// Describe a freshly written output file
    pub fn from_file(id: Uuid, format: MeshFormat, path: &Path) -> Result<Self, CompilationError> {
        let content = fs::read(path).map_err(|e| CompilationError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let hash = Sha256::digest(&content);

        Ok(Self {
            id,
            format,
            path: path.to_path_buf(),
            size_bytes: content.len() as u64,
            sha256: format!("{:x}", hash),
            created_at: Utc::now(),
        })
    }

    /// Suggested name when exporting, e.g. `model.stl`
    pub fn download_name(&self, stem: &str) -> String {
        format!("{}.{}", stem, self.format.extension())
    }
}
