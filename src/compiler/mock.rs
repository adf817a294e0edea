//! Mock compiler for pipeline testing
//!
//! Writes a small placeholder file per format instead of rendering real
//! geometry. The placeholder embeds a digest of the script, so different
//! scripts produce different artifact checksums. Failures can be primed per
//! format or keyed on script content.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use super::{CompileOutput, GeometryCompiler, MeshFormat};
use crate::error::CompilationError;

/// Canned failure returned by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockFailure {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl MockFailure {
    pub fn new(exit_code: i32, stdout: &str, stderr: &str) -> Self {
        Self {
            exit_code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    calls: HashMap<MeshFormat, usize>,
    format_failures: HashMap<MeshFormat, MockFailure>,
    content_failures: Vec<(String, MockFailure)>,
}

/// Compiler that never launches a process
#[derive(Debug, Default)]
pub struct MockCompiler {
    state: Mutex<MockState>,
}

impl MockCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every compile into `format`
    pub fn fail_format(&self, format: MeshFormat, failure: MockFailure) {
        self.lock().format_failures.insert(format, failure);
    }

    /// Fail any compile whose script contains `needle`
    pub fn fail_when_script_contains(&self, needle: &str, failure: MockFailure) {
        self.lock()
            .content_failures
            .push((needle.to_string(), failure));
    }

    /// Remove all primed failures
    pub fn clear_failures(&self) {
        let mut state = self.lock();
        state.format_failures.clear();
        state.content_failures.clear();
    }

    /// Number of compile calls for `format`, failed ones included
    pub fn calls(&self, format: MeshFormat) -> usize {
        self.lock().calls.get(&format).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.lock().calls.values().sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // A panicking test thread must not wedge the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn placeholder(format: MeshFormat, digest: &str) -> String {
        match format {
            MeshFormat::Stl => format!(
                "solid scadforge_mock\n  facet normal 0 0 1\n    outer loop\n      vertex 0 0 0\n      vertex 1 0 0\n      vertex 0 1 0\n    endloop\n  endfacet\nendsolid scadforge_mock\n// {}\n",
                digest
            ),
            MeshFormat::Off => format!("OFF\n3 1 0\n0 0 0\n1 0 0\n0 1 0\n3 0 1 2\n# {}\n", digest),
            MeshFormat::ThreeMf | MeshFormat::Amf => {
                format!("scadforge mock {} archive {}\n", format, digest)
            }
        }
    }
}

impl GeometryCompiler for MockCompiler {
    fn name(&self) -> &str {
        "mock"
    }

    fn compile(
        &self,
        script_path: &Path,
        output_path: &Path,
    ) -> Result<CompileOutput, CompilationError> {
        let start = Instant::now();
        let format = MeshFormat::from_path(output_path).unwrap_or(MeshFormat::PREVIEW);

        let script = fs::read_to_string(script_path).map_err(|e| CompilationError::Io {
            path: script_path.to_path_buf(),
            source: e,
        })?;

        let failure = {
            let mut state = self.lock();
            *state.calls.entry(format).or_insert(0) += 1;
            state.format_failures.get(&format).cloned().or_else(|| {
                state
                    .content_failures
                    .iter()
                    .find(|(needle, _)| script.contains(needle.as_str()))
                    .map(|(_, failure)| failure.clone())
            })
        };

        if let Some(failure) = failure {
            return Err(CompilationError::Failed {
                format,
                exit_code: Some(failure.exit_code),
                stdout: failure.stdout,
                stderr: failure.stderr,
            });
        }

        let digest = format!("{:x}", Sha256::digest(script.as_bytes()));
        fs::write(output_path, Self::placeholder(format, &digest)).map_err(|e| {
            CompilationError::Io {
                path: output_path.to_path_buf(),
                source: e,
            }
        })?;

        Ok(CompileOutput {
            stdout: String::new(),
            stderr: format!("Mock render of {} finished\n", format),
            elapsed: start.elapsed(),
        })
    }
}
