//! OpenSCAD command-line compiler
//!
//! Runs `openscad -o <output> <input>` and captures both streams.

use std::path::Path;
use std::process::Command;
use std::time::Instant;

use super::{CompileOutput, GeometryCompiler, MeshFormat};
use crate::config::Config;
use crate::error::CompilationError;

/// Default program name, resolved through `PATH`
pub const DEFAULT_PROGRAM: &str = "openscad";

/// Compiler backed by the OpenSCAD binary
#[derive(Debug, Clone)]
pub struct OpenScadCompiler {
    program: String,
    extra_args: Vec<String>,
}

impl OpenScadCompiler {
    /// Create a compiler for the configured program
    pub fn from_config(config: &Config) -> Self {
        Self::with_program(config.openscad.as_str())
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
        }
    }

    /// Extra arguments placed before `-o`, e.g. `--backend=manifold`
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self, script_path: &Path, output_path: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.extra_args)
            .arg("-o")
            .arg(output_path)
            .arg(script_path);
        cmd
    }
}

impl Default for OpenScadCompiler {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl GeometryCompiler for OpenScadCompiler {
    fn name(&self) -> &str {
        "openscad"
    }

    fn compile(
        &self,
        script_path: &Path,
        output_path: &Path,
    ) -> Result<CompileOutput, CompilationError> {
        let format = MeshFormat::from_path(output_path).unwrap_or(MeshFormat::PREVIEW);
        let start = Instant::now();

        tracing::debug!(
            program = %self.program,
            input = %script_path.display(),
            output = %output_path.display(),
            "running compiler"
        );

        let output = self
            .command(script_path, output_path)
            .output()
            .map_err(|e| CompilationError::Launch {
                program: self.program.clone(),
                source: e,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            tracing::warn!(
                %format,
                exit_code = ?output.status.code(),
                "compiler failed"
            );
            return Err(CompilationError::Failed {
                format,
                exit_code: output.status.code(),
                stdout,
                stderr,
            });
        }

        if !output_path.exists() {
            return Err(CompilationError::MissingOutput {
                path: output_path.to_path_buf(),
            });
        }

        Ok(CompileOutput {
            stdout,
            stderr,
            elapsed: start.elapsed(),
        })
    }
}
