//! Geometry compiler interfaces and implementations
//!
//! This module provides:
//! - `GeometryCompiler` trait for anything that turns a script file into a mesh file
//! - `OpenScadCompiler`, which shells out to the `openscad` binary
//! - `MockCompiler` for tests and offline runs
//! - Mesh formats and artifact handles

mod artifact;
mod format;
mod mock;
mod openscad;

pub use artifact::MeshArtifact;
pub use format::{parse_format_list, MeshFormat};
pub use mock::{MockCompiler, MockFailure};
pub use openscad::{OpenScadCompiler, DEFAULT_PROGRAM};

use crate::error::CompilationError;
use std::path::Path;
use std::time::Duration;

/// What a successful compiler run reported
#[derive(Debug, Clone, Default)]
pub struct CompileOutput {
    /// Captured standard output
    pub stdout: String,

    /// Captured standard error (OpenSCAD writes progress and warnings here)
    pub stderr: String,

    /// Wall-clock time of the run
    pub elapsed: Duration,
}

impl CompileOutput {
    /// Lines of compiler output that look like warnings
    pub fn warnings(&self) -> Vec<&str> {
        self.stdout
            .lines()
            .chain(self.stderr.lines())
            .filter(|line| line.trim_start().to_ascii_uppercase().starts_with("WARNING"))
            .collect()
    }
}

/// Trait implemented by geometry compilers
///
/// One call compiles one script into one output file. The extension of
/// `output_path` selects the format. Implementations run to completion
/// before returning.
pub trait GeometryCompiler {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Compile `script_path` into `output_path`
    fn compile(
        &self,
        script_path: &Path,
        output_path: &Path,
    ) -> Result<CompileOutput, CompilationError>;
}

impl<T: GeometryCompiler + ?Sized> GeometryCompiler for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn compile(
        &self,
        script_path: &Path,
        output_path: &Path,
    ) -> Result<CompileOutput, CompilationError> {
        (**self).compile(script_path, output_path)
    }
}
