//! Error handling for Scadforge
//!
//! Collaborator failures are surfaced once, verbatim, to the caller. Nothing
//! here is retried automatically; `is_retryable` only tells the user whether
//! trying the same action again is likely to help.

use std::path::PathBuf;

use thiserror::Error;

use crate::compiler::MeshFormat;

/// Result type alias for Scadforge operations
pub type Result<T> = std::result::Result<T, ForgeError>;

/// Failure of the text-generation collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Authentication rejected by the generation API: {message}")]
    Authentication { message: String },

    #[error("Rate limited by the generation API: {message}")]
    RateLimited { message: String },

    #[error("Generation request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("Transport error talking to {endpoint}: {message}")]
    Transport { endpoint: String, message: String },

    #[error("Generation API returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response from the generation API: {reason}")]
    MalformedResponse { reason: String },

    #[error("Generation API returned an empty script")]
    EmptyResponse,

    #[error("Text generation unavailable: {reason}")]
    Unavailable { reason: String },
}

impl GenerationError {
    /// Whether a manual retry of the same prompt has a reasonable chance
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationError::RateLimited { .. }
                | GenerationError::Timeout { .. }
                | GenerationError::Transport { .. }
        )
    }
}

/// Failure of the geometry-compilation collaborator
#[derive(Error, Debug)]
pub enum CompilationError {
    #[error("Compiler exited with {} while producing {format}", describe_exit(.exit_code))]
    Failed {
        format: MeshFormat,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("Failed to launch compiler '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Compiler reported success but wrote no output at {path}")]
    MissingOutput { path: PathBuf },

    #[error("Compilation file error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl CompilationError {
    /// Exit status of the compiler, when it ran and exited
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            CompilationError::Failed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }

    /// Captured standard output of a failed run
    pub fn stdout(&self) -> Option<&str> {
        match self {
            CompilationError::Failed { stdout, .. } => Some(stdout),
            _ => None,
        }
    }

    /// Captured standard error of a failed run
    pub fn stderr(&self) -> Option<&str> {
        match self {
            CompilationError::Failed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// Main error type for Scadforge operations
#[derive(Error, Debug)]
pub enum ForgeError {
    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Compilation failed: {0}")]
    Compilation(#[from] CompilationError),

    // Session Errors
    #[error("Turn not found: {turn_id}")]
    TurnNotFound { turn_id: String },

    #[error("Turn {turn_id} is a user prompt and holds no script")]
    NotAnAssistantTurn { turn_id: String },

    #[error("Invalid parameter {param} = {value}: {expected}")]
    InvalidParameter {
        param: String,
        value: String,
        expected: String,
    },

    // Configuration Errors
    #[error("Invalid configuration {key}={value}: {reason}")]
    InvalidConfig {
        key: String,
        value: String,
        reason: String,
    },

    // Workspace Errors
    #[error("Failed to create workspace at {path}: {source}")]
    WorkspaceCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to export {path}: {source}")]
    ExportError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ForgeError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            ForgeError::Generation(GenerationError::Authentication { .. }) => "GENERATION_AUTH",
            ForgeError::Generation(GenerationError::RateLimited { .. }) => "GENERATION_RATE_LIMIT",
            ForgeError::Generation(_) => "GENERATION_ERROR",
            ForgeError::Compilation(CompilationError::Failed { .. }) => "COMPILATION_FAILED",
            ForgeError::Compilation(CompilationError::Launch { .. }) => "COMPILER_NOT_FOUND",
            ForgeError::Compilation(_) => "COMPILATION_ERROR",
            ForgeError::TurnNotFound { .. } => "TURN_NOT_FOUND",
            ForgeError::NotAnAssistantTurn { .. } => "NOT_AN_ASSISTANT_TURN",
            ForgeError::InvalidParameter { .. } => "INVALID_PARAMETER",
            ForgeError::InvalidConfig { .. } => "INVALID_CONFIG",
            ForgeError::WorkspaceCreate { .. } => "WORKSPACE_ERROR",
            ForgeError::ExportError { .. } => "EXPORT_ERROR",
            ForgeError::Io(_) => "IO_ERROR",
            ForgeError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Returns true if repeating the action unchanged may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ForgeError::Generation(err) => err.is_retryable(),
            _ => false,
        }
    }

    /// Returns a user-friendly recovery suggestion.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            ForgeError::Generation(GenerationError::Authentication { .. }) => {
                Some("Check that OPENAI_API_KEY holds a valid key.")
            }
            ForgeError::Generation(GenerationError::RateLimited { .. }) => {
                Some("Wait a moment before sending the prompt again.")
            }
            ForgeError::Generation(GenerationError::Unavailable { .. }) => {
                Some("Rebuild with `--features openai` or run with --mock.")
            }
            ForgeError::Generation(GenerationError::EmptyResponse) => {
                Some("Rephrase the prompt with more detail about the object.")
            }
            ForgeError::Compilation(CompilationError::Failed { .. }) => {
                Some("Ask for a corrected model or edit the parameters back.")
            }
            ForgeError::Compilation(CompilationError::Launch { .. }) => {
                Some("Install OpenSCAD or point SCADFORGE_OPENSCAD at the binary.")
            }
            ForgeError::TurnNotFound { .. } | ForgeError::NotAnAssistantTurn { .. } => {
                Some("Generate a model before editing its parameters.")
            }
            ForgeError::InvalidParameter { .. } => {
                Some("Use one of the listed parameter names with a non-negative number.")
            }
            _ => None,
        }
    }
}
