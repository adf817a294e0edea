//! Scadforge - conversational OpenSCAD model generation
//!
//! A text prompt goes to a chat-completion model that answers with an
//! OpenSCAD script. The script is compiled to mesh files by the `openscad`
//! binary, and its top-level numeric assignments are exposed as editable
//! parameters that can be patched back into the script and recompiled.
//!
//! # Architecture
//!
//! - [`script`]: extracting and patching `name = number;` parameters
//! - [`llm`]: text generators (OpenAI-compatible, mock, cached)
//! - [`compiler`]: geometry compilers and mesh artifacts
//! - [`session`]: transcript, workspace and the orchestrator tying them together

pub mod cli;
pub mod compiler;
pub mod config;
pub mod error;
pub mod llm;
pub mod script;
pub mod session;

pub use config::Config;
pub use error::{CompilationError, ForgeError, GenerationError, Result};
pub use script::{apply_parameters, extract_parameters, Parameter, ParameterSet, ScriptText};
pub use session::{Orchestrator, OrchestratorConfig, Transcript, TurnId, Workspace};
