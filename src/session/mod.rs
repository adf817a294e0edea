//! Session state and the orchestrator that drives it
//!
//! A session is a transcript of prompt/result turns, a workspace directory
//! holding every file the session wrote, and an orchestrator sequencing the
//! generator and compiler against both.

mod orchestrator;
mod transcript;
mod workspace;

pub use orchestrator::{Orchestrator, OrchestratorConfig, OrchestratorState};
pub use transcript::{AssistantTurn, Transcript, Turn, TurnId, TurnKind};
pub use workspace::{Workspace, WorkspaceUsage, SCRIPT_EXTENSION};
