//! Generation orchestrator
//!
//! Sequences one user action at a time: prompt → script → meshes, or
//! edited parameters → patched script → preview mesh. The transcript is
//! passed in explicitly and only touched once every step of the action has
//! succeeded, so a failure leaves it exactly as it was.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use super::transcript::{AssistantTurn, TurnId, TurnKind, Transcript};
use super::workspace::Workspace;
use crate::compiler::{GeometryCompiler, MeshArtifact, MeshFormat};
use crate::config::{Config, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use crate::error::{CompilationError, ForgeError, GenerationError, Result};
use crate::llm::{clean_reply, ChatMessage, GenerationRequest, TextGenerator, DEFAULT_SYSTEM_PROMPT};
use crate::script::{apply_parameters, validate_edits, ParameterSet, ScriptText};

/// Where the orchestrator is in the current action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    /// Nothing has happened yet
    Idle,
    /// Waiting on the text generator
    Generating,
    /// Waiting on the geometry compiler
    Compiling,
    /// Last action succeeded
    Ready,
    /// Last action failed; the transcript is unchanged
    Failed,
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Generating => "generating",
            Self::Compiling => "compiling",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Settings the orchestrator needs per action
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub system_prompt: String,
    pub model: String,
    pub max_tokens: u32,
    /// Formats compiled for a new prompt, in order
    pub formats: Vec<MeshFormat>,
    /// Format recompiled after a parameter edit
    pub preview_format: MeshFormat,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            formats: MeshFormat::DEFAULT_SET.to_vec(),
            preview_format: MeshFormat::PREVIEW,
        }
    }
}

impl From<&Config> for OrchestratorConfig {
    fn from(config: &Config) -> Self {
        Self {
            system_prompt: config.system_prompt.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            formats: config.formats.clone(),
            preview_format: MeshFormat::PREVIEW,
        }
    }
}

/// Drives the generator and compiler for one session
pub struct Orchestrator<G: TextGenerator, C: GeometryCompiler> {
    generator: G,
    compiler: C,
    workspace: Workspace,
    config: OrchestratorConfig,
    state: OrchestratorState,
}

impl<G: TextGenerator, C: GeometryCompiler> Orchestrator<G, C> {
    pub fn new(generator: G, compiler: C, workspace: Workspace, config: OrchestratorConfig) -> Self {
        Self {
            generator,
            compiler,
            workspace,
            config,
            state: OrchestratorState::Idle,
        }
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Build the request for a prompt given the prior conversation
    pub fn build_request(&self, prompt: &str, history: &[ChatMessage]) -> GenerationRequest {
        GenerationRequest::new(&self.config.model, self.config.max_tokens)
            .with_message(ChatMessage::system(self.config.system_prompt.as_str()))
            .with_messages(history.iter().cloned())
            .with_message(ChatMessage::user(prompt))
    }

    /// Ask the generator for a script
    pub fn generate(
        &self,
        prompt: &str,
        history: &[ChatMessage],
    ) -> std::result::Result<ScriptText, GenerationError> {
        let request = self.build_request(prompt, history);
        let reply = self.generator.complete(&request)?;

        let script = clean_reply(&reply);
        if script.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(ScriptText::new(script))
    }

    /// Compile a script into each format, one after another
    ///
    /// On any failure the files this call already produced are deleted and
    /// no handle is returned.
    pub fn compile(
        &self,
        script: &ScriptText,
        formats: &[MeshFormat],
    ) -> std::result::Result<BTreeMap<MeshFormat, MeshArtifact>, CompilationError> {
        self.workspace.compile_script(&self.compiler, script, formats)
    }

    /// Run a new prompt through generation and compilation
    ///
    /// On success the user prompt and the assistant result are appended to
    /// `transcript` and the assistant turn's id is returned.
    pub fn submit_prompt(&mut self, transcript: &mut Transcript, prompt: &str) -> Result<TurnId> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ForgeError::InvalidParameter {
                param: "prompt".to_string(),
                value: "<empty>".to_string(),
                expected: "a description of the object".to_string(),
            });
        }

        let start = Instant::now();
        self.state = OrchestratorState::Generating;
        tracing::debug!(generator = self.generator.name(), history = transcript.len(), "generating");

        let script = match self.generate(prompt, &transcript.history()) {
            Ok(script) => script,
            Err(err) => return Err(self.fail(err.into())),
        };

        self.state = OrchestratorState::Compiling;
        let formats = self.config.formats.clone();
        let artifacts = match self.compile(&script, &formats) {
            Ok(artifacts) => artifacts,
            Err(err) => return Err(self.fail(err.into())),
        };

        let result = AssistantTurn::new(script, artifacts);
        let parameter_count = result.parameters().len();
        let id = transcript.push_exchange(prompt, result);
        self.state = OrchestratorState::Ready;

        tracing::info!(
            turn = %id,
            parameters = parameter_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "model generated"
        );
        Ok(id)
    }

    /// Apply edited parameter values to an existing turn and recompile
    ///
    /// Only the preview format is rebuilt. Other artifacts of the turn keep
    /// the handles from the original generation. The superseded preview and
    /// the script version it was compiled from are removed from the
    /// workspace. On failure the turn is left as it was.
    pub fn regenerate(
        &mut self,
        transcript: &mut Transcript,
        turn_id: TurnId,
        edits: &ParameterSet,
    ) -> Result<MeshArtifact> {
        let current = Self::assistant_turn(transcript, turn_id)?;
        validate_edits(current.parameters(), edits)?;
        let script = apply_parameters(current.script(), edits);

        let start = Instant::now();
        self.state = OrchestratorState::Compiling;
        let preview = self.config.preview_format;

        let mut artifacts = match self.compile(&script, &[preview]) {
            Ok(artifacts) => artifacts,
            Err(err) => return Err(self.fail(err.into())),
        };
        let Some(artifact) = artifacts.remove(&preview) else {
            return Err(self.fail(ForgeError::Compilation(CompilationError::MissingOutput {
                path: self.workspace.path().to_path_buf(),
            })));
        };

        let replaced = match transcript.get_mut(turn_id).map(|t| &mut t.kind) {
            Some(TurnKind::Assistant(result)) => result.replace(script, artifact.clone()),
            _ => None,
        };
        if let Some(old) = replaced {
            self.workspace.discard_artifact(&old);
        }
        self.state = OrchestratorState::Ready;

        tracing::info!(
            turn = %turn_id,
            changed = edits.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "preview regenerated"
        );
        Ok(artifact)
    }

    fn assistant_turn(transcript: &Transcript, turn_id: TurnId) -> Result<&AssistantTurn> {
        let turn = transcript.get(turn_id).ok_or_else(|| ForgeError::TurnNotFound {
            turn_id: turn_id.to_string(),
        })?;
        turn.as_assistant().ok_or_else(|| ForgeError::NotAnAssistantTurn {
            turn_id: turn_id.to_string(),
        })
    }

    fn fail(&mut self, err: ForgeError) -> ForgeError {
        self.state = OrchestratorState::Failed;
        tracing::warn!(code = err.error_code(), "{}", err);
        err
    }
}
