//! Conversation transcript
//!
//! An append-only log of turns for one session. Assistant turns own their
//! script, the parameters derived from it and the compiled artifacts.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::compiler::{MeshArtifact, MeshFormat};
use crate::llm::ChatMessage;
use crate::script::{extract_parameters, ParameterSet, ScriptText};

/// Identifier of a turn within a transcript
pub type TurnId = Uuid;

/// Result half of an exchange: a script and what it compiled to
///
/// The parameter set is always re-derived from the script; there is no way
/// to set one without the other.
#[derive(Debug, Clone, Serialize)]
pub struct AssistantTurn {
    script: ScriptText,
    parameters: ParameterSet,
    artifacts: BTreeMap<MeshFormat, MeshArtifact>,
    /// Number of parameter-edit regenerations applied
    revision: u32,
}

impl AssistantTurn {
    pub fn new(script: ScriptText, artifacts: BTreeMap<MeshFormat, MeshArtifact>) -> Self {
        let parameters = extract_parameters(&script);
        Self {
            script,
            parameters,
            artifacts,
            revision: 0,
        }
    }

    pub fn script(&self) -> &ScriptText {
        &self.script
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    pub fn artifacts(&self) -> &BTreeMap<MeshFormat, MeshArtifact> {
        &self.artifacts
    }

    pub fn artifact(&self, format: MeshFormat) -> Option<&MeshArtifact> {
        self.artifacts.get(&format)
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Swap in a regenerated script and its recompiled artifact
    ///
    /// Returns the artifact it replaced, if that format existed before.
    pub(crate) fn replace(
        &mut self,
        script: ScriptText,
        artifact: MeshArtifact,
    ) -> Option<MeshArtifact> {
        self.parameters = extract_parameters(&script);
        self.script = script;
        self.revision += 1;
        self.artifacts.insert(artifact.format, artifact)
    }
}

/// What a turn holds
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum TurnKind {
    User { prompt: String },
    Assistant(AssistantTurn),
}

/// One entry in the conversation
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    /// Unique turn ID
    pub id: TurnId,

    /// When the turn was recorded
    pub timestamp: DateTime<Utc>,

    /// Prompt or result
    #[serde(flatten)]
    pub kind: TurnKind,
}

impl Turn {
    pub fn user(prompt: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            kind: TurnKind::User {
                prompt: prompt.to_string(),
            },
        }
    }

    pub fn assistant(result: AssistantTurn) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            kind: TurnKind::Assistant(result),
        }
    }

    pub fn as_assistant(&self) -> Option<&AssistantTurn> {
        match &self.kind {
            TurnKind::Assistant(result) => Some(result),
            TurnKind::User { .. } => None,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self.kind, TurnKind::User { .. })
    }

    /// Render as a chat message for the generator
    pub fn to_message(&self) -> ChatMessage {
        match &self.kind {
            TurnKind::User { prompt } => ChatMessage::user(prompt.as_str()),
            TurnKind::Assistant(result) => ChatMessage::assistant(result.script.as_str()),
        }
    }
}

/// Ordered turns for one session
#[derive(Debug, Clone, Default, Serialize)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self { turns: Vec::new() }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn get(&self, id: TurnId) -> Option<&Turn> {
        self.turns.iter().find(|t| t.id == id)
    }

    /// Most recent assistant turn
    pub fn last_assistant(&self) -> Option<(TurnId, &AssistantTurn)> {
        self.turns
            .iter()
            .rev()
            .find_map(|t| t.as_assistant().map(|a| (t.id, a)))
    }

    /// Prior conversation as role/content pairs, oldest first
    pub fn history(&self) -> Vec<ChatMessage> {
        self.turns.iter().map(Turn::to_message).collect()
    }

    /// Record a completed exchange
    pub(crate) fn push_exchange(&mut self, prompt: &str, result: AssistantTurn) -> TurnId {
        self.turns.push(Turn::user(prompt));
        let turn = Turn::assistant(result);
        let id = turn.id;
        self.turns.push(turn);
        id
    }

    pub(crate) fn get_mut(&mut self, id: TurnId) -> Option<&mut Turn> {
        self.turns.iter_mut().find(|t| t.id == id)
    }
}
