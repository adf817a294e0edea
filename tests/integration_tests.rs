//! Integration Tests
//!
//! End-to-end tests for the prompt → script → mesh pipeline, run against the
//! mock generator and compiler.

use pretty_assertions::assert_eq;
use scadforge::compiler::{MeshFormat, MockCompiler, MockFailure};
use scadforge::llm::{ChatRole, MockGenerator};
use scadforge::session::{Orchestrator, OrchestratorConfig, OrchestratorState, Transcript, Workspace};
use scadforge::{CompilationError, ForgeError, GenerationError, ParameterSet};

const BRACKET: &str = "\
// L bracket
width = 40;
height = 25;
thickness = 3;
hole_d = 4.5;

difference() {
    union() {
        cube([width, thickness, height]);
        cube([width, height, thickness]);
    }
    translate([width / 2, -1, height / 2]) rotate([-90, 0, 0]) cylinder(d = hole_d, h = 10);
}
";

/// Helper to build an orchestrator over mocks
fn mock_orchestrator(generator: MockGenerator) -> Orchestrator<MockGenerator, MockCompiler> {
    Orchestrator::new(
        generator,
        MockCompiler::new(),
        Workspace::temporary().unwrap(),
        OrchestratorConfig::default(),
    )
}

// === Prompt Submission Tests ===

#[test]
fn test_submit_prompt_records_exchange() {
    let mut orch = mock_orchestrator(MockGenerator::scripted([BRACKET]));
    let mut transcript = Transcript::new();

    let id = orch.submit_prompt(&mut transcript, "an L bracket").unwrap();

    assert_eq!(orch.state(), OrchestratorState::Ready);
    assert_eq!(transcript.len(), 2);

    let result = transcript.get(id).unwrap().as_assistant().unwrap();
    assert_eq!(result.script().as_str(), BRACKET.trim());
    assert_eq!(
        result.parameters().names().collect::<Vec<_>>(),
        vec!["width", "height", "thickness", "hole_d"]
    );
    assert!(result.artifact(MeshFormat::Stl).unwrap().path.exists());
    assert!(result.artifact(MeshFormat::ThreeMf).unwrap().path.exists());
}

#[test]
fn test_compiles_formats_in_order() {
    let mut orch = mock_orchestrator(MockGenerator::new());
    let mut transcript = Transcript::new();
    orch.submit_prompt(&mut transcript, "a box").unwrap();

    assert_eq!(orch.compiler().calls(MeshFormat::Stl), 1);
    assert_eq!(orch.compiler().calls(MeshFormat::ThreeMf), 1);
    assert_eq!(orch.compiler().total_calls(), 2);
}

#[test]
fn test_history_sent_on_follow_up() {
    let mut orch = mock_orchestrator(MockGenerator::scripted([BRACKET, "cube(5);"]));
    let mut transcript = Transcript::new();

    orch.submit_prompt(&mut transcript, "an L bracket").unwrap();
    orch.submit_prompt(&mut transcript, "now just a cube").unwrap();

    let requests = orch.generator().requests();
    assert_eq!(requests.len(), 2);

    let follow_up = &requests[1];
    let roles: Vec<_> = follow_up.messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![ChatRole::System, ChatRole::User, ChatRole::Assistant, ChatRole::User]
    );
    assert_eq!(follow_up.messages[1].content, "an L bracket");
    assert_eq!(follow_up.messages[2].content, BRACKET.trim());
    assert_eq!(follow_up.messages[3].content, "now just a cube");
}

// === Atomicity Tests ===

#[test]
fn test_generation_failure_leaves_transcript_unchanged() {
    let generator = MockGenerator::scripted([BRACKET]);
    let mut orch = mock_orchestrator(generator);
    let mut transcript = Transcript::new();
    orch.submit_prompt(&mut transcript, "an L bracket").unwrap();

    orch.generator().push_failure(GenerationError::RateLimited {
        message: "slow down".to_string(),
    });
    let err = orch.submit_prompt(&mut transcript, "make it wider").unwrap_err();

    assert!(matches!(err, ForgeError::Generation(GenerationError::RateLimited { .. })));
    assert!(err.is_retryable());
    assert_eq!(orch.state(), OrchestratorState::Failed);
    assert_eq!(transcript.len(), 2);
}

#[test]
fn test_second_format_failure_leaves_no_artifacts() {
    let mut orch = mock_orchestrator(MockGenerator::new());
    orch.compiler()
        .fail_format(MeshFormat::ThreeMf, MockFailure::new(1, "", "3mf export failed"));
    let mut transcript = Transcript::new();

    let err = orch.submit_prompt(&mut transcript, "a box").unwrap_err();

    assert_eq!(err.error_code(), "COMPILATION_FAILED");
    assert!(transcript.is_empty());
    assert_eq!(orch.workspace().usage().file_count, 0);
}

// === Compiler Failure Reporting ===

#[test]
fn test_failure_carries_exit_code_and_output() {
    let mut orch = mock_orchestrator(MockGenerator::scripted(["cube([1, 2, 3);"]));
    orch.compiler().fail_when_script_contains(
        "cube([1, 2, 3);",
        MockFailure::new(1, "warning: thin wall", "ERROR: unbalanced parentheses"),
    );
    let mut transcript = Transcript::new();

    let err = orch.submit_prompt(&mut transcript, "a broken cube").unwrap_err();
    let ForgeError::Compilation(compile_err) = err else {
        panic!("expected a compilation error, got {:?}", err);
    };

    assert_eq!(compile_err.exit_code(), Some(1));
    assert_eq!(compile_err.stdout(), Some("warning: thin wall"));
    assert_eq!(compile_err.stderr(), Some("ERROR: unbalanced parentheses"));
    assert!(matches!(
        compile_err,
        CompilationError::Failed { format: MeshFormat::Stl, .. }
    ));
    assert!(transcript.is_empty());
}

// === Parameter Regeneration Tests ===

#[test]
fn test_regenerate_replaces_preview_only() {
    let mut orch = mock_orchestrator(MockGenerator::scripted([BRACKET]));
    let mut transcript = Transcript::new();
    let id = orch.submit_prompt(&mut transcript, "an L bracket").unwrap();

    let before = transcript.get(id).unwrap().as_assistant().unwrap().clone();
    let edits = ParameterSet::new().with("width", 60.0);
    let preview = orch.regenerate(&mut transcript, id, &edits).unwrap();

    let after = transcript.get(id).unwrap().as_assistant().unwrap();
    assert_eq!(after.parameters().get("width"), Some(60.0));
    assert_eq!(after.parameters().get("height"), Some(25.0));
    assert!(after.script().as_str().contains("width = 60;"));
    assert_eq!(after.revision(), 1);

    // New STL handle, original 3MF handle
    let old_stl = before.artifact(MeshFormat::Stl).unwrap();
    assert_ne!(preview.id, old_stl.id);
    assert_ne!(preview.sha256, old_stl.sha256);
    assert_eq!(after.artifact(MeshFormat::Stl), Some(&preview));
    assert_eq!(
        after.artifact(MeshFormat::ThreeMf),
        before.artifact(MeshFormat::ThreeMf)
    );

    // Superseded preview removed, recompiled only once
    assert!(!old_stl.path.exists());
    assert_eq!(orch.compiler().calls(MeshFormat::Stl), 2);
    assert_eq!(orch.compiler().calls(MeshFormat::ThreeMf), 1);
    assert_eq!(transcript.len(), 2);
}

#[test]
fn test_repeated_regeneration_does_not_accumulate_files() {
    let mut orch = mock_orchestrator(MockGenerator::scripted([BRACKET]));
    let mut transcript = Transcript::new();
    let id = orch.submit_prompt(&mut transcript, "an L bracket").unwrap();

    // script + stl + 3mf
    assert_eq!(orch.workspace().usage().file_count, 3);

    for width in [45.0, 50.0, 55.0] {
        let edits = ParameterSet::new().with("width", width);
        orch.regenerate(&mut transcript, id, &edits).unwrap();
        assert_eq!(orch.workspace().usage().file_count, 3);
    }

    let result = transcript.get(id).unwrap().as_assistant().unwrap();
    let stl = result.artifact(MeshFormat::Stl).unwrap();
    assert!(orch.workspace().script_path(stl.id).exists());
    assert!(result.artifact(MeshFormat::ThreeMf).unwrap().path.exists());
}

#[test]
fn test_regenerate_failure_keeps_turn() {
    let mut orch = mock_orchestrator(MockGenerator::scripted([BRACKET]));
    let mut transcript = Transcript::new();
    let id = orch.submit_prompt(&mut transcript, "an L bracket").unwrap();
    let before = transcript.get(id).unwrap().as_assistant().unwrap().clone();

    orch.compiler().fail_when_script_contains(
        "thickness = 0;",
        MockFailure::new(1, "", "ERROR: degenerate geometry"),
    );
    let edits = ParameterSet::new().with("thickness", 0.0);
    let err = orch.regenerate(&mut transcript, id, &edits).unwrap_err();

    assert_eq!(err.error_code(), "COMPILATION_FAILED");
    assert_eq!(orch.state(), OrchestratorState::Failed);

    let after = transcript.get(id).unwrap().as_assistant().unwrap();
    assert_eq!(after.script(), before.script());
    assert_eq!(after.artifacts(), before.artifacts());
    assert!(before.artifact(MeshFormat::Stl).unwrap().path.exists());
}

#[test]
fn test_regenerate_rejects_bad_targets() {
    let mut orch = mock_orchestrator(MockGenerator::scripted([BRACKET]));
    let mut transcript = Transcript::new();
    let id = orch.submit_prompt(&mut transcript, "an L bracket").unwrap();
    let user_turn = transcript.turns()[0].id;
    let edits = ParameterSet::new().with("width", 50.0);

    let err = orch
        .regenerate(&mut transcript, uuid::Uuid::new_v4(), &edits)
        .unwrap_err();
    assert_eq!(err.error_code(), "TURN_NOT_FOUND");

    let err = orch.regenerate(&mut transcript, user_turn, &edits).unwrap_err();
    assert_eq!(err.error_code(), "NOT_AN_ASSISTANT_TURN");

    let err = orch
        .regenerate(&mut transcript, id, &ParameterSet::new().with("depth", 1.0))
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_PARAMETER");

    let err = orch
        .regenerate(&mut transcript, id, &ParameterSet::new().with("width", -5.0))
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_PARAMETER");

    // Nothing was compiled for the rejected edits
    assert_eq!(orch.compiler().calls(MeshFormat::Stl), 1);
}

#[test]
fn test_mock_reply_with_fence() {
    let reply = format!("```openscad\n{}```", BRACKET);
    let mut orch = mock_orchestrator(MockGenerator::scripted([reply]));
    let mut transcript = Transcript::new();

    let id = orch.submit_prompt(&mut transcript, "an L bracket").unwrap();
    let result = transcript.get(id).unwrap().as_assistant().unwrap();

    assert!(result.script().as_str().starts_with("// L bracket"));
    assert_eq!(result.parameters().len(), 4);
}
