//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::{info, warn};

use super::parse_assignment;
use crate::compiler::{GeometryCompiler, MeshFormat, MockCompiler, OpenScadCompiler};
use crate::config::Config;
use crate::error::ForgeError;
use crate::llm::{CachedGenerator, MockGenerator, OpenAiGenerator, TextGenerator, MOCK_DEFAULT_SCRIPT};
use crate::script::{apply_parameters, extract_parameters, validate_edits, ParameterSet, ScriptText};
use crate::session::{AssistantTurn, Orchestrator, OrchestratorConfig, Transcript, TurnKind, Workspace};

/// Stem used for exported files
const EXPORT_STEM: &str = "model";

type SessionOrchestrator =
    Orchestrator<CachedGenerator<Box<dyn TextGenerator>>, Box<dyn GeometryCompiler>>;

/// Wire up generator, compiler and workspace from the configuration.
fn build_orchestrator(config: &Config, mock: bool, root: Option<&Path>) -> Result<SessionOrchestrator> {
    let generator: Box<dyn TextGenerator>;
    let compiler: Box<dyn GeometryCompiler>;
    if mock {
        generator = Box::new(MockGenerator::with_fallback(MOCK_DEFAULT_SCRIPT));
        compiler = Box::new(MockCompiler::new());
    } else {
        generator = Box::new(OpenAiGenerator::from_config(config));
        compiler = Box::new(OpenScadCompiler::from_config(config));
    }
    info!("Using generator '{}' and compiler '{}'", generator.name(), compiler.name());

    let workspace = match root {
        Some(dir) => Workspace::persistent(dir)?,
        None => Workspace::temporary()?,
    };
    info!("Session files in: {}", workspace.path().display());

    Ok(Orchestrator::new(
        CachedGenerator::with_capacity(generator, config.cache_capacity),
        compiler,
        workspace,
        OrchestratorConfig::from(config),
    ))
}

/// Generate a model from one prompt and export it.
pub fn generate(prompt: &str, formats: Vec<MeshFormat>, out: &Path, mock: bool) -> Result<()> {
    let config = Config::from_env()?.with_formats(formats);
    info!("Generating model for prompt: {}", prompt);

    let mut orchestrator = build_orchestrator(&config, mock, None)?;
    let mut transcript = Transcript::new();
    let turn_id = orchestrator.submit_prompt(&mut transcript, prompt)?;

    let Some(result) = transcript.get(turn_id).and_then(|t| t.as_assistant()) else {
        bail!("generated turn {} missing from transcript", turn_id);
    };

    print_script(result.script());
    print_parameters(result.parameters());
    export_turn(orchestrator.workspace(), result, out)?;

    Ok(())
}

/// Run an interactive session on stdin.
pub fn chat(out: Option<&Path>, mock: bool) -> Result<()> {
    let config = Config::from_env()?;
    let mut orchestrator = build_orchestrator(&config, mock, out)?;
    let mut transcript = Transcript::new();

    println!("=== Scadforge ===");
    println!("Describe an object, or type :help for commands.");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        let line = line.context("failed to read from stdin")?;

        match ChatInput::parse(&line) {
            ChatInput::Empty => {}
            ChatInput::Quit => break,
            ChatInput::Help => print_chat_help(),
            ChatInput::Prompt(prompt) => match orchestrator.submit_prompt(&mut transcript, &prompt) {
                Ok(turn_id) => {
                    if let Some(result) = transcript.get(turn_id).and_then(|t| t.as_assistant()) {
                        print_parameters(result.parameters());
                        print_artifacts(result);
                    }
                }
                Err(e) => report(&e),
            },
            ChatInput::Set(edits) => {
                let Some((turn_id, _)) = transcript.last_assistant() else {
                    println!("Nothing to edit yet. Describe an object first.");
                    continue;
                };
                let edits: ParameterSet = edits.into_iter().collect();
                match orchestrator.regenerate(&mut transcript, turn_id, &edits) {
                    Ok(artifact) => {
                        if let Some((_, result)) = transcript.last_assistant() {
                            print_parameters(result.parameters());
                        }
                        println!("Preview: {}", artifact.path.display());
                    }
                    Err(e) => report(&e),
                }
            }
            ChatInput::Params => match transcript.last_assistant() {
                Some((_, result)) => print_parameters(result.parameters()),
                None => println!("No model yet."),
            },
            ChatInput::Script => match transcript.last_assistant() {
                Some((_, result)) => print_script(result.script()),
                None => println!("No model yet."),
            },
            ChatInput::History => print_history(&transcript),
            ChatInput::Export(dir) => match transcript.last_assistant() {
                Some((_, result)) => {
                    if let Err(e) = export_turn(orchestrator.workspace(), result, &dir) {
                        warn!("Export failed: {:#}", e);
                        println!("Export failed: {:#}", e);
                    }
                }
                None => println!("No model yet."),
            },
            ChatInput::Invalid(message) => println!("{}", message),
        }
    }

    let usage = orchestrator.workspace().usage();
    info!(
        "Session ended: {} turns, {} files ({:.1} MB)",
        transcript.len(),
        usage.file_count,
        usage.total_size_mb
    );
    Ok(())
}

/// Print the parameters of a script as JSON.
pub fn params(file: &Path) -> Result<()> {
    let script = read_script(file)?;
    let params = extract_parameters(&script);
    info!("Found {} parameters in {}", params.len(), file.display());

    println!("{}", serde_json::to_string_pretty(&params)?);
    Ok(())
}

/// Patch parameter values into a script.
pub fn apply(file: &Path, assignments: Vec<(String, f64)>, output: Option<&Path>) -> Result<()> {
    let script = read_script(file)?;
    let edits: ParameterSet = assignments.into_iter().collect();
    validate_edits(&extract_parameters(&script), &edits)
        .with_context(|| format!("cannot patch {}", file.display()))?;

    let patched = apply_parameters(&script, &edits);
    info!("Patched {} parameters in {}", edits.len(), file.display());
    match output {
        Some(path) => {
            fs::write(path, patched.as_str())
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Patched script written to: {}", path.display());
        }
        None => print!("{}", patched),
    }
    Ok(())
}

/// Compile an existing script into each requested format.
pub fn compile(file: &Path, formats: Vec<MeshFormat>, out: Option<&Path>) -> Result<()> {
    let config = Config::from_env()?.with_formats(formats);
    let compiler = OpenScadCompiler::from_config(&config);

    let out_dir = match out {
        Some(dir) => dir.to_path_buf(),
        None => file.parent().map(Path::to_path_buf).unwrap_or_default(),
    };

    for dest in compile_into(&compiler, file, &config.formats, &out_dir)? {
        println!("{}", dest.display());
    }
    Ok(())
}

/// Compile `file` in a scratch workspace, then copy the outputs to `out_dir`
///
/// Nothing is written to `out_dir` unless every format compiled. The script
/// is compiled where it lives so relative `include`/`use` paths resolve.
fn compile_into<C: GeometryCompiler + ?Sized>(
    compiler: &C,
    file: &Path,
    formats: &[MeshFormat],
    out_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let stem = file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(EXPORT_STEM);

    let workspace = Workspace::temporary()?;
    info!("Compiling {} ({} formats)", file.display(), formats.len());
    let artifacts = workspace
        .compile_file(compiler, file, uuid::Uuid::new_v4(), formats)
        .map_err(ForgeError::from)?;

    let mut written = Vec::with_capacity(artifacts.len());
    for artifact in artifacts.values() {
        let dest = workspace.export(artifact, out_dir, stem)?;
        info!("{}: {} bytes", artifact.format, artifact.size_bytes);
        written.push(dest);
    }
    Ok(written)
}

/// Print the effective configuration.
pub fn print_config() -> Result<()> {
    let config = Config::from_env()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// One line of chat input
#[derive(Debug, Clone, PartialEq)]
pub enum ChatInput {
    Empty,
    Prompt(String),
    Params,
    Set(Vec<(String, f64)>),
    Script,
    History,
    Export(PathBuf),
    Help,
    Quit,
    Invalid(String),
}

impl ChatInput {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(command) = line.strip_prefix(':') else {
            return Self::Prompt(line.to_string());
        };

        let mut words = command.split_whitespace();
        match words.next().unwrap_or("") {
            "params" => Self::Params,
            "script" => Self::Script,
            "history" => Self::History,
            "help" => Self::Help,
            "quit" | "q" | "exit" => Self::Quit,
            "export" => match words.next() {
                Some(dir) => Self::Export(PathBuf::from(dir)),
                None => Self::Invalid("usage: :export DIR".to_string()),
            },
            "set" => {
                let edits: std::result::Result<Vec<_>, _> = words.map(parse_assignment).collect();
                match edits {
                    Ok(edits) if edits.is_empty() => {
                        Self::Invalid("usage: :set name=value [name=value ...]".to_string())
                    }
                    Ok(edits) => Self::Set(edits),
                    Err(e) => Self::Invalid(e),
                }
            }
            other => Self::Invalid(format!("unknown command ':{}', try :help", other)),
        }
    }
}

fn read_script(file: &Path) -> Result<ScriptText> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("failed to read script {}", file.display()))?;
    Ok(ScriptText::new(text))
}

fn export_turn(workspace: &Workspace, result: &AssistantTurn, dir: &Path) -> Result<()> {
    let script = workspace.export_script(result.script(), dir, EXPORT_STEM)?;
    println!("Script: {}", script.display());

    for artifact in result.artifacts().values() {
        let dest = workspace.export(artifact, dir, EXPORT_STEM)?;
        println!("{}: {} ({} bytes)", artifact.format, dest.display(), artifact.size_bytes);
    }
    Ok(())
}

fn report(err: &ForgeError) {
    warn!("[{}] {}", err.error_code(), err);
    println!("ERROR: {}", err);
    if let Some(stderr) = err_stderr(err).filter(|s| !s.trim().is_empty()) {
        println!("--- compiler output ---");
        println!("{}", stderr.trim_end());
    }
    if let Some(suggestion) = err.recovery_suggestion() {
        println!("Hint: {}", suggestion);
    }
}

fn err_stderr(err: &ForgeError) -> Option<&str> {
    match err {
        ForgeError::Compilation(e) => e.stderr(),
        _ => None,
    }
}

fn print_script(script: &ScriptText) {
    println!("{:-<60}", "");
    println!("{}", script.as_str().trim_end());
    println!("{:-<60}", "");
}

fn print_parameters(params: &ParameterSet) {
    if params.is_empty() {
        println!("No editable parameters.");
    } else {
        println!("Parameters: {}", params);
    }
}

fn print_artifacts(result: &AssistantTurn) {
    for artifact in result.artifacts().values() {
        println!("{}: {}", artifact.format, artifact.path.display());
    }
}

fn print_history(transcript: &Transcript) {
    if transcript.is_empty() {
        println!("No turns yet.");
        return;
    }
    for turn in transcript.turns() {
        let time = turn.timestamp.format("%H:%M:%S");
        match &turn.kind {
            TurnKind::User { prompt } => println!("{} user      {}", time, prompt),
            TurnKind::Assistant(result) => println!(
                "{} assistant {} lines, {} parameters, revision {}",
                time,
                result.script().line_count(),
                result.parameters().len(),
                result.revision()
            ),
        }
    }
}

fn print_chat_help() {
    println!("Plain text       describe a new object or a change");
    println!(":params          show editable parameters");
    println!(":set a=1 b=2     change parameters and rebuild the preview");
    println!(":script          show the current script");
    println!(":history         list the conversation");
    println!(":export DIR      copy script and meshes to DIR");
    println!(":quit            leave");
}
