//! Scadforge CLI
//!
//! Command-line interface for conversational OpenSCAD model generation.

use std::process::ExitCode;

use clap::Parser;
use log::info;
use tracing_subscriber::EnvFilter;

use scadforge::cli::{commands, Cli, Commands};
use scadforge::ForgeError;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logger; `log` records are bridged into the same subscriber
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Scadforge v{}", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Some(cmd) => handle_command(cmd),
        None => {
            println!("Scadforge v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            if let Some(forge) = err.downcast_ref::<ForgeError>() {
                if let Some(stderr) = forge_stderr(forge) {
                    eprintln!("{}", stderr.trim_end());
                }
                if let Some(suggestion) = forge.recovery_suggestion() {
                    eprintln!("Hint: {}", suggestion);
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn handle_command(cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Generate {
            prompt,
            formats,
            out,
            mock,
        } => commands::generate(&prompt, formats, &out, mock),
        Commands::Chat { out, mock } => commands::chat(out.as_deref(), mock),
        Commands::Params { file } => commands::params(&file),
        Commands::Apply {
            file,
            assignments,
            output,
        } => commands::apply(&file, assignments, output.as_deref()),
        Commands::Compile { file, formats, out } => commands::compile(&file, formats, out.as_deref()),
        Commands::Config => commands::print_config(),
    }
}

fn forge_stderr(err: &ForgeError) -> Option<&str> {
    match err {
        ForgeError::Compilation(e) => e.stderr().filter(|s| !s.trim().is_empty()),
        _ => None,
    }
}
