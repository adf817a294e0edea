//! CLI Module
//!
//! Command-line interface for scadforge.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::compiler::MeshFormat;
use crate::script::is_writable;

/// Scadforge - describe an object, get an OpenSCAD model with editable parameters
#[derive(Parser, Debug)]
#[command(name = "scadforge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a model from one prompt and export it
    Generate {
        /// Description of the object
        prompt: String,

        /// Output format (repeatable; defaults to SCADFORGE_FORMATS)
        #[arg(short, long = "format", value_parser = parse_format)]
        formats: Vec<MeshFormat>,

        /// Directory to export the script and meshes into
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// Use the offline mock generator and compiler
        #[arg(long)]
        mock: bool,
    },

    /// Interactive session: prompts, parameter edits and exports
    Chat {
        /// Keep session files in this directory instead of a temp dir
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Use the offline mock generator and compiler
        #[arg(long)]
        mock: bool,
    },

    /// Print the editable parameters of a script as JSON
    Params {
        /// OpenSCAD script
        file: PathBuf,
    },

    /// Write new parameter values into a script
    Apply {
        /// OpenSCAD script
        file: PathBuf,

        /// Assignment such as `width=12.5` (repeatable)
        #[arg(short, long = "set", value_parser = parse_assignment, required = true)]
        assignments: Vec<(String, f64)>,

        /// Write the patched script here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Compile an existing script
    Compile {
        /// OpenSCAD script
        file: PathBuf,

        /// Output format (repeatable; defaults to SCADFORGE_FORMATS)
        #[arg(short, long = "format", value_parser = parse_format)]
        formats: Vec<MeshFormat>,

        /// Directory for the meshes (defaults to the script's directory)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config,
}

fn parse_format(raw: &str) -> Result<MeshFormat, String> {
    raw.parse::<MeshFormat>().map_err(|e| e.to_string())
}

/// Parse `name=value` into a parameter edit
pub fn parse_assignment(raw: &str) -> Result<(String, f64), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))?;

    let name = name.trim();
    let valid_name = name
        .chars()
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid_name {
        return Err(format!("'{}' is not a parameter name", name));
    }

    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", value.trim()))?;
    if !is_writable(value) {
        return Err(format!("{} must be a finite, non-negative number", name));
    }
    Ok((name.to_string(), value))
}
