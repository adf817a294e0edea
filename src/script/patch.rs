//! Parameter patching
//!
//! Rewrites numeric literals in place. Lines are never reordered, inserted
//! or removed; indentation, trailing comments and line endings survive.

use super::assignment::{match_line, split_terminator};
use super::{ParameterSet, ScriptText};
use crate::error::{ForgeError, Result};

/// Whether `value` can be written as a literal the extractor reads back
pub fn is_writable(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

/// Reject edits that name no parameter of `current` or carry a value that
/// could not be read back from the patched script
pub fn validate_edits(current: &ParameterSet, edits: &ParameterSet) -> Result<()> {
    for edit in edits {
        if !current.contains(&edit.name) {
            let known: Vec<_> = current.names().collect();
            return Err(ForgeError::InvalidParameter {
                param: edit.name.clone(),
                value: format_value(edit.value),
                expected: format!("one of: {}", known.join(", ")),
            });
        }
        if !is_writable(edit.value) {
            return Err(ForgeError::InvalidParameter {
                param: edit.name.clone(),
                value: edit.value.to_string(),
                expected: "a finite, non-negative number".to_string(),
            });
        }
    }
    Ok(())
}

/// Render a value as a plain decimal literal
///
/// Integral values have no fractional part (`15`), others use the shortest
/// text that parses back to the same `f64`. Never uses exponent notation.
pub fn format_value(value: f64) -> String {
    if value == 0.0 {
        // Covers -0.0 as well
        return "0".to_string();
    }
    format!("{}", value)
}

/// Produce a new script with the supplied parameter values spliced in
///
/// Only lines that match the assignment rule and name a parameter present in
/// `params` are rewritten, to `name = value;`. Negative and non-finite values
/// are skipped and their lines emitted unchanged.
pub fn apply_parameters(script: &ScriptText, params: &ParameterSet) -> ScriptText {
    let source = script.as_str();
    let mut out = String::with_capacity(source.len());

    for line in source.split_inclusive('\n') {
        let (body, terminator) = split_terminator(line);

        let replacement = match_line(body).and_then(|assignment| {
            let value = params.get(assignment.name)?;
            if !is_writable(value) {
                tracing::warn!(
                    param = assignment.name,
                    "skipping unreadable value {}",
                    value
                );
                return None;
            }
            Some((assignment.span, assignment.name, value))
        });

        match replacement {
            Some((span, name, value)) => {
                out.push_str(&body[..span.start]);
                out.push_str(name);
                out.push_str(" = ");
                out.push_str(&format_value(value));
                out.push(';');
                out.push_str(&body[span.end..]);
                out.push_str(terminator);
            }
            None => out.push_str(line),
        }
    }

    ScriptText::new(out)
}
