//! Parameter extraction
//!
//! Only simple scalar assignments are surfaced. Expressions, strings,
//! booleans and negative literals stay in the script untouched and are not
//! editable from outside.

use super::assignment::{match_line, split_terminator};
use super::{ParameterSet, ScriptText};

/// Scan a script for `name = number;` lines
///
/// The result is ordered by first occurrence; when a name is assigned more
/// than once the last value wins. A script with no matching line yields an
/// empty set.
pub fn extract_parameters(script: &ScriptText) -> ParameterSet {
    let mut params = ParameterSet::new();

    for line in script.as_str().split_inclusive('\n') {
        let (body, _) = split_terminator(line);
        if let Some(assignment) = match_line(body) {
            params.set(assignment.name, assignment.value);
        }
    }

    params
}
