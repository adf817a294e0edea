//! Per-line matching of simple scalar assignments
//!
//! A line matches when, after optional indentation, it reads
//! `identifier = literal;` where the literal is digits with at most one
//! decimal point. Anything after the `;` is never inspected.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[ \t]*([A-Za-z_][A-Za-z0-9_]*)[ \t]*=[ \t]*([0-9]+\.?[0-9]*|\.[0-9]+)[ \t]*;")
        .expect("assignment pattern is valid")
});

/// A matched `name = number;` statement within one line
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Assignment<'a> {
    pub name: &'a str,
    pub value: f64,
    /// Byte range from the identifier through the terminating `;`
    pub span: Range<usize>,
}

/// Match one line (without its terminator) against the assignment rule
pub(crate) fn match_line(line: &str) -> Option<Assignment<'_>> {
    let caps = ASSIGNMENT.captures(line)?;
    let name = caps.get(1)?;
    let literal = caps.get(2)?;
    let whole = caps.get(0)?;
    let value = literal.as_str().parse::<f64>().ok()?;

    Some(Assignment {
        name: name.as_str(),
        value,
        span: name.start()..whole.end(),
    })
}

/// Split a line into its body and terminator (`"\n"`, `"\r\n"` or `""`)
pub(crate) fn split_terminator(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}
