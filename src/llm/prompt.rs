//! System instruction and reply clean-up

/// Instruction sent ahead of every conversation
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert in OpenSCAD. Given a user prompt describing a 3D printable model, \
generate a parametric OpenSCAD script that fulfills the description. \
Declare every tunable dimension as a top-level `name = number;` assignment. \
Only return the raw .scad code without any explanations or markdown formatting.";

/// Trim a model reply down to script source
///
/// Models sometimes wrap code in a markdown fence despite being told not
/// to. A leading fence and its info string are removed, along with the
/// closing fence when there is one. Fences in the middle of the text are
/// left alone.
pub fn clean_reply(reply: &str) -> String {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);

    // Drop the info string (e.g. "openscad") on the opening line
    let body = match rest.split_once('\n') {
        Some((info, code)) if is_info_string(info) => code,
        None if is_info_string(rest) => "",
        _ => rest,
    };
    body.trim().to_string()
}

fn is_info_string(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+'))
}
