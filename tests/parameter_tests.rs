//! Parameter extraction and patching tests
//!
//! Exercises the public script API on realistic model sources.

use approx::assert_relative_eq;
use pretty_assertions::assert_eq;
use scadforge::script::format_value;
use scadforge::{apply_parameters, extract_parameters, ParameterSet, ScriptText};
use test_case::test_case;

const MUG: &str = "\
// Coffee mug
outer_d = 80;   // outer diameter
height = 95;
wall = 3.5;
handle_w = 12;
$fn = 96;

module body() {
    difference() {
        cylinder(d = outer_d, h = height);
        translate([0, 0, wall]) cylinder(d = outer_d - 2 * wall, h = height);
    }
}

body();
";

// === Extraction Tests ===

#[test]
fn test_extracts_top_level_numbers() {
    let params = extract_parameters(&ScriptText::from(MUG));

    assert_eq!(
        params.names().collect::<Vec<_>>(),
        vec!["outer_d", "height", "wall", "handle_w"]
    );
    assert_relative_eq!(params.get("wall").unwrap(), 3.5);
}

#[test_case("" ; "empty script")]
#[test_case("cube(10);\nsphere(r = 5);\n" ; "no assignments")]
#[test_case("size = [10, 20, 30];\nname = \"box\";\n" ; "non numeric values")]
#[test_case("offset = -5;\n" ; "negative literal")]
fn test_nothing_to_extract(source: &str) {
    assert!(extract_parameters(&ScriptText::from(source)).is_empty());
}

#[test]
fn test_last_occurrence_wins() {
    let script = ScriptText::from("r = 1;\nh = 4;\nr = 2.5;\n");
    let params = extract_parameters(&script);

    assert_eq!(params.len(), 2);
    assert_eq!(params.get("r"), Some(2.5));
}

// === Patching Tests ===

#[test]
fn test_extract_then_apply_is_identity() {
    let script = ScriptText::from(MUG);
    let patched = apply_parameters(&script, &extract_parameters(&script));
    assert_eq!(patched.as_str(), MUG);
}

#[test]
fn test_selective_overwrite() {
    let script = ScriptText::from(MUG);
    let patched = apply_parameters(&script, &ParameterSet::new().with("height", 110.0));

    let expected = MUG.replace("height = 95;", "height = 110;");
    assert_eq!(patched.as_str(), expected);

    let params = extract_parameters(&patched);
    assert_eq!(params.get("height"), Some(110.0));
    assert_eq!(params.get("outer_d"), Some(80.0));
    assert_eq!(params.get("wall"), Some(3.5));
}

#[test]
fn test_trailing_comment_survives_patch() {
    let script = ScriptText::from(MUG);
    let patched = apply_parameters(&script, &ParameterSet::new().with("outer_d", 72.5));
    assert!(patched.as_str().contains("outer_d = 72.5;   // outer diameter\n"));
}

#[test]
fn test_unknown_names_change_nothing() {
    let script = ScriptText::from(MUG);
    let patched = apply_parameters(&script, &ParameterSet::new().with("depth", 1.0));
    assert_eq!(patched, script);
}

#[test_case(10.0, "10" ; "whole number")]
#[test_case(0.25, "0.25" ; "fraction")]
#[test_case(-0.0, "0" ; "negative zero")]
fn test_written_values(value: f64, text: &str) {
    assert_eq!(format_value(value), text);

    let patched = apply_parameters(&ScriptText::from("v = 1;\n"), &ParameterSet::new().with("v", value));
    assert_eq!(patched.as_str(), format!("v = {};\n", text));
}
