// ==============================================================================
// Error Reporting Tests
// ==============================================================================
//
// These tests verify the *content* of error messages produced by malformed
// protobuf files, malformed schema documents, and schemas that fail to
// validate. Errors are rendered through `miette`'s `GraphicalReportHandler`
// (with Unicode and color disabled) so that we test what the user actually
// sees, including the source name and the highlighted line.

mod common;

use std::path::PathBuf;

use common::render_diagnostic;
use protocue::reader::parse_proto;
use protocue::{Error, Runtime, SchemaError};

// ==============================================================================
// Test Helpers
// ==============================================================================

/// Parse an inline protobuf file and return the rendered error.
fn proto_error(source: &str) -> String {
    match parse_proto(source, "inline.proto", PathBuf::from("inline.proto")) {
        Ok(_) => panic!("expected a syntax error"),
        Err(d) => render_diagnostic(&miette::Report::new(d)),
    }
}

/// Compile and validate an inline schema document, returning the problems.
fn schema_problems(source: &str) -> Vec<String> {
    let rt = Runtime::new();
    let instance = rt.compile("inline.cue", source).expect("compiles");
    match rt.validate(&instance) {
        Ok(()) => panic!("expected validation to fail"),
        Err(e) => e.messages(),
    }
}

// ==============================================================================
// Protobuf Syntax Errors
// ==============================================================================

#[test]
fn test_missing_semicolon_points_at_the_line() {
    let rendered = proto_error("syntax = \"proto3\";\nmessage A {\n  string name = 1\n}\n");
    assert!(rendered.contains("inline.proto"), "{rendered}");
    assert!(rendered.contains("expected"), "{rendered}");
    assert!(rendered.contains("string name = 1"), "{rendered}");
}

#[test]
fn test_unknown_top_level_keyword() {
    let rendered = proto_error("syntax = \"proto3\";\nmesage A {}\n");
    assert!(rendered.contains("a top-level declaration"), "{rendered}");
    assert!(rendered.contains("mesage"), "{rendered}");
}

// ==============================================================================
// Schema Syntax Errors
// ==============================================================================

#[test]
fn test_schema_syntax_error_carries_source() {
    let rt = Runtime::new();
    let err = rt
        .compile("skeleton.cue", "name: \"x\"\ncases: [\n")
        .map_err(Error::Schema)
        .expect_err("unterminated list");
    let rendered = render_diagnostic(&miette::Report::new(err));
    assert!(rendered.contains("protocue::schema"), "{rendered}");
    assert!(rendered.contains("skeleton.cue"), "{rendered}");
}

// ==============================================================================
// Validation Errors
// ==============================================================================

#[test]
fn test_conflicts_name_their_path() {
    let problems = schema_problems(
        "#Test: {method: string}\ncases: [...#Test] & [{method: 1}]\n",
    );
    assert_eq!(problems.len(), 1, "{problems:?}");
    assert!(problems[0].starts_with("cases.0.method: "), "{problems:?}");
    assert!(problems[0].contains("conflicting values"), "{problems:?}");
}

#[test]
fn test_closed_definitions_reject_extra_fields() {
    let problems = schema_problems("#Req: {a?: int}\nreq: #Req & {b: 1}\n");
    assert!(
        problems.iter().any(|p| p.contains("field `b` not allowed")),
        "{problems:?}"
    );
}

#[test]
fn test_unresolved_reference_suggests_a_name() {
    let problems = schema_problems("#Test: {}\ncase: #Tset\n");
    assert!(
        problems
            .iter()
            .any(|p| p.contains("reference `#Tset` not found (did you mean `#Test`?)")),
        "{problems:?}"
    );
}

#[test]
fn test_invalid_documents_report_every_problem() {
    let rt = Runtime::new();
    let instance = rt
        .compile("inline.cue", "a: int & \"x\"\nb: string & 2\n")
        .expect("compiles");
    let err = rt.validate(&instance).expect_err("two conflicts");
    let SchemaError::Invalid(problems) = err else {
        panic!("expected validation problems");
    };
    assert_eq!(problems.len(), 2, "{problems:?}");
}
