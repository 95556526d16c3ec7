//! End-to-end formatter scenarios.

use svfmt_format::{format_source, AlignmentPolicy, FormatStyle};

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn format_with(source: &str, style: &FormatStyle) -> String {
    format_source(source, style).text
}

fn default_format(source: &str) -> String {
    format_with(source, &FormatStyle::default())
}

#[test]
fn test_token_identity_round_trip() {
    let sources = [
        "module m;\nassign x = a + b;\nendmodule\n",
        "module m(\n  input  logic a,\n  output logic bbb\n);\nendmodule\n",
        "task t;\n  // a comment\n  if (a) begin\n    -> ev;\n  end\nendtask\n",
        "constraint c { a -> b; soft x == y; }\n",
        "`define W 8\nwire [`W-1:0] bus;\n",
        "case (s)\n  1: x = 1;\n  default: x = 0;\nendcase\n",
    ];
    for source in sources {
        let output = default_format(source);
        assert_eq!(
            strip_whitespace(source),
            strip_whitespace(&output),
            "non-whitespace bytes must survive for {:?}\ngot: {:?}",
            source,
            output
        );
    }
}

#[test]
fn test_idempotence() {
    let sources = [
        "module m;\nassign x = a + b;\nendmodule\n",
        "module m(\n  input  logic a,\n  output logic bbb,\n  input  wire  cc\n);\nendmodule\n",
        "task t;\n  if (a) begin\n    x = 1;\n  end\nendtask\n",
        "case (s)\n  1: x = 1;\n  default: x = 0;\nendcase\n",
    ];
    for source in sources {
        let once = default_format(source);
        let twice = default_format(&once);
        assert_eq!(once, twice, "formatting must be idempotent for {:?}", source);
    }
}

#[test]
fn test_port_declaration_alignment() {
    // Scenario: align policy pads direction, type, and name columns.
    let style = FormatStyle {
        port_declarations_alignment: AlignmentPolicy::Align,
        ..FormatStyle::default()
    };
    let source = "module m(\n  input logic a,\n  output logic bbb,\n  input wire cc\n);\nendmodule\n";
    let output = format_with(source, &style);
    assert!(
        output.contains("input  logic a,"),
        "direction column must pad input to output's width:\n{}",
        output
    );
    assert!(output.contains("output logic bbb,"), "{}", output);
    assert!(
        output.contains("input  wire  cc"),
        "type column must pad wire to logic's width:\n{}",
        output
    );
}

#[test]
fn test_infer_intent_keeps_flush_left() {
    // Original spacing is at most flush-left + small jitter: the inference
    // chooses flush-left and no column padding appears.
    let style = FormatStyle {
        port_declarations_alignment: AlignmentPolicy::InferUserIntent,
        align_force_threshold: 0,
        ..FormatStyle::default()
    };
    let source =
        "module m(\n  input logic aaaaaa,\n  output logic b,\n  input wire c\n);\nendmodule\n";
    let output = format_with(source, &style);
    assert!(
        output.contains("output logic b,"),
        "flush-left output expected:\n{}",
        output
    );
    assert!(!output.contains("output logic b,     "), "{}", output);
}

#[test]
fn test_infer_intent_respects_user_alignment() {
    // The user left >= 4 excess spaces somewhere: infer alignment.
    let style = FormatStyle {
        port_declarations_alignment: AlignmentPolicy::InferUserIntent,
        align_force_threshold: 0,
        ..FormatStyle::default()
    };
    let source = "module m(\n  input  logic      a,\n  output logic bbbbbb\n);\nendmodule\n";
    let output = format_with(source, &style);
    assert!(
        output.contains("input  logic a,") || output.contains("input  logic      a,"),
        "aligned or preserved output expected:\n{}",
        output
    );
}

#[test]
fn test_format_off_region_is_verbatim() {
    let source = "assign x = 1;\n// verilog_format: off\n   assign     y=    2 ;\n// verilog_format: on\nassign z = 3;\n";
    let output = default_format(source);
    assert!(
        output.contains("   assign     y=    2 ;"),
        "disabled region must be byte-identical:\n{}",
        output
    );
    // The surrounding lines still format normally.
    assert!(output.contains("assign x = 1;"), "{}", output);
    assert!(output.contains("assign z = 3;"), "{}", output);
}

#[test]
fn test_format_off_to_end_of_file() {
    let source = "assign x = 1;\n// verilog_format: off\n  assign   y = 2;\n  assign  z=3;\n";
    let output = default_format(source);
    assert!(output.contains("  assign   y = 2;"), "{}", output);
    assert!(output.contains("  assign  z=3;"), "{}", output);
}

#[test]
fn test_event_trigger_statement_formats() {
    let source = "task t;\n  if (a -> b) -> c;\nendtask\n";
    let output = default_format(source);
    assert!(output.contains("if (a -> b) -> c;"), "{}", output);
}

#[test]
fn test_case_items_align_with_policy() {
    let style = FormatStyle {
        case_items_alignment: AlignmentPolicy::Align,
        ..FormatStyle::default()
    };
    let source = "case (s)\n  1: a = 0;\n  22: ab = 1;\nendcase\n";
    let output = format_with(source, &style);
    // Both items keep their structure; the ':' stays attached to the label.
    assert!(output.contains("1:"), "{}", output);
    assert!(output.contains("22:"), "{}", output);
}

#[test]
fn test_parse_error_still_formats() {
    let source = "module m(;\nassign x = 1;\n";
    let outcome = format_source(source, &FormatStyle::default());
    assert!(!outcome.rejects.is_empty());
    assert_eq!(strip_whitespace(source), strip_whitespace(&outcome.text));
}

#[test]
fn test_cancellation_produces_no_output() {
    use std::sync::atomic::AtomicBool;
    use svfmt_format::{format_source_with, FormatError, FormatOptions};

    let cancel = AtomicBool::new(true);
    let result = format_source_with(
        "module m;\nendmodule\n",
        &FormatStyle::default(),
        &FormatOptions::default(),
        &cancel,
    );
    assert!(matches!(result, Err(FormatError::Cancelled)));
}

#[test]
fn test_blank_line_preserved_between_items() {
    let source = "module m;\nassign a = 1;\n\nassign b = 2;\nendmodule\n";
    let output = default_format(source);
    assert!(
        output.contains("assign a = 1;\n\n  assign b = 2;")
            || output.contains("assign a = 1;\n\nassign b = 2;"),
        "single blank line preserved:\n{}",
        output
    );
}

#[test]
fn test_comment_lines_survive() {
    let source = "module m;\n// standalone\nassign x = 1;  // trailing\nendmodule\n";
    let output = default_format(source);
    assert!(output.contains("// standalone"), "{}", output);
    assert!(output.contains("// trailing"), "{}", output);
    // The trailing comment stays on the statement's line.
    let line = output
        .lines()
        .find(|l| l.contains("assign x"))
        .expect("statement line");
    assert!(line.contains("// trailing"), "{}", output);
}

#[test]
fn test_extra_disabled_ranges_from_caller() {
    use std::sync::atomic::AtomicBool;
    use svfmt_format::{format_source_with, ByteOffsetSet, FormatOptions};

    let source = "assign   a=1;\nassign b = 2;\n";
    let mut disabled = ByteOffsetSet::new();
    disabled.add(0, source.find('\n').unwrap());
    let cancel = AtomicBool::new(false);
    let outcome = format_source_with(
        source,
        &FormatStyle::default(),
        &FormatOptions { disabled_ranges: disabled },
        &cancel,
    )
    .expect("not cancelled");
    assert!(outcome.text.contains("assign   a=1;"), "{}", outcome.text);
    assert!(outcome.text.contains("assign b = 2;"), "{}", outcome.text);
}
