//! CLI behavior: exit codes and file handling.

use assert_cmd::Command;
use predicates::prelude::*;

fn svfmt() -> Command {
    Command::cargo_bin("svfmt").expect("binary builds")
}

#[test]
fn test_stdin_formatting_exit_zero() {
    svfmt()
        .write_stdin("module m;\nassign x = 1;\nendmodule\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("assign x = 1;"));
}

#[test]
fn test_diagnostics_exit_one() {
    // An unrecognized byte is a lexical diagnostic; formatting continues.
    svfmt()
        .write_stdin("wire \u{7f} w;\n")
        .assert()
        .code(1);
}

#[test]
fn test_missing_file_exit_two() {
    svfmt()
        .arg("/nonexistent/file.sv")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("file.sv"));
}

#[test]
fn test_check_mode_detects_difference() {
    svfmt()
        .arg("--check")
        .write_stdin("module m;\nassign   x=1;\nendmodule\n")
        .assert()
        .code(1);
}

#[test]
fn test_check_mode_clean_on_formatted_input() {
    // Format once, then check the output.
    let first = svfmt()
        .write_stdin("module m;\nassign x = 1;\nendmodule\n")
        .assert()
        .success();
    let formatted = String::from_utf8(first.get_output().stdout.clone()).unwrap();
    svfmt().arg("--check").write_stdin(formatted).assert().success();
}

#[test]
fn test_inplace_rewrites_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.sv");
    std::fs::write(&path, "module m;\nassign    x =1;\nendmodule\n").unwrap();
    svfmt().arg("--inplace").arg(&path).assert().success();
    let rewritten = std::fs::read_to_string(&path).unwrap();
    assert!(rewritten.contains("assign x = 1;"), "{}", rewritten);
}

#[test]
fn test_lines_flag_limits_formatting() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.sv");
    // The blank line keeps the statements in separate alignment groups.
    std::fs::write(&path, "assign   a=1;\n\nassign   b=2;\n").unwrap();
    let output = svfmt()
        .arg("--lines")
        .arg("3")
        .arg(&path)
        .assert()
        .success();
    let text = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    assert!(text.contains("assign   a=1;"), "line 1 preserved: {}", text);
    assert!(text.contains("assign b = 2;"), "line 3 formatted: {}", text);
}
