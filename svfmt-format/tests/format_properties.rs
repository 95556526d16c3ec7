//! Cross-cutting formatter properties.

use proptest::prelude::*;
use rstest::rstest;
use svfmt_format::{format_source, AlignmentPolicy, FormatStyle};

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Small well-formed statement soup for round-trip properties.
fn statement_strategy() -> impl Strategy<Value = String> {
    let ident = "[a-z][a-z0-9_]{0,6}";
    prop::collection::vec(
        prop_oneof![
            (ident, ident).prop_map(|(a, b)| format!("assign {} = {};", a, b)),
            (ident, 1u8..=64).prop_map(|(a, n)| format!("wire [{}:0] {};", n, a)),
            ident.prop_map(|a| format!("// note about {}", a)),
            (ident, ident).prop_map(|(a, b)| format!("assign {} = {} + 1;", a, b)),
        ],
        0..6,
    )
    .prop_map(|lines| {
        let mut text = lines.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        text
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Formatting never loses or reorders non-whitespace bytes.
    #[test]
    fn format_preserves_token_bytes(source in statement_strategy()) {
        let output = format_source(&source, &FormatStyle::default()).text;
        prop_assert_eq!(strip_whitespace(&source), strip_whitespace(&output));
    }

    /// Formatting twice is the same as formatting once.
    #[test]
    fn format_is_idempotent(source in statement_strategy()) {
        let style = FormatStyle::default();
        let once = format_source(&source, &style).text;
        let twice = format_source(&once, &style).text;
        prop_assert_eq!(once, twice);
    }
}

#[rstest]
#[case(AlignmentPolicy::Align)]
#[case(AlignmentPolicy::FlushLeft)]
#[case(AlignmentPolicy::Preserve)]
#[case(AlignmentPolicy::InferUserIntent)]
fn port_list_formats_under_every_policy(#[case] policy: AlignmentPolicy) {
    let style = FormatStyle {
        port_declarations_alignment: policy,
        ..FormatStyle::default()
    };
    let source = "module m(\n  input  logic a,\n  output logic bbb\n);\nendmodule\n";
    let output = format_source(source, &style).text;
    assert_eq!(
        strip_whitespace(source),
        strip_whitespace(&output),
        "policy {:?} must keep token bytes:\n{}",
        policy,
        output
    );
}
