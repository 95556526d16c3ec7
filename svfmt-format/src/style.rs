//! Format style configuration.
//!
//!     One record threaded explicitly through the pipeline; there is no
//!     ambient state. Loadable from a `.svfmt.yaml` file, with every field
//!     defaulted so a partial file works.

use serde::{Deserialize, Serialize};

/// How a group of rows should be aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlignmentPolicy {
    /// Align columns across the group.
    Align,
    /// Pack every token flush left (the downstream default).
    FlushLeft,
    /// Keep the original inter-token spacing.
    Preserve,
    /// Guess what the author wanted from the original spacing.
    InferUserIntent,
}

/// Indentation used for continuation constructs: one indent level or one
/// wrap level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndentationStyle {
    Indent,
    Wrap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FormatStyle {
    /// Maximum rendered line width.
    pub column_limit: usize,
    /// Spaces per indentation level.
    pub indentation_spaces: usize,
    /// Spaces for a wrapped continuation line.
    pub wrap_spaces: usize,
    /// Penalty added per character past the column limit in wrap search.
    pub over_column_limit_penalty: i32,
    /// Attempt optimal wrapping of over-long lines instead of leaving them.
    pub try_wrap_long_lines: bool,

    pub port_declarations_indentation: IndentationStyle,
    pub named_port_indentation: IndentationStyle,
    pub formal_parameters_indentation: IndentationStyle,

    pub port_declarations_alignment: AlignmentPolicy,
    pub named_port_alignment: AlignmentPolicy,
    pub named_parameter_alignment: AlignmentPolicy,
    pub formal_parameters_alignment: AlignmentPolicy,
    pub net_variable_alignment: AlignmentPolicy,
    pub class_member_variable_alignment: AlignmentPolicy,
    pub case_items_alignment: AlignmentPolicy,
    pub assignment_statement_alignment: AlignmentPolicy,
    pub enum_entries_alignment: AlignmentPolicy,
    pub struct_union_members_alignment: AlignmentPolicy,

    /// Infer-intent thresholds: force alignment when the aligned-vs-flush
    /// distance is at most `align_force_threshold`; infer flush-left when
    /// the original's excess over flush-left is at most
    /// `flush_left_threshold`; infer alignment when it is at least
    /// `align_trigger_threshold`; otherwise preserve.
    pub align_force_threshold: usize,
    pub flush_left_threshold: usize,
    pub align_trigger_threshold: usize,
}

impl Default for FormatStyle {
    fn default() -> Self {
        FormatStyle {
            column_limit: 100,
            indentation_spaces: 2,
            wrap_spaces: 4,
            over_column_limit_penalty: 100,
            try_wrap_long_lines: false,
            port_declarations_indentation: IndentationStyle::Wrap,
            named_port_indentation: IndentationStyle::Wrap,
            formal_parameters_indentation: IndentationStyle::Wrap,
            port_declarations_alignment: AlignmentPolicy::InferUserIntent,
            named_port_alignment: AlignmentPolicy::InferUserIntent,
            named_parameter_alignment: AlignmentPolicy::InferUserIntent,
            formal_parameters_alignment: AlignmentPolicy::InferUserIntent,
            net_variable_alignment: AlignmentPolicy::InferUserIntent,
            class_member_variable_alignment: AlignmentPolicy::InferUserIntent,
            case_items_alignment: AlignmentPolicy::InferUserIntent,
            assignment_statement_alignment: AlignmentPolicy::InferUserIntent,
            enum_entries_alignment: AlignmentPolicy::InferUserIntent,
            struct_union_members_alignment: AlignmentPolicy::InferUserIntent,
            align_force_threshold: 2,
            flush_left_threshold: 2,
            align_trigger_threshold: 4,
        }
    }
}

/// Errors loading a style file.
#[derive(Debug)]
pub enum StyleError {
    Io(std::io::Error),
    Parse(serde_yaml::Error),
}

impl std::fmt::Display for StyleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StyleError::Io(e) => write!(f, "cannot read style file: {}", e),
            StyleError::Parse(e) => write!(f, "cannot parse style file: {}", e),
        }
    }
}

impl std::error::Error for StyleError {}

impl FormatStyle {
    /// Load a style from a YAML file; missing fields keep their defaults.
    pub fn from_yaml_file(path: &std::path::Path) -> Result<Self, StyleError> {
        let text = std::fs::read_to_string(path).map_err(StyleError::Io)?;
        serde_yaml::from_str(&text).map_err(StyleError::Parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds_match_reference() {
        let style = FormatStyle::default();
        assert_eq!(style.align_force_threshold, 2);
        assert_eq!(style.flush_left_threshold, 2);
        assert_eq!(style.align_trigger_threshold, 4);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let style: FormatStyle =
            serde_yaml::from_str("column-limit: 80\ncase-items-alignment: align\n").unwrap();
        assert_eq!(style.column_limit, 80);
        assert_eq!(style.case_items_alignment, AlignmentPolicy::Align);
        assert_eq!(style.indentation_spaces, 2);
    }
}
