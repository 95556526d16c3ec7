//! # svfmt-format
//!
//! The SystemVerilog formatting engine: per-edge spacing annotation, the
//! token partition tree, tabular alignment of structurally similar rows,
//! best-first line wrapping, and the renderer that puts it all back
//! together while honoring format-off regions.
//!
//! The pipeline for one source unit:
//!
//!     annotate -> partition -> align -> wrap -> render
//!
//! [`formatter::format_source`] drives the whole thing on top of
//! `svfmt-parser`'s analysis.

pub mod align;
pub mod annotate;
pub mod builder;
pub mod comment_controls;
pub mod format_token;
pub mod formatter;
pub mod partition;
pub mod position;
pub mod scanners;
pub mod style;
pub mod vtree;
pub mod wrap;

pub use formatter::{format_source, format_source_with, FormatError, FormatOptions, FormatOutcome};
pub use partition::{PartitionPolicy, TokenPartitionTree, UnwrappedLine};
pub use position::{ByteOffsetSet, LineNumberSet};
pub use style::{AlignmentPolicy, FormatStyle, IndentationStyle};
