//! # svfmt-parser
//!
//! Lexical and structural analysis for SystemVerilog: the logos-based
//! lexer, the context-sensitive token rewriter that disambiguates `->` and
//! friends, the text-structure model tying buffer/tokens/view/tree
//! together, and a structural parser producing the concrete syntax tree
//! the formatter consumes.
//!
//! The pipeline for one source unit is strictly sequential:
//!
//!     lex -> context rewrite -> view filter -> parse -> text structure
//!
//! [`analyzer::SvAnalyzer`] drives the whole pipeline; the individual
//! stages are public for tools that need only part of it.

pub mod analyzer;
pub mod context;
pub mod lexer;
pub mod line_column;
pub mod parser;
pub mod structure;
pub mod token;
pub mod tree;
pub mod view;

pub use analyzer::{AnalysisPhase, ErrorSeverity, RejectedToken, SvAnalyzer};
pub use line_column::{LineColumn, LineColumnMap, LineColumnRange};
pub use structure::TextStructure;
pub use token::{Span, Token, TokenKind};
pub use tree::{NodeKind, Syntax, SyntaxNode, SyntaxTreePath};
