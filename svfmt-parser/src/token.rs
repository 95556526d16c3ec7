//! Core token types shared across the lexer, rewriter, parser, and tooling.
//!
//!     A token is a category plus a byte span into the analyzed buffer. The
//!     token sequence produced by the lexer is contiguous: each token's span
//!     begins where the previous one ends, and the sequence is terminated by
//!     an EOF token whose span is empty and sits at the end of the contents.
//!
//!     Spans are offsets, not borrowed slices. Every structure that wants the
//!     token's text goes back to the owning buffer, which keeps the whole
//!     analysis relocatable (see `TextStructure::rebase`).

use std::collections::HashMap;
use std::ops::Range;

use once_cell::sync::Lazy;
use serde::Serialize;

/// Byte range into the analyzed buffer.
///
/// Half-open, `start <= end`. Copyable so tokens stay cheap to pass around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Span { start, end }
    }

    pub fn empty_at(offset: usize) -> Self {
        Span { start: offset, end: offset }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True when `self` lies entirely within `other`.
    pub fn is_subrange_of(&self, other: &Span) -> bool {
        self.start >= other.start && self.end <= other.end
    }

    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl From<Range<usize>> for Span {
    fn from(r: Range<usize>) -> Self {
        Span::new(r.start, r.end)
    }
}

/// Token categories.
///
/// Keywords that drive the lexical context machines or the spacing annotator
/// get their own variants; the rest of the LRM keyword set lexes as
/// [`TokenKind::OtherKeyword`] via the keyword table.
///
/// The `LogicalImplies`..`MacroCallCloseToEndLine` variants are rewrite
/// targets: the lexer never emits them, only the context rewriter does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    // Identifiers and literals
    Identifier,
    SystemTfIdentifier,
    MacroIdentifier,
    MacroCallId,
    MacroArg,
    Number,
    StringLiteral,

    // Trivia
    Whitespace,
    LineComment,
    BlockComment,

    // Preprocessor
    PpDefine,
    PpDefineBody,
    PpIfdef,
    PpIfndef,
    PpElse,
    PpElsif,
    PpEndif,
    PpInclude,
    PpUndef,

    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Semicolon,
    Comma,
    Dot,
    Colon,
    ColonColon,
    Question,
    At,
    Hash,
    Dollar,
    Apostrophe,

    // Operators
    Equals,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    TildeAmp,
    TildePipe,
    TildeCaret,
    Bang,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    EqEq,
    NotEq,
    CaseEq,
    CaseNotEq,
    WildcardEq,
    WildcardNotEq,
    AndAnd,
    OrOr,
    StarStar,
    PlusPlus,
    MinusMinus,
    LeftShift,
    RightShift,
    ArithLeftShift,
    ArithRightShift,
    AssignOp,
    EqArrow,
    LtArrow,

    /// Raw `->` before disambiguation.
    RArrow,
    /// Raw `->>` before disambiguation.
    RArrow2,
    /// `|->` overlapping assertion implication.
    OverlapImplies,
    /// `|=>` non-overlapping assertion implication.
    NonOverlapImplies,

    // Rewrite targets (reserved to the context rewriter)
    LogicalImplies,
    ConstraintImplies,
    Trigger,
    NonblockingTrigger,
    SemicolonEndOfAssertionVariables,
    MacroCallCloseToEndLine,

    // Keywords of interest
    Module,
    EndModule,
    Interface,
    EndInterface,
    Package,
    EndPackage,
    Program,
    EndProgram,
    Class,
    EndClass,
    Function,
    EndFunction,
    Task,
    EndTask,
    Constraint,
    Extern,
    Initial,
    Always,
    AlwaysComb,
    AlwaysFf,
    AlwaysLatch,
    Final,
    Begin,
    End,
    Fork,
    Join,
    JoinAny,
    JoinNone,
    If,
    Else,
    For,
    Foreach,
    While,
    Do,
    Repeat,
    Forever,
    Return,
    Case,
    Casex,
    Casez,
    EndCase,
    Default,
    Generate,
    EndGenerate,
    Assign,
    Wire,
    Logic,
    Reg,
    Input,
    Output,
    Inout,
    Parameter,
    Localparam,
    Typedef,
    Enum,
    Struct,
    Union,
    Packed,
    Void,
    Randomize,
    With,
    Inside,
    Soft,
    Solve,
    Before,
    Disable,
    Property,
    EndProperty,
    Sequence,
    EndSequence,
    Posedge,
    Negedge,
    OtherKeyword,

    /// Byte sequence the lexer could not classify. Stays in the sequence to
    /// keep it contiguous; also reported as a rejected token.
    ErrorToken,

    /// Sentinel terminating every token sequence.
    Eof,
}

impl TokenKind {
    /// Whitespace and comments: present in the token sequence, absent from
    /// the parser's view.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment
        )
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, TokenKind::LineComment | TokenKind::BlockComment)
    }

    pub fn is_preprocessor(&self) -> bool {
        matches!(
            self,
            TokenKind::PpDefine
                | TokenKind::PpDefineBody
                | TokenKind::PpIfdef
                | TokenKind::PpIfndef
                | TokenKind::PpElse
                | TokenKind::PpElsif
                | TokenKind::PpEndif
                | TokenKind::PpInclude
                | TokenKind::PpUndef
        )
    }

    /// Rewrite targets are reserved to the context rewriter; the lexer must
    /// never emit them directly.
    pub fn is_rewrite_target(&self) -> bool {
        matches!(
            self,
            TokenKind::LogicalImplies
                | TokenKind::ConstraintImplies
                | TokenKind::Trigger
                | TokenKind::NonblockingTrigger
                | TokenKind::SemicolonEndOfAssertionVariables
                | TokenKind::MacroCallCloseToEndLine
        )
    }

    /// The set of kinds a raw token may be rewritten to.
    pub fn permitted_rewrites(&self) -> &'static [TokenKind] {
        match self {
            TokenKind::RArrow => &[
                TokenKind::LogicalImplies,
                TokenKind::ConstraintImplies,
                TokenKind::Trigger,
            ],
            TokenKind::RArrow2 => &[TokenKind::NonblockingTrigger],
            TokenKind::Semicolon => &[TokenKind::SemicolonEndOfAssertionVariables],
            TokenKind::RParen => &[TokenKind::MacroCallCloseToEndLine],
            _ => &[],
        }
    }

    /// Keywords that close a `begin`/`fork`/declaration body and may be
    /// followed by a `: label`.
    pub fn is_end_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::End
                | TokenKind::Join
                | TokenKind::JoinAny
                | TokenKind::JoinNone
                | TokenKind::EndModule
                | TokenKind::EndInterface
                | TokenKind::EndPackage
                | TokenKind::EndProgram
                | TokenKind::EndClass
                | TokenKind::EndFunction
                | TokenKind::EndTask
                | TokenKind::EndCase
                | TokenKind::EndGenerate
                | TokenKind::EndProperty
                | TokenKind::EndSequence
        )
    }

    pub fn is_unary_operator(&self) -> bool {
        matches!(
            self,
            TokenKind::Minus
                | TokenKind::Plus
                | TokenKind::Amp
                | TokenKind::Pipe
                | TokenKind::Caret
                | TokenKind::Tilde
                | TokenKind::TildeAmp
                | TokenKind::TildePipe
                | TokenKind::TildeCaret
                | TokenKind::Bang
        )
    }
}

/// One lexed token: a category and the byte span of its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Token { kind, span }
    }

    /// The EOF sentinel for contents ending at `offset`.
    pub fn eof_at(offset: usize) -> Self {
        Token { kind: TokenKind::Eof, span: Span::empty_at(offset) }
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    /// Token text, resolved against the owning buffer.
    pub fn text<'a>(&self, contents: &'a str) -> &'a str {
        &contents[self.span.as_range()]
    }
}

/// Keyword table: identifier text to token kind.
///
/// Keywords without dedicated variants map to `OtherKeyword` so the
/// annotator still treats them as keywords for spacing purposes.
pub static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    use TokenKind::*;
    let mut m = HashMap::new();
    let pairs: &[(&str, TokenKind)] = &[
        ("module", Module),
        ("macromodule", Module),
        ("endmodule", EndModule),
        ("interface", Interface),
        ("endinterface", EndInterface),
        ("package", Package),
        ("endpackage", EndPackage),
        ("program", Program),
        ("endprogram", EndProgram),
        ("class", Class),
        ("endclass", EndClass),
        ("function", Function),
        ("endfunction", EndFunction),
        ("task", Task),
        ("endtask", EndTask),
        ("constraint", Constraint),
        ("extern", Extern),
        ("initial", Initial),
        ("always", Always),
        ("always_comb", AlwaysComb),
        ("always_ff", AlwaysFf),
        ("always_latch", AlwaysLatch),
        ("final", Final),
        ("begin", Begin),
        ("end", End),
        ("fork", Fork),
        ("join", Join),
        ("join_any", JoinAny),
        ("join_none", JoinNone),
        ("if", If),
        ("else", Else),
        ("for", For),
        ("foreach", Foreach),
        ("while", While),
        ("do", Do),
        ("repeat", Repeat),
        ("forever", Forever),
        ("return", Return),
        ("case", Case),
        ("casex", Casex),
        ("casez", Casez),
        ("endcase", EndCase),
        ("default", Default),
        ("generate", Generate),
        ("endgenerate", EndGenerate),
        ("assign", Assign),
        ("wire", Wire),
        ("logic", Logic),
        ("reg", Reg),
        ("input", Input),
        ("output", Output),
        ("inout", Inout),
        ("parameter", Parameter),
        ("localparam", Localparam),
        ("typedef", Typedef),
        ("enum", Enum),
        ("struct", Struct),
        ("union", Union),
        ("packed", Packed),
        ("void", Void),
        ("randomize", Randomize),
        ("with", With),
        ("inside", Inside),
        ("soft", Soft),
        ("solve", Solve),
        ("before", Before),
        ("disable", Disable),
        ("property", Property),
        ("endproperty", EndProperty),
        ("sequence", Sequence),
        ("endsequence", EndSequence),
        ("posedge", Posedge),
        ("negedge", Negedge),
    ];
    for (text, kind) in pairs {
        m.insert(*text, *kind);
    }
    // Remaining LRM keywords, lexed generically.
    for kw in [
        "alias", "assert", "assume", "automatic", "bind", "bit", "break", "buf",
        "byte", "chandle", "clocking", "endclocking", "cmos", "config", "endconfig",
        "const", "continue", "cover", "covergroup", "endgroup", "coverpoint",
        "cross", "deassign", "defparam", "dist", "edge", "event", "expect",
        "export", "extends", "first_match", "force", "genvar", "highz0", "highz1",
        "iff", "ignore_bins", "illegal_bins", "implements", "implies", "import",
        "int", "integer", "intersect", "let", "liblist", "library",
        "local", "longint", "matches", "modport", "nand", "new",
        "nexttime", "nmos", "nor", "noshowcancelled", "not", "notif0", "notif1",
        "null", "or", "pmos", "primitive", "endprimitive", "priority",
        "protected", "pull0", "pull1", "pulldown", "pullup", "pure", "rand",
        "randc", "randcase", "randsequence", "rcmos", "real", "realtime", "ref",
        "restrict", "rnmos", "rpmos", "rtran", "rtranif0", "rtranif1",
        "scalared", "shortint", "shortreal", "showcancelled", "signed", "specify",
        "endspecify", "specparam", "static", "string", "strong", "strong0",
        "strong1", "super", "supply0", "supply1", "table", "endtable", "tagged",
        "this", "throughout", "time", "timeprecision", "timeunit", "tran",
        "tranif0", "tranif1", "tri", "tri0", "tri1", "triand", "trior", "trireg",
        "type", "unique", "unique0", "unsigned", "until", "until_with",
        "untyped", "use", "uwire", "var", "vectored", "virtual", "wait",
        "wait_order", "wand", "weak", "weak0", "weak1", "wildcard", "wor", "xnor",
        "xor",
    ] {
        m.entry(kw).or_insert(OtherKeyword);
    }
    m
});

/// True when the identifier text is a reserved word.
pub fn keyword_kind(text: &str) -> Option<TokenKind> {
    KEYWORDS.get(text).copied()
}
