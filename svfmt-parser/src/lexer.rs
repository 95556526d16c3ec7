//! SystemVerilog lexer.
//!
//!     Tokenization runs in two stages. A logos scanner produces raw lexemes
//!     with byte spans, then a resolution pass maps identifier text through
//!     the keyword table, folds `` ` ``-directives into their preprocessor
//!     kinds, detects macro call identifiers (macro id immediately followed
//!     by `(`), and captures `` `define `` bodies as a single pseudo-token
//!     running to the end of the (possibly continued) line.
//!
//!     The output sequence is contiguous over the input and terminated with
//!     an EOF token. Unrecognized bytes become `ErrorToken`s; they stay in
//!     the sequence so contiguity holds, and their spans are reported
//!     separately for diagnostics.

use logos::Logos;

use crate::token::{keyword_kind, Span, Token, TokenKind};

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum RawLexeme {
    #[regex(r"[ \t\r\n]+")]
    Whitespace,

    #[regex(r"//[^\n]*")]
    LineComment,

    #[regex(r"/\*([^*]|\*[^/])*\*+/")]
    BlockComment,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    StringLiteral,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_$]*")]
    Identifier,

    // Escaped identifiers run from backslash to whitespace.
    #[regex(r"\\[!-~]+")]
    EscapedIdentifier,

    #[regex(r"\$[a-zA-Z_][a-zA-Z0-9_$]*")]
    SystemTfIdentifier,

    #[regex(r"`[a-zA-Z_][a-zA-Z0-9_$]*")]
    MacroIdentifier,

    // Based literals, sized or unsized: 8'hFF, 'b0101, 4'sd3
    #[regex(r"([0-9][0-9_]*)?'[sS]?[bBoOdDhH][0-9a-fA-FxXzZ_?]+")]
    BasedNumber,

    // Unbased unsized literals: '0 '1 'x 'z
    #[regex(r"'[01xXzZ]")]
    UnbasedNumber,

    #[regex(r"[0-9][0-9_]*(\.[0-9][0-9_]*)?([eE][+-]?[0-9]+)?")]
    DecimalNumber,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("::")]
    ColonColon,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,
    #[token("@")]
    At,
    #[token("#")]
    Hash,
    #[token("$")]
    Dollar,
    #[token("'")]
    Apostrophe,

    #[token("->>")]
    RArrow2,
    #[token("->")]
    RArrow,
    #[token("=>")]
    EqArrow,
    #[token("<->")]
    LtArrow,
    #[token("|->")]
    OverlapImplies,
    #[token("|=>")]
    NonOverlapImplies,

    #[token("<<<=")]
    #[token(">>>=")]
    #[token("<<=")]
    #[token(">>=")]
    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("/=")]
    #[token("%=")]
    #[token("&=")]
    #[token("|=")]
    #[token("^=")]
    AssignOp,

    #[token("<<<")]
    ArithLeftShift,
    #[token(">>>")]
    ArithRightShift,
    #[token("<<")]
    LeftShift,
    #[token(">>")]
    RightShift,
    #[token("===")]
    CaseEq,
    #[token("!==")]
    CaseNotEq,
    #[token("==?")]
    WildcardEq,
    #[token("!=?")]
    WildcardNotEq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LessEq,
    #[token(">=")]
    GreaterEq,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("**")]
    StarStar,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("~&")]
    TildeAmp,
    #[token("~|")]
    TildePipe,
    #[token("~^")]
    #[token("^~")]
    TildeCaret,

    #[token("=")]
    Equals,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("!")]
    Bang,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
}

/// Result of tokenization: the contiguous token sequence (EOF-terminated)
/// plus spans of byte ranges the scanner could not classify.
#[derive(Debug, Clone)]
pub struct LexedSource {
    pub tokens: Vec<Token>,
    pub errors: Vec<Span>,
}

fn raw_to_kind(raw: RawLexeme, text: &str) -> TokenKind {
    use RawLexeme as R;
    match raw {
        R::Whitespace => TokenKind::Whitespace,
        R::LineComment => TokenKind::LineComment,
        R::BlockComment => TokenKind::BlockComment,
        R::StringLiteral => TokenKind::StringLiteral,
        R::Identifier => keyword_kind(text).unwrap_or(TokenKind::Identifier),
        R::EscapedIdentifier => TokenKind::Identifier,
        R::SystemTfIdentifier => TokenKind::SystemTfIdentifier,
        R::MacroIdentifier => directive_kind(text),
        R::BasedNumber | R::UnbasedNumber | R::DecimalNumber => TokenKind::Number,
        R::LParen => TokenKind::LParen,
        R::RParen => TokenKind::RParen,
        R::LBracket => TokenKind::LBracket,
        R::RBracket => TokenKind::RBracket,
        R::LBrace => TokenKind::LBrace,
        R::RBrace => TokenKind::RBrace,
        R::Semicolon => TokenKind::Semicolon,
        R::Comma => TokenKind::Comma,
        R::Dot => TokenKind::Dot,
        R::ColonColon => TokenKind::ColonColon,
        R::Colon => TokenKind::Colon,
        R::Question => TokenKind::Question,
        R::At => TokenKind::At,
        R::Hash => TokenKind::Hash,
        R::Dollar => TokenKind::Dollar,
        R::Apostrophe => TokenKind::Apostrophe,
        R::RArrow2 => TokenKind::RArrow2,
        R::RArrow => TokenKind::RArrow,
        R::EqArrow => TokenKind::EqArrow,
        R::LtArrow => TokenKind::LtArrow,
        R::OverlapImplies => TokenKind::OverlapImplies,
        R::NonOverlapImplies => TokenKind::NonOverlapImplies,
        R::AssignOp => TokenKind::AssignOp,
        R::ArithLeftShift => TokenKind::ArithLeftShift,
        R::ArithRightShift => TokenKind::ArithRightShift,
        R::LeftShift => TokenKind::LeftShift,
        R::RightShift => TokenKind::RightShift,
        R::CaseEq => TokenKind::CaseEq,
        R::CaseNotEq => TokenKind::CaseNotEq,
        R::WildcardEq => TokenKind::WildcardEq,
        R::WildcardNotEq => TokenKind::WildcardNotEq,
        R::EqEq => TokenKind::EqEq,
        R::NotEq => TokenKind::NotEq,
        R::LessEq => TokenKind::LessEq,
        R::GreaterEq => TokenKind::GreaterEq,
        R::AndAnd => TokenKind::AndAnd,
        R::OrOr => TokenKind::OrOr,
        R::StarStar => TokenKind::StarStar,
        R::PlusPlus => TokenKind::PlusPlus,
        R::MinusMinus => TokenKind::MinusMinus,
        R::TildeAmp => TokenKind::TildeAmp,
        R::TildePipe => TokenKind::TildePipe,
        R::TildeCaret => TokenKind::TildeCaret,
        R::Equals => TokenKind::Equals,
        R::Plus => TokenKind::Plus,
        R::Minus => TokenKind::Minus,
        R::Star => TokenKind::Star,
        R::Slash => TokenKind::Slash,
        R::Percent => TokenKind::Percent,
        R::Amp => TokenKind::Amp,
        R::Pipe => TokenKind::Pipe,
        R::Caret => TokenKind::Caret,
        R::Tilde => TokenKind::Tilde,
        R::Bang => TokenKind::Bang,
        R::Less => TokenKind::Less,
        R::Greater => TokenKind::Greater,
    }
}

fn directive_kind(text: &str) -> TokenKind {
    match &text[1..] {
        "define" => TokenKind::PpDefine,
        "ifdef" => TokenKind::PpIfdef,
        "ifndef" => TokenKind::PpIfndef,
        "else" => TokenKind::PpElse,
        "elsif" => TokenKind::PpElsif,
        "endif" => TokenKind::PpEndif,
        "include" => TokenKind::PpInclude,
        "undef" => TokenKind::PpUndef,
        _ => TokenKind::MacroIdentifier,
    }
}

/// Length of the `` `define `` body starting at `rest`: everything up to the
/// first newline not escaped by a backslash continuation.
fn define_body_len(rest: &str) -> usize {
    let bytes = rest.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() && bytes[i + 1] == b'\n' {
            i += 2;
            continue;
        }
        if bytes[i] == b'\n' {
            break;
        }
        i += 1;
    }
    i
}

/// Tokenize `source` into a contiguous, EOF-terminated token sequence.
pub fn tokenize(source: &str) -> LexedSource {
    let mut tokens: Vec<Token> = Vec::new();
    let mut errors: Vec<Span> = Vec::new();

    // Define-body capture: after `define we expect the macro name, then an
    // optional parameter list opened immediately by '(', then the body text.
    #[derive(PartialEq)]
    enum DefineState {
        Inactive,
        ExpectName,
        AfterName,
        InParams(usize),
    }
    let mut define = DefineState::Inactive;

    let mut lexer = RawLexeme::lexer(source);
    while let Some(result) = lexer.next() {
        let span = Span::new(lexer.span().start, lexer.span().end);
        match result {
            Err(()) => {
                // Merge runs of unrecognized bytes into one error token.
                if let Some(last) = tokens.last_mut() {
                    if last.kind == TokenKind::ErrorToken && last.span.end == span.start {
                        last.span.end = span.end;
                        if let Some(e) = errors.last_mut() {
                            e.end = span.end;
                        }
                        continue;
                    }
                }
                tokens.push(Token::new(TokenKind::ErrorToken, span));
                errors.push(span);
            }
            Ok(raw) => {
                let kind = raw_to_kind(raw, &source[span.as_range()]);
                tokens.push(Token::new(kind, span));

                match define {
                    DefineState::Inactive => {
                        if kind == TokenKind::PpDefine {
                            define = DefineState::ExpectName;
                        }
                    }
                    DefineState::ExpectName => {
                        if kind == TokenKind::Identifier {
                            define = DefineState::AfterName;
                        } else if kind != TokenKind::Whitespace
                            || source[span.as_range()].contains('\n')
                        {
                            define = DefineState::Inactive;
                        }
                    }
                    DefineState::AfterName => {
                        if kind == TokenKind::LParen {
                            define = DefineState::InParams(1);
                        } else if kind == TokenKind::Whitespace {
                            // A newline before any body text means the
                            // definition is empty.
                            if source[span.as_range()].contains('\n') {
                                define = DefineState::Inactive;
                            }
                        } else {
                            // No parameter list; the body begins with this
                            // token's text, which we re-capture whole.
                            define = DefineState::Inactive;
                            tokens.pop();
                            let start = span.start;
                            let body_len = define_body_len(&source[start..]).max(span.len());
                            let consumed = span.len();
                            if body_len > consumed {
                                lexer.bump(body_len - consumed);
                            }
                            tokens.push(Token::new(
                                TokenKind::PpDefineBody,
                                Span::new(start, start + body_len),
                            ));
                        }
                    }
                    DefineState::InParams(depth) => match kind {
                        TokenKind::LParen => define = DefineState::InParams(depth + 1),
                        TokenKind::RParen => {
                            if depth == 1 {
                                // Leading blanks stay ordinary whitespace;
                                // the body starts at the first real byte.
                                let mut start = span.end;
                                let rest = source[start..].as_bytes();
                                let mut ws = 0;
                                while ws < rest.len() && (rest[ws] == b' ' || rest[ws] == b'\t') {
                                    ws += 1;
                                }
                                let body_len = define_body_len(&source[start + ws..]);
                                lexer.bump(ws + body_len);
                                if ws > 0 {
                                    tokens.push(Token::new(
                                        TokenKind::Whitespace,
                                        Span::new(start, start + ws),
                                    ));
                                    start += ws;
                                }
                                if body_len > 0 {
                                    tokens.push(Token::new(
                                        TokenKind::PpDefineBody,
                                        Span::new(start, start + body_len),
                                    ));
                                }
                                define = DefineState::Inactive;
                            } else {
                                define = DefineState::InParams(depth - 1);
                            }
                        }
                        _ => {}
                    },
                }
            }
        }
    }

    // Whitespace between `define and its name confuses the body capture in
    // the no-name case; any dangling state simply ends here.

    // Macro identifier immediately followed by '(' is a macro call.
    for i in 0..tokens.len() {
        if tokens[i].kind == TokenKind::MacroIdentifier {
            if let Some(next) = tokens.get(i + 1) {
                if next.kind == TokenKind::LParen {
                    tokens[i].kind = TokenKind::MacroCallId;
                }
            }
        }
    }

    tokens.push(Token::eof_at(source.len()));
    LexedSource { tokens, errors }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper building (kind, start, end) triples for exact assertions.
    fn kinds(source: &str) -> Vec<(TokenKind, usize, usize)> {
        tokenize(source)
            .tokens
            .iter()
            .map(|t| (t.kind, t.span.start, t.span.end))
            .collect()
    }

    #[test]
    fn test_empty_source() {
        let out = tokenize("");
        assert_eq!(out.tokens, vec![Token::eof_at(0)]);
        assert!(out.errors.is_empty());
    }

    #[test]
    fn test_simple_assign() {
        use TokenKind::*;
        assert_eq!(
            kinds("assign x = 1;"),
            vec![
                (Assign, 0, 6),
                (Whitespace, 6, 7),
                (Identifier, 7, 8),
                (Whitespace, 8, 9),
                (Equals, 9, 10),
                (Whitespace, 10, 11),
                (Number, 11, 12),
                (Semicolon, 12, 13),
                (Eof, 13, 13),
            ]
        );
    }

    #[test]
    fn test_contiguity() {
        let src = "module m;\n  wire [7:0] w = 8'hFF; // tail\nendmodule\n";
        let out = tokenize(src);
        let mut offset = 0;
        for token in &out.tokens {
            assert_eq!(token.span.start, offset, "gap before {:?}", token);
            offset = token.span.end;
        }
        assert_eq!(offset, src.len());
        assert!(out.errors.is_empty());
    }

    #[test]
    fn test_arrow_lexemes() {
        use TokenKind::*;
        assert_eq!(
            kinds("->->>=>"),
            vec![(RArrow, 0, 2), (RArrow2, 2, 5), (EqArrow, 5, 7), (Eof, 7, 7)]
        );
    }

    #[test]
    fn test_based_numbers() {
        use TokenKind::*;
        assert_eq!(
            kinds("4'hF 'b01 12"),
            vec![
                (Number, 0, 4),
                (Whitespace, 4, 5),
                (Number, 5, 9),
                (Whitespace, 9, 10),
                (Number, 10, 12),
                (Eof, 12, 12),
            ]
        );
    }

    #[test]
    fn test_comments() {
        use TokenKind::*;
        assert_eq!(
            kinds("a /* b */ // c"),
            vec![
                (Identifier, 0, 1),
                (Whitespace, 1, 2),
                (BlockComment, 2, 9),
                (Whitespace, 9, 10),
                (LineComment, 10, 14),
                (Eof, 14, 14),
            ]
        );
    }

    #[test]
    fn test_macro_call_vs_reference() {
        use TokenKind::*;
        assert_eq!(
            kinds("`foo() `bar"),
            vec![
                (MacroCallId, 0, 4),
                (LParen, 4, 5),
                (RParen, 5, 6),
                (Whitespace, 6, 7),
                (MacroIdentifier, 7, 11),
                (Eof, 11, 11),
            ]
        );
    }

    #[test]
    fn test_define_body_capture() {
        use TokenKind::*;
        let src = "`define WIDTH 8 + 2\nwire w;";
        let toks = kinds(src);
        assert_eq!(toks[0], (PpDefine, 0, 7));
        assert_eq!(toks[1], (Whitespace, 7, 8));
        assert_eq!(toks[2], (Identifier, 8, 13));
        assert_eq!(toks[3], (Whitespace, 13, 14));
        assert_eq!(toks[4], (PpDefineBody, 14, 19));
        assert_eq!(&src[14..19], "8 + 2");
        assert_eq!(toks[5].0, Whitespace);
    }

    #[test]
    fn test_define_with_params_and_continuation() {
        use TokenKind::*;
        let src = "`define MAX(a,b) ((a) > (b) \\\n ? (a) : (b))\n";
        let toks = tokenize(src).tokens;
        let body = toks
            .iter()
            .find(|t| t.kind == PpDefineBody)
            .expect("define body token");
        assert_eq!(body.text(src), "((a) > (b) \\\n ? (a) : (b))");
    }

    #[test]
    fn test_empty_define_has_no_body_token() {
        use TokenKind::*;
        let src = "`define EMPTY\nx";
        let toks = tokenize(src).tokens;
        assert!(toks.iter().all(|t| t.kind != PpDefineBody));
    }

    #[test]
    fn test_error_bytes_are_rejected_and_kept() {
        let src = "a \u{7f}\u{7f} b";
        let out = tokenize(src);
        assert_eq!(out.errors.len(), 1);
        let err = out.errors[0];
        assert_eq!(&src[err.as_range()], "\u{7f}\u{7f}");
        // Contiguity still holds.
        let mut offset = 0;
        for token in &out.tokens {
            assert_eq!(token.span.start, offset);
            offset = token.span.end;
        }
    }

    #[test]
    fn test_keywords_resolved() {
        use TokenKind::*;
        let toks = kinds("module endmodule randomize with unique");
        let just_kinds: Vec<TokenKind> = toks.iter().map(|t| t.0).collect();
        assert_eq!(
            just_kinds,
            vec![
                Module, Whitespace, EndModule, Whitespace, Randomize, Whitespace,
                With, Whitespace, OtherKeyword, Eof
            ]
        );
    }
}
