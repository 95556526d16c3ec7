//! Token-adjacent spacing annotation.
//!
//!     For each pair of adjacent format tokens the annotator decides how
//!     many spaces the right token requires before it and whether a line
//!     break there is forbidden, mandatory, or up to the wrap search.
//!
//!     The decision is table-driven and layered; later layers override
//!     earlier ones:
//!
//!         1. pair rules on the two token kinds
//!         2. context overrides keyed on enclosing nonterminals
//!         3. unary vs binary operator disambiguation
//!         4. comment attachment rules
//!         5. preprocessor rules
//!
//!     The computation is purely local (two tokens and their syntactic
//!     contexts); nothing here mutates shared state, so annotation is
//!     parallelizable by partition.

use svfmt_parser::{NodeKind, TokenKind};

use crate::format_token::{InterTokenInfo, PreFormatToken, SpacingOptions};
use crate::style::FormatStyle;

/// Spaces before an end-of-line comment that trails code.
const EOL_COMMENT_SPACES: usize = 2;

fn is_open(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace)
}

fn is_close(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace
        | TokenKind::MacroCallCloseToEndLine)
}

fn is_keyword_like(kind: TokenKind) -> bool {
    use TokenKind::*;
    matches!(
        kind,
        Module | EndModule | Interface | EndInterface | Package | EndPackage | Program
            | EndProgram | Class | EndClass | Function | EndFunction | Task | EndTask
            | Constraint | Extern | Initial | Always | AlwaysComb | AlwaysFf | AlwaysLatch
            | Final | Begin | End | Fork | Join | JoinAny | JoinNone | If | Else | For
            | Foreach | While | Do | Repeat | Forever | Return | Case | Casex | Casez
            | EndCase | Default | Generate | EndGenerate | Assign | Wire | Logic | Reg
            | Input | Output | Inout | Parameter | Localparam | Typedef | Enum | Struct
            | Union | Packed | Void | Randomize | With | Inside | Soft | Solve | Before
            | Disable | Property | EndProperty | Sequence | EndSequence | Posedge
            | Negedge | OtherKeyword
    )
}

fn is_binary_like(kind: TokenKind) -> bool {
    use TokenKind::*;
    matches!(
        kind,
        Plus | Minus | Star | Slash | Percent | Amp | Pipe | Caret | TildeAmp | TildePipe
            | TildeCaret | Less | Greater | LessEq | GreaterEq | EqEq | NotEq | CaseEq
            | CaseNotEq | WildcardEq | WildcardNotEq | AndAnd | OrOr | StarStar
            | LeftShift | RightShift | ArithLeftShift | ArithRightShift | Equals
            | AssignOp | EqArrow | LtArrow | LogicalImplies | ConstraintImplies
            | OverlapImplies | NonOverlapImplies
    )
}

/// Pair rules: spacing by the two token kinds alone.
fn pair_rule(left: TokenKind, right: TokenKind) -> InterTokenInfo {
    use SpacingOptions::*;
    use TokenKind::*;
    let mut info = InterTokenInfo { spaces_required: 1, break_decision: Undecided };

    match (left, right) {
        // Attachment punctuation.
        (_, Comma) | (_, Semicolon) | (_, SemicolonEndOfAssertionVariables) => {
            info.spaces_required = 0;
        }
        (_, Dot) | (Dot, _) | (_, ColonColon) | (ColonColon, _) => {
            info.spaces_required = 0;
        }
        // Call and index openers attach to what they follow.
        (Identifier | SystemTfIdentifier | Randomize, LParen) => {
            info.spaces_required = 0;
        }
        (MacroCallId, LParen) => {
            info.spaces_required = 0;
            info.break_decision = MustAppend;
        }
        (Hash, LParen) => {
            info.spaces_required = 0;
            info.break_decision = MustAppend;
        }
        (At, LParen) => {
            info.spaces_required = 0;
        }
        (Identifier | RBracket | RParen, LBracket) => {
            info.spaces_required = 0;
        }
        // Inside groups.
        (k, RParen | RBracket) if !is_close(k) => {
            info.spaces_required = 0;
        }
        (RParen | RBracket, RParen | RBracket) => {
            info.spaces_required = 0;
        }
        (LParen | LBracket, _) => {
            info.spaces_required = 0;
        }
        // Braces: concatenations attach; blocks get a space.
        (Apostrophe, LBrace) | (Number, LBrace) | (LBrace, LBrace) => {
            info.spaces_required = 0;
        }
        (LBrace, _) => {
            info.spaces_required = 0;
        }
        (_, RBrace) => {
            info.spaces_required = 0;
        }
        (Apostrophe, _) => {
            info.spaces_required = 0;
        }
        (_, Apostrophe) => {
            info.spaces_required = 1;
        }
        // Preprocessor-time glue.
        (MacroIdentifier, _) | (_, MacroIdentifier) => {
            info.spaces_required = 1;
        }
        _ => {}
    }
    info
}

/// True when `context` contains `kind`.
fn in_context(context: &[NodeKind], kind: NodeKind) -> bool {
    context.contains(&kind)
}

/// Innermost of the two kinds wins: which appears later in the context.
fn innermost_of(context: &[NodeKind], a: NodeKind, b: NodeKind) -> Option<NodeKind> {
    context
        .iter()
        .rev()
        .find(|k| **k == a || **k == b)
        .copied()
}

/// Full layered decision for the edge before `right`.
pub fn annotate_edge(
    left: Option<&PreFormatToken>,
    right: &PreFormatToken,
    left_context: &[NodeKind],
    right_context: &[NodeKind],
    source: &str,
    _style: &FormatStyle,
) -> InterTokenInfo {
    use SpacingOptions::*;
    use TokenKind::*;

    let Some(left) = left else {
        // First token of the unit: no spacing, line position comes from
        // indentation.
        return InterTokenInfo { spaces_required: 0, break_decision: Undecided };
    };
    let lkind = left.token.kind;
    let rkind = right.token.kind;

    // Layer 1: pair rules.
    let mut info = pair_rule(lkind, rkind);

    // Keyword adjacency.
    if is_keyword_like(lkind) && matches!(rkind, Identifier | Number | StringLiteral) {
        info.spaces_required = 1;
    }
    if is_keyword_like(lkind) && lkind != Randomize && rkind == LParen {
        // `if (`, `for (`, `while (`; module headers handled by context.
        info.spaces_required = 1;
    }
    if is_keyword_like(rkind) && !is_open(lkind) && lkind != Apostrophe {
        info.spaces_required = 1;
        if matches!(rkind, Begin) {
            // `) begin`, `else begin` stay on the line.
            info.break_decision = MustAppend;
        }
    }
    if matches!(rkind, Comma | Semicolon | SemicolonEndOfAssertionVariables) {
        info.spaces_required = 0;
    }

    // Binary-like operators default to one space on both sides.
    if is_binary_like(lkind) && !is_close(rkind) && info.break_decision == Undecided {
        info.spaces_required = 1;
    }
    if is_binary_like(rkind) && !is_open(lkind) {
        info.spaces_required = 1;
    }

    // Trigger statements: `-> name`.
    if matches!(lkind, Trigger | NonblockingTrigger) {
        info.spaces_required = 1;
    }

    // Layer 2: context overrides.
    if rkind == Colon {
        // Default `:` takes one space on both sides (labels, ternaries).
        info.spaces_required = 1;
        match innermost_of(
            right_context,
            NodeKind::DimensionRange,
            NodeKind::ConditionExpression,
        ) {
            Some(NodeKind::DimensionRange) => info.spaces_required = 0,
            Some(NodeKind::ConditionExpression) => info.spaces_required = 1,
            _ => {}
        }
        if in_context(right_context, NodeKind::CaseItem)
            || in_context(right_context, NodeKind::CasePatternItem)
            || in_context(right_context, NodeKind::PropertyCaseItem)
        {
            info.spaces_required = 0;
        }
    }
    if lkind == Colon {
        info.spaces_required = 1;
        match innermost_of(
            left_context,
            NodeKind::DimensionRange,
            NodeKind::ConditionExpression,
        ) {
            Some(NodeKind::DimensionRange) => info.spaces_required = 0,
            Some(NodeKind::ConditionExpression) => info.spaces_required = 1,
            _ => {}
        }
    }
    if rkind == LBracket && in_context(right_context, NodeKind::PackedDimensions) {
        // Packed dimensions follow a type name: `logic [7:0]`. Indexing
        // brackets after an identifier (`data[3]`) carry no such context
        // and stay attached.
        info.spaces_required = 1;
    }
    if matches!(rkind, LeftShift | RightShift)
        && in_context(right_context, NodeKind::StreamingConcatenation)
    {
        info.spaces_required = 0;
    }
    if matches!(lkind, LeftShift | RightShift)
        && in_context(left_context, NodeKind::StreamingConcatenation)
    {
        info.spaces_required = 0;
    }
    if rkind == LParen
        && (in_context(right_context, NodeKind::ModuleHeader)
            || in_context(right_context, NodeKind::FunctionHeader)
            || in_context(right_context, NodeKind::TaskHeader))
        && !in_context(right_context, NodeKind::FunctionCall)
        && lkind != Hash
    {
        info.spaces_required = 1;
    }

    // Layer 3: unary vs binary.
    if lkind.is_unary_operator() && in_context(left_context, NodeKind::UnaryPrefixExpression) {
        // Attach the operator to its operand.
        info.spaces_required = 0;
    }

    // Layer 4: comments.
    let right_ws = right.original_leading_spaces(source);
    let newline_before_right = right_ws.contains('\n');
    if rkind == LineComment || rkind == BlockComment {
        if newline_before_right {
            info.break_decision = MustWrap;
        } else {
            info.spaces_required = EOL_COMMENT_SPACES;
            if rkind == BlockComment {
                // Attach with the author's spacing.
                info.break_decision = Preserve;
            }
            if lkind == MacroCallCloseToEndLine {
                info.spaces_required = 1;
                info.break_decision = Undecided;
            }
        }
    } else if lkind == LineComment {
        // Nothing may follow an EOL comment on its line.
        info.break_decision = MustWrap;
    } else if lkind == BlockComment && newline_before_right {
        info.break_decision = MustWrap;
    }

    // Layer 5: preprocessor.
    if rkind.is_preprocessor() && rkind != PpDefineBody {
        info.break_decision = MustWrap;
    }
    if lkind.is_preprocessor() && lkind != PpDefineBody {
        // The controlled identifier stays on the directive's line.
        info.spaces_required = 1;
        info.break_decision = MustAppend;
    }
    if rkind == PpDefineBody {
        info.spaces_required = if right.token.span.is_empty() { 0 } else { 1 };
        info.break_decision = MustAppend;
    }
    if lkind == PpDefineBody {
        info.break_decision = MustWrap;
    }

    info
}

/// Annotate a whole pre-format token array in place. `context_of` maps a
/// token's starting byte offset to its syntax context (root-first); tokens
/// outside the tree (comments, preprocessor) get an empty context.
pub fn annotate_format_tokens<'a, F>(
    ftokens: &mut [PreFormatToken],
    source: &str,
    style: &FormatStyle,
    context_of: F,
) where
    F: Fn(usize) -> &'a [NodeKind],
{
    for i in 0..ftokens.len() {
        let (head, tail) = ftokens.split_at_mut(i);
        let right = &mut tail[0];
        let left = head.last();
        let left_ctx = left
            .map(|l| context_of(l.token.span.start))
            .unwrap_or(&[]);
        let right_ctx = context_of(right.token.span.start);
        right.before = annotate_edge(left, right, left_ctx, right_ctx, source, style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use svfmt_parser::{Span, Token};

    fn tok(kind: TokenKind, start: usize, end: usize) -> PreFormatToken {
        PreFormatToken::new(Token::new(kind, Span::new(start, end)), Span::empty_at(start))
    }

    fn edge(
        left: PreFormatToken,
        right: PreFormatToken,
        lctx: &[NodeKind],
        rctx: &[NodeKind],
        source: &str,
    ) -> InterTokenInfo {
        annotate_edge(Some(&left), &right, lctx, rctx, source, &FormatStyle::default())
    }

    #[test]
    fn test_keyword_identifier_one_space() {
        let source = "wire w";
        let info = edge(
            tok(TokenKind::Wire, 0, 4),
            tok(TokenKind::Identifier, 5, 6),
            &[],
            &[],
            source,
        );
        assert_eq!(info.spaces_required, 1);
        assert_eq!(info.break_decision, SpacingOptions::Undecided);
    }

    #[test]
    fn test_call_paren_attaches() {
        let source = "f(x)";
        let info = edge(
            tok(TokenKind::Identifier, 0, 1),
            tok(TokenKind::LParen, 1, 2),
            &[],
            &[NodeKind::FunctionCall],
            source,
        );
        assert_eq!(info.spaces_required, 0);
    }

    #[test]
    fn test_module_header_paren_spaced() {
        let source = "module m (";
        let ctx = [NodeKind::ModuleDeclaration, NodeKind::ModuleHeader];
        let info = edge(
            tok(TokenKind::Identifier, 7, 8),
            tok(TokenKind::LParen, 9, 10),
            &ctx,
            &ctx,
            source,
        );
        assert_eq!(info.spaces_required, 1);
    }

    #[test]
    fn test_dimension_range_colon_zero_spaced() {
        let source = "[7:0]";
        let ctx = [NodeKind::PackedDimensions, NodeKind::DimensionRange];
        let info = edge(
            tok(TokenKind::Number, 1, 2),
            tok(TokenKind::Colon, 2, 3),
            &ctx,
            &ctx,
            source,
        );
        assert_eq!(info.spaces_required, 0);
        let info = edge(
            tok(TokenKind::Colon, 2, 3),
            tok(TokenKind::Number, 3, 4),
            &ctx,
            &ctx,
            source,
        );
        assert_eq!(info.spaces_required, 0);
    }

    #[test]
    fn test_condition_expression_colon_one_spaced() {
        let source = "a ? b : c";
        let ctx = [NodeKind::ConditionExpression];
        let info = edge(
            tok(TokenKind::Identifier, 4, 5),
            tok(TokenKind::Colon, 6, 7),
            &ctx,
            &ctx,
            source,
        );
        assert_eq!(info.spaces_required, 1);
    }

    #[test]
    fn test_case_item_colon_attaches_left() {
        let source = "x: y";
        let ctx = [NodeKind::CaseStatement, NodeKind::CaseItem];
        let info = edge(
            tok(TokenKind::Number, 0, 1),
            tok(TokenKind::Colon, 1, 2),
            &ctx,
            &ctx,
            source,
        );
        assert_eq!(info.spaces_required, 0);
    }

    #[test]
    fn test_packed_dimensions_bracket_spacing() {
        let source = "logic [7:0] d[3]";
        let ctx = [NodeKind::PackedDimensions];
        // After a type keyword: one space.
        let info = edge(
            tok(TokenKind::Logic, 0, 5),
            tok(TokenKind::LBracket, 6, 7),
            &[],
            &ctx,
            source,
        );
        assert_eq!(info.spaces_required, 1);
        // After an identifier: attached.
        let ctx2 = [NodeKind::UnpackedDimensions, NodeKind::DimensionRange];
        let info = edge(
            tok(TokenKind::Identifier, 12, 13),
            tok(TokenKind::LBracket, 13, 14),
            &[],
            &ctx2,
            source,
        );
        assert_eq!(info.spaces_required, 0);
    }

    #[test]
    fn test_streaming_operator_zero_spaced() {
        let source = "{<<{a}}";
        let ctx = [NodeKind::StreamingConcatenation];
        let info = edge(
            tok(TokenKind::LBrace, 0, 1),
            tok(TokenKind::LeftShift, 1, 3),
            &ctx,
            &ctx,
            source,
        );
        assert_eq!(info.spaces_required, 0);
    }

    #[test]
    fn test_unary_operator_attaches_to_operand() {
        let source = "-a";
        let lctx = [NodeKind::UnaryPrefixExpression];
        let info = edge(
            tok(TokenKind::Minus, 0, 1),
            tok(TokenKind::Identifier, 1, 2),
            &lctx,
            &[],
            source,
        );
        assert_eq!(info.spaces_required, 0);
        // Binary minus keeps spaces.
        let info = edge(
            tok(TokenKind::Minus, 0, 1),
            tok(TokenKind::Identifier, 1, 2),
            &[],
            &[],
            source,
        );
        assert_eq!(info.spaces_required, 1);
    }

    #[test]
    fn test_eol_comment_spacing_and_wrap() {
        let source = "x;  // note\ny";
        let mut comment = tok(TokenKind::LineComment, 4, 11);
        comment.leading_space_span = Span::new(2, 4);
        let info = edge(tok(TokenKind::Semicolon, 1, 2), comment, &[], &[], source);
        assert_eq!(info.spaces_required, EOL_COMMENT_SPACES);
        // The token after an EOL comment must wrap.
        let mut after = tok(TokenKind::Identifier, 12, 13);
        after.leading_space_span = Span::new(11, 12);
        let info = edge(comment, after, &[], &[], source);
        assert_eq!(info.break_decision, SpacingOptions::MustWrap);
    }

    #[test]
    fn test_comment_on_own_line_must_wrap() {
        let source = "x;\n// note\n";
        let mut comment = tok(TokenKind::LineComment, 3, 10);
        comment.leading_space_span = Span::new(2, 3);
        let info = edge(tok(TokenKind::Semicolon, 1, 2), comment, &[], &[], source);
        assert_eq!(info.break_decision, SpacingOptions::MustWrap);
    }

    #[test]
    fn test_preprocessor_rules() {
        let source = "x `define N 1\n";
        let mut directive = tok(TokenKind::PpDefine, 2, 9);
        directive.leading_space_span = Span::new(1, 2);
        let info = edge(tok(TokenKind::Identifier, 0, 1), directive, &[], &[], source);
        assert_eq!(info.break_decision, SpacingOptions::MustWrap);
        let info = edge(
            directive,
            tok(TokenKind::Identifier, 10, 11),
            &[],
            &[],
            source,
        );
        assert_eq!(info.break_decision, SpacingOptions::MustAppend);
        assert_eq!(info.spaces_required, 1);
        let info = edge(
            tok(TokenKind::Identifier, 10, 11),
            tok(TokenKind::PpDefineBody, 12, 13),
            &[],
            &[],
            source,
        );
        assert_eq!(info.break_decision, SpacingOptions::MustAppend);
        assert_eq!(info.spaces_required, 1);
    }

    #[test]
    fn test_macro_close_then_comment_single_space() {
        let source = "`m() // c\n";
        let mut comment = tok(TokenKind::LineComment, 5, 9);
        comment.leading_space_span = Span::new(4, 5);
        let info = edge(
            tok(TokenKind::MacroCallCloseToEndLine, 3, 4),
            comment,
            &[],
            &[],
            source,
        );
        assert_eq!(info.spaces_required, 1);
    }
}
