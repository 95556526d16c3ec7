//! Structural parser.
//!
//!     The grammar proper is an external collaborator: any parser that
//!     produces the leaf/node tree shape over the filtered token view is
//!     acceptable to the rest of the toolchain. This one is a hand-written
//!     recursive descent that recognizes the constructs the formatter
//!     actually consults — declaration headers, port lists, statements,
//!     case items, and the expression contexts that drive spacing — and
//!     collapses everything else into generic statements.
//!
//!     Every view token lands in the tree exactly once, in order. The
//!     parser never fails: unexpected tokens are recorded as rejected and
//!     skipped, and a partial tree is always returned.

use crate::token::{Token, TokenKind};
use crate::tree::{NodeKind, Syntax, SyntaxNode};

/// Output of a parse: a tree (always present, possibly partial) and the
/// tokens the parser could not consume.
pub struct ParseResult {
    pub root: Syntax,
    pub rejects: Vec<Token>,
}

pub fn parse(tokens: &[Token], view: &[usize]) -> ParseResult {
    let mut parser = Parser {
        tokens,
        view,
        pos: 0,
        rejects: Vec::new(),
    };
    let root = parser.source_text();
    ParseResult { root, rejects: parser.rejects }
}

struct Parser<'a> {
    tokens: &'a [Token],
    view: &'a [usize],
    pos: usize,
    rejects: Vec<Token>,
}

impl<'a> Parser<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.view.len()
    }

    fn peek(&self) -> Option<Token> {
        self.view.get(self.pos).map(|&i| self.tokens[i])
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn peek_kind_at(&self, lookahead: usize) -> Option<TokenKind> {
        self.view
            .get(self.pos + lookahead)
            .map(|&i| self.tokens[i].kind)
    }

    /// Consume the current token as a leaf.
    fn bump(&mut self) -> Syntax {
        let token = self.peek().expect("bump past end of view");
        self.pos += 1;
        Syntax::leaf(token)
    }

    fn bump_into(&mut self, node: &mut SyntaxNode) {
        let leaf = self.bump();
        node.children.push(leaf);
    }

    /// Consume the current token when it has the expected kind.
    fn eat(&mut self, kind: TokenKind, node: &mut SyntaxNode) -> bool {
        if self.peek_kind() == Some(kind) {
            self.bump_into(node);
            true
        } else {
            false
        }
    }

    /// Record the current token as rejected and skip it.
    fn reject_one(&mut self, node: &mut SyntaxNode) {
        if let Some(token) = self.peek() {
            self.rejects.push(token);
            // Rejected tokens still belong to the tree so the formatter can
            // reproduce the text around them.
            self.bump_into(node);
        }
    }

    fn source_text(&mut self) -> Syntax {
        let mut root = SyntaxNode::new(NodeKind::Root);
        while !self.at_end() {
            let before = self.pos;
            let item = self.description_item();
            root.children.push(item);
            if self.pos == before {
                // No progress; drop one token to guarantee termination.
                self.reject_one(&mut root);
            }
        }
        Syntax::Node(root)
    }

    fn description_item(&mut self) -> Syntax {
        match self.peek_kind() {
            Some(TokenKind::Module) | Some(TokenKind::Interface) | Some(TokenKind::Program) => {
                self.block_declaration(NodeKind::ModuleDeclaration)
            }
            Some(TokenKind::Package) => self.block_declaration(NodeKind::PackageDeclaration),
            Some(TokenKind::Class) => self.block_declaration(NodeKind::ClassDeclaration),
            Some(TokenKind::Function) => self.function_like(NodeKind::FunctionDeclaration),
            Some(TokenKind::Extern) => {
                if self.peek_kind_at(1) == Some(TokenKind::Task) {
                    self.function_like(NodeKind::TaskDeclaration)
                } else {
                    self.function_like(NodeKind::FunctionDeclaration)
                }
            }
            Some(TokenKind::Task) => self.function_like(NodeKind::TaskDeclaration),
            Some(TokenKind::Constraint) => self.constraint_declaration(),
            Some(TokenKind::Property) => {
                self.body_declaration(NodeKind::PropertyDeclaration, TokenKind::EndProperty)
            }
            Some(TokenKind::Sequence) => {
                self.body_declaration(NodeKind::SequenceDeclaration, TokenKind::EndSequence)
            }
            Some(k) if k.is_preprocessor() => self.preprocessor_directive(),
            _ => self.module_item(),
        }
    }

    /// module/interface/program/package/class: header to `;`, items to the
    /// matching end keyword, optional `: label`.
    fn block_declaration(&mut self, tag: NodeKind) -> Syntax {
        let mut node = SyntaxNode::new(tag);
        let end_kind = match self.peek_kind() {
            Some(TokenKind::Module) => TokenKind::EndModule,
            Some(TokenKind::Interface) => TokenKind::EndInterface,
            Some(TokenKind::Program) => TokenKind::EndProgram,
            Some(TokenKind::Package) => TokenKind::EndPackage,
            _ => TokenKind::EndClass,
        };
        node.children.push(self.module_header(tag));
        while !self.at_end() && self.peek_kind() != Some(end_kind) {
            let before = self.pos;
            let item = self.description_item();
            node.children.push(item);
            if self.pos == before {
                self.reject_one(&mut node);
            }
        }
        self.eat(end_kind, &mut node);
        self.optional_label(&mut node);
        Syntax::Node(node)
    }

    /// Header: keyword [lifetime] name [#(params)] [(ports)] `;`.
    fn module_header(&mut self, _tag: NodeKind) -> Syntax {
        let mut header = SyntaxNode::new(NodeKind::ModuleHeader);
        self.bump_into(&mut header); // the declaration keyword
        while !self.at_end() {
            match self.peek_kind() {
                Some(TokenKind::Semicolon) => {
                    self.bump_into(&mut header);
                    break;
                }
                Some(TokenKind::Hash) => {
                    let mut params = SyntaxNode::new(NodeKind::FormalParameterList);
                    self.bump_into(&mut params); // '#'
                    if self.peek_kind() == Some(TokenKind::LParen) {
                        self.port_list_into(&mut params, NodeKind::PortDeclaration);
                    }
                    header.children.push(Syntax::Node(params));
                }
                Some(TokenKind::LParen) => {
                    let mut ports = SyntaxNode::new(NodeKind::PortDeclarationList);
                    self.port_list_into(&mut ports, NodeKind::PortDeclaration);
                    header.children.push(Syntax::Node(ports));
                }
                Some(k) if k.is_end_keyword() => break,
                _ => self.bump_into(&mut header),
            }
        }
        Syntax::Node(header)
    }

    /// `( entry, entry, ... )` where each entry becomes an `entry_tag` node.
    fn port_list_into(&mut self, list: &mut SyntaxNode, entry_tag: NodeKind) {
        self.eat(TokenKind::LParen, list);
        loop {
            match self.peek_kind() {
                None | Some(TokenKind::RParen) => break,
                Some(TokenKind::Comma) => {
                    self.bump_into(list);
                }
                Some(k) if k.is_end_keyword() => break,
                _ => {
                    let entry = self.port_entry(entry_tag);
                    list.children.push(entry);
                }
            }
        }
        self.eat(TokenKind::RParen, list);
    }

    /// One port (or parameter) declaration, or a named connection `.x(y)`.
    fn port_entry(&mut self, tag: NodeKind) -> Syntax {
        if self.peek_kind() == Some(TokenKind::Dot) {
            let mut port = SyntaxNode::new(NodeKind::ActualNamedPort);
            self.bump_into(&mut port); // '.'
            self.eat(TokenKind::Identifier, &mut port);
            if self.peek_kind() == Some(TokenKind::LParen) {
                let mut inner = SyntaxNode::new(NodeKind::ParenGroup);
                self.bump_into(&mut inner);
                while !matches!(self.peek_kind(), None | Some(TokenKind::RParen)) {
                    if self.peek_kind().is_some_and(|k| k.is_end_keyword()) {
                        break;
                    }
                    let before = self.pos;
                    let expr = self.expression();
                    inner.children.push(expr);
                    if self.peek_kind() == Some(TokenKind::Comma) {
                        self.bump_into(&mut inner);
                    } else if self.pos == before {
                        self.reject_one(&mut inner);
                    }
                }
                self.eat(TokenKind::RParen, &mut inner);
                port.children.push(Syntax::Node(inner));
            }
            return Syntax::Node(port);
        }

        let mut port = SyntaxNode::new(tag);
        // direction / parameter-ish keywords
        while matches!(
            self.peek_kind(),
            Some(TokenKind::Input)
                | Some(TokenKind::Output)
                | Some(TokenKind::Inout)
                | Some(TokenKind::Parameter)
                | Some(TokenKind::Localparam)
        ) {
            self.bump_into(&mut port);
        }
        // type keywords (wire/logic/reg/other type keywords)
        while matches!(
            self.peek_kind(),
            Some(TokenKind::Wire)
                | Some(TokenKind::Logic)
                | Some(TokenKind::Reg)
                | Some(TokenKind::OtherKeyword)
                | Some(TokenKind::Packed)
        ) {
            self.bump_into(&mut port);
            if self.peek_kind() == Some(TokenKind::LBracket) {
                let dims = self.packed_dimensions();
                port.children.push(dims);
            }
        }
        // a user-defined type name followed by the declarator
        if self.peek_kind() == Some(TokenKind::Identifier)
            && self.peek_kind_at(1) == Some(TokenKind::Identifier)
        {
            self.bump_into(&mut port);
        }
        // declarator name
        self.eat(TokenKind::Identifier, &mut port);
        // unpacked dimensions
        while self.peek_kind() == Some(TokenKind::LBracket) {
            let dims = self.unpacked_dimensions();
            port.children.push(dims);
        }
        // trailing default assignment
        if self.peek_kind() == Some(TokenKind::Equals) {
            self.bump_into(&mut port);
            let expr = self.expression();
            port.children.push(expr);
        }
        // Swallow anything unexpected up to ',' or ')' to stay in sync.
        while !matches!(
            self.peek_kind(),
            None | Some(TokenKind::Comma) | Some(TokenKind::RParen)
        ) {
            if self.peek_kind().is_some_and(|k| k.is_end_keyword()) {
                break;
            }
            self.reject_one(&mut port);
        }
        Syntax::Node(port)
    }

    /// `[` expr [`:` expr] `]` tagged as packed dimensions.
    fn packed_dimensions(&mut self) -> Syntax {
        let mut dims = SyntaxNode::new(NodeKind::PackedDimensions);
        let range = self.dimension_range();
        dims.children.push(range);
        Syntax::Node(dims)
    }

    fn unpacked_dimensions(&mut self) -> Syntax {
        let mut dims = SyntaxNode::new(NodeKind::UnpackedDimensions);
        let range = self.dimension_range();
        dims.children.push(range);
        Syntax::Node(dims)
    }

    fn dimension_range(&mut self) -> Syntax {
        let mut range = SyntaxNode::new(NodeKind::DimensionRange);
        self.eat(TokenKind::LBracket, &mut range);
        while !matches!(
            self.peek_kind(),
            None | Some(TokenKind::RBracket)
        ) {
            if self.peek_kind().is_some_and(|k| k.is_end_keyword()) {
                break;
            }
            match self.peek_kind() {
                Some(TokenKind::Colon) => self.bump_into(&mut range),
                _ => {
                    let before = self.pos;
                    let expr = self.expression();
                    range.children.push(expr);
                    if self.pos == before {
                        self.reject_one(&mut range);
                    }
                }
            }
        }
        self.eat(TokenKind::RBracket, &mut range);
        Syntax::Node(range)
    }

    /// function/task declarations, including extern prototypes.
    fn function_like(&mut self, tag: NodeKind) -> Syntax {
        let mut node = SyntaxNode::new(tag);
        let mut is_prototype = false;
        let mut header = SyntaxNode::new(match tag {
            NodeKind::TaskDeclaration => NodeKind::TaskHeader,
            _ => NodeKind::FunctionHeader,
        });
        if self.peek_kind() == Some(TokenKind::Extern) {
            is_prototype = true;
            self.bump_into(&mut header);
        }
        // keyword itself plus return type and name
        while !self.at_end() {
            match self.peek_kind() {
                Some(TokenKind::Semicolon) => {
                    self.bump_into(&mut header);
                    break;
                }
                Some(TokenKind::LParen) => {
                    let mut ports = SyntaxNode::new(NodeKind::PortDeclarationList);
                    self.port_list_into(&mut ports, NodeKind::PortDeclaration);
                    header.children.push(Syntax::Node(ports));
                }
                Some(k) if k.is_end_keyword() => break,
                _ => self.bump_into(&mut header),
            }
        }
        node.children.push(Syntax::Node(header));
        if !is_prototype {
            let end_kind = match tag {
                NodeKind::TaskDeclaration => TokenKind::EndTask,
                _ => TokenKind::EndFunction,
            };
            while !self.at_end() && self.peek_kind() != Some(end_kind) {
                let before = self.pos;
                let stmt = self.statement();
                node.children.push(stmt);
                if self.pos == before {
                    self.reject_one(&mut node);
                }
            }
            self.eat(end_kind, &mut node);
            self.optional_label(&mut node);
        }
        Syntax::Node(node)
    }

    /// `constraint name { constraint items }` or prototype.
    fn constraint_declaration(&mut self) -> Syntax {
        let mut node = SyntaxNode::new(NodeKind::ConstraintDeclaration);
        self.bump_into(&mut node); // 'constraint'
        self.eat(TokenKind::Identifier, &mut node);
        if self.peek_kind() == Some(TokenKind::LBrace) {
            let block = self.brace_group(NodeKind::ConstraintBlock);
            node.children.push(block);
        } else {
            self.eat(TokenKind::Semicolon, &mut node);
        }
        Syntax::Node(node)
    }

    /// property/sequence: tokens through the closer keyword.
    fn body_declaration(&mut self, tag: NodeKind, closer: TokenKind) -> Syntax {
        let mut node = SyntaxNode::new(tag);
        self.bump_into(&mut node);
        while !self.at_end() && self.peek_kind() != Some(closer) {
            let before = self.pos;
            let stmt = self.statement();
            node.children.push(stmt);
            if self.pos == before {
                self.reject_one(&mut node);
            }
        }
        self.eat(closer, &mut node);
        self.optional_label(&mut node);
        Syntax::Node(node)
    }

    fn preprocessor_directive(&mut self) -> Syntax {
        let mut node = SyntaxNode::new(NodeKind::PreprocessorDirective);
        self.bump_into(&mut node); // the directive token
        // `define name [body]; `include "path"; `ifdef NAME
        while matches!(
            self.peek_kind(),
            Some(TokenKind::Identifier)
                | Some(TokenKind::StringLiteral)
                | Some(TokenKind::PpDefineBody)
        ) {
            self.bump_into(&mut node);
            if matches!(
                node.children.last(),
                Some(Syntax::Leaf(t)) if t.kind == TokenKind::PpDefineBody
            ) {
                break;
            }
            // A parameterized define keeps its parameter list.
            if self.peek_kind() == Some(TokenKind::LParen) {
                let group = self.paren_group();
                node.children.push(group);
            }
        }
        Syntax::Node(node)
    }

    /// Module-level items other than nested declarations.
    fn module_item(&mut self) -> Syntax {
        match self.peek_kind() {
            Some(TokenKind::Assign) => self.continuous_assign(),
            Some(TokenKind::Input) | Some(TokenKind::Output) | Some(TokenKind::Inout) => {
                self.data_declaration()
            }
            Some(TokenKind::Wire)
            | Some(TokenKind::Reg)
            | Some(TokenKind::Logic)
            | Some(TokenKind::Parameter)
            | Some(TokenKind::Localparam)
            | Some(TokenKind::Typedef)
            | Some(TokenKind::Enum)
            | Some(TokenKind::Struct)
            | Some(TokenKind::Union) => self.data_declaration(),
            Some(TokenKind::Initial)
            | Some(TokenKind::Always)
            | Some(TokenKind::AlwaysComb)
            | Some(TokenKind::AlwaysFf)
            | Some(TokenKind::AlwaysLatch)
            | Some(TokenKind::Final) => self.procedural_block(),
            Some(TokenKind::Generate) => self.generate_region(),
            Some(TokenKind::Identifier)
                if self.peek_kind_at(1) == Some(TokenKind::Identifier)
                    && self.peek_kind_at(2) == Some(TokenKind::LParen) =>
            {
                self.instantiation()
            }
            _ => self.statement(),
        }
    }

    fn generate_region(&mut self) -> Syntax {
        let mut node = SyntaxNode::new(NodeKind::SeqBlock);
        self.bump_into(&mut node); // 'generate'
        while !self.at_end() && self.peek_kind() != Some(TokenKind::EndGenerate) {
            let before = self.pos;
            let item = self.description_item();
            node.children.push(item);
            if self.pos == before {
                self.reject_one(&mut node);
            }
        }
        self.eat(TokenKind::EndGenerate, &mut node);
        Syntax::Node(node)
    }

    /// `type inst ( .a(x), .b(y) );`
    fn instantiation(&mut self) -> Syntax {
        let mut node = SyntaxNode::new(NodeKind::DataDeclaration);
        self.bump_into(&mut node); // type name
        self.bump_into(&mut node); // instance name
        let mut ports = SyntaxNode::new(NodeKind::PortDeclarationList);
        self.port_list_into(&mut ports, NodeKind::PortDeclaration);
        node.children.push(Syntax::Node(ports));
        self.eat(TokenKind::Semicolon, &mut node);
        Syntax::Node(node)
    }

    fn continuous_assign(&mut self) -> Syntax {
        let mut node = SyntaxNode::new(NodeKind::ContinuousAssign);
        self.bump_into(&mut node); // 'assign'
        let stmt = self.assignment_statement();
        node.children.push(stmt);
        Syntax::Node(node)
    }

    /// Declarations of nets, variables, parameters, typedefs, enums.
    fn data_declaration(&mut self) -> Syntax {
        let tag = match self.peek_kind() {
            Some(TokenKind::Parameter) | Some(TokenKind::Localparam) => {
                NodeKind::ParameterDeclaration
            }
            Some(TokenKind::Typedef) => NodeKind::TypedefDeclaration,
            Some(TokenKind::Input) | Some(TokenKind::Output) | Some(TokenKind::Inout) => {
                NodeKind::PortDeclaration
            }
            _ => NodeKind::DataDeclaration,
        };
        let mut node = SyntaxNode::new(tag);
        // leading keywords and type
        while matches!(
            self.peek_kind(),
            Some(TokenKind::Input)
                | Some(TokenKind::Output)
                | Some(TokenKind::Inout)
                | Some(TokenKind::Parameter)
                | Some(TokenKind::Localparam)
                | Some(TokenKind::Typedef)
                | Some(TokenKind::Wire)
                | Some(TokenKind::Reg)
                | Some(TokenKind::Logic)
                | Some(TokenKind::OtherKeyword)
                | Some(TokenKind::Packed)
        ) {
            self.bump_into(&mut node);
            if self.peek_kind() == Some(TokenKind::LBracket) {
                let dims = self.packed_dimensions();
                node.children.push(dims);
            }
        }
        if self.peek_kind() == Some(TokenKind::Enum) {
            let enum_type = self.enum_type();
            node.children.push(enum_type);
        } else if matches!(
            self.peek_kind(),
            Some(TokenKind::Struct) | Some(TokenKind::Union)
        ) {
            let struct_type = self.struct_type();
            node.children.push(struct_type);
        }
        // declarators up to ';'
        while !self.at_end() {
            match self.peek_kind() {
                Some(TokenKind::Semicolon) => {
                    self.bump_into(&mut node);
                    break;
                }
                Some(TokenKind::Comma) => self.bump_into(&mut node),
                Some(TokenKind::Identifier) => {
                    self.bump_into(&mut node);
                    while self.peek_kind() == Some(TokenKind::LBracket) {
                        let dims = self.unpacked_dimensions();
                        node.children.push(dims);
                    }
                }
                Some(TokenKind::Equals) => {
                    self.bump_into(&mut node);
                    let expr = self.expression();
                    node.children.push(expr);
                }
                Some(k) if k.is_end_keyword() => break,
                _ => self.reject_one(&mut node),
            }
        }
        Syntax::Node(node)
    }

    /// `enum [base [dims]] { name [= expr], ... }`
    fn enum_type(&mut self) -> Syntax {
        let mut node = SyntaxNode::new(NodeKind::EnumType);
        self.bump_into(&mut node); // 'enum'
        while matches!(
            self.peek_kind(),
            Some(TokenKind::Logic) | Some(TokenKind::Reg) | Some(TokenKind::OtherKeyword)
        ) {
            self.bump_into(&mut node);
            if self.peek_kind() == Some(TokenKind::LBracket) {
                let dims = self.packed_dimensions();
                node.children.push(dims);
            }
        }
        if self.peek_kind() == Some(TokenKind::LBrace) {
            let mut list = SyntaxNode::new(NodeKind::EnumNameList);
            self.bump_into(&mut list); // '{'
            while !matches!(self.peek_kind(), None | Some(TokenKind::RBrace)) {
                let mut name = SyntaxNode::new(NodeKind::EnumName);
                self.eat(TokenKind::Identifier, &mut name);
                if self.peek_kind() == Some(TokenKind::Equals) {
                    self.bump_into(&mut name);
                    let expr = self.expression();
                    name.children.push(expr);
                }
                if name.children.is_empty() {
                    self.reject_one(&mut name);
                }
                list.children.push(Syntax::Node(name));
                if self.peek_kind() == Some(TokenKind::Comma) {
                    self.bump_into(&mut list);
                }
            }
            self.eat(TokenKind::RBrace, &mut list);
            node.children.push(Syntax::Node(list));
        }
        Syntax::Node(node)
    }

    /// `struct|union [packed] { member; ... }`
    fn struct_type(&mut self) -> Syntax {
        let mut node = SyntaxNode::new(NodeKind::StructType);
        self.bump_into(&mut node); // 'struct' or 'union'
        if self.peek_kind() == Some(TokenKind::Packed) {
            self.bump_into(&mut node);
        }
        if self.peek_kind() == Some(TokenKind::LBrace) {
            self.bump_into(&mut node);
            while !matches!(self.peek_kind(), None | Some(TokenKind::RBrace)) {
                let before = self.pos;
                let member = self.data_declaration();
                node.children.push(member);
                if self.pos == before {
                    self.reject_one(&mut node);
                }
            }
            self.eat(TokenKind::RBrace, &mut node);
        }
        Syntax::Node(node)
    }

    fn procedural_block(&mut self) -> Syntax {
        let mut node = SyntaxNode::new(NodeKind::ProceduralBlock);
        self.bump_into(&mut node); // initial/always/final
        if self.peek_kind() == Some(TokenKind::At) {
            let mut event = SyntaxNode::new(NodeKind::EventControl);
            self.bump_into(&mut event); // '@'
            if self.peek_kind() == Some(TokenKind::LParen) {
                let group = self.paren_group();
                event.children.push(group);
            } else if self.peek_kind() == Some(TokenKind::Star) {
                self.bump_into(&mut event);
            }
            node.children.push(Syntax::Node(event));
        }
        let body = self.statement();
        node.children.push(body);
        Syntax::Node(node)
    }

    fn optional_label(&mut self, node: &mut SyntaxNode) {
        if self.peek_kind() == Some(TokenKind::Colon)
            && self.peek_kind_at(1) == Some(TokenKind::Identifier)
        {
            self.bump_into(node);
            self.bump_into(node);
        }
    }

    fn statement(&mut self) -> Syntax {
        match self.peek_kind() {
            Some(TokenKind::Begin) => self.seq_block(),
            Some(TokenKind::Fork) => self.seq_block(),
            Some(TokenKind::If) => self.conditional_statement(),
            Some(TokenKind::Case) | Some(TokenKind::Casex) | Some(TokenKind::Casez) => {
                self.case_statement()
            }
            Some(TokenKind::For) => self.loop_statement(NodeKind::ForLoop),
            Some(TokenKind::Foreach) => self.loop_statement(NodeKind::ForeachLoop),
            Some(TokenKind::While) | Some(TokenKind::Repeat) => {
                self.loop_statement(NodeKind::WhileLoop)
            }
            Some(TokenKind::Forever) | Some(TokenKind::Do) => {
                let mut node = SyntaxNode::new(NodeKind::WhileLoop);
                self.bump_into(&mut node);
                let body = self.statement();
                node.children.push(body);
                Syntax::Node(node)
            }
            Some(TokenKind::Trigger) | Some(TokenKind::NonblockingTrigger) => {
                let mut node = SyntaxNode::new(NodeKind::ExpressionStatement);
                self.bump_into(&mut node);
                let expr = self.expression();
                node.children.push(expr);
                self.eat(TokenKind::Semicolon, &mut node);
                Syntax::Node(node)
            }
            Some(TokenKind::At) => {
                // Event-controlled statement: `@(...) stmt` or `@* stmt`.
                let mut node = SyntaxNode::new(NodeKind::EventControl);
                self.bump_into(&mut node);
                match self.peek_kind() {
                    Some(TokenKind::LParen) => {
                        let group = self.paren_group();
                        node.children.push(group);
                    }
                    Some(TokenKind::Star) | Some(TokenKind::Identifier) => {
                        self.bump_into(&mut node);
                    }
                    _ => {}
                }
                let stmt = self.statement();
                node.children.push(stmt);
                Syntax::Node(node)
            }
            Some(TokenKind::Hash) => {
                // Delayed statement: `#delay stmt`.
                let mut node = SyntaxNode::new(NodeKind::Statement);
                self.bump_into(&mut node);
                if matches!(
                    self.peek_kind(),
                    Some(TokenKind::Number) | Some(TokenKind::Identifier)
                ) {
                    self.bump_into(&mut node);
                }
                let stmt = self.statement();
                node.children.push(stmt);
                Syntax::Node(node)
            }
            Some(TokenKind::Wire)
            | Some(TokenKind::Reg)
            | Some(TokenKind::Logic)
            | Some(TokenKind::Parameter)
            | Some(TokenKind::Localparam)
            | Some(TokenKind::Typedef) => self.data_declaration(),
            Some(TokenKind::Assign) => self.continuous_assign(),
            Some(k) if k.is_preprocessor() => self.preprocessor_directive(),
            _ => self.simple_statement(),
        }
    }

    fn seq_block(&mut self) -> Syntax {
        let closer = if self.peek_kind() == Some(TokenKind::Begin) {
            TokenKind::End
        } else {
            TokenKind::Join
        };
        let mut node = SyntaxNode::new(NodeKind::SeqBlock);
        self.bump_into(&mut node); // begin/fork
        self.optional_label(&mut node);
        while !self.at_end() {
            match self.peek_kind() {
                Some(k)
                    if k == closer
                        || matches!(k, TokenKind::JoinAny | TokenKind::JoinNone) =>
                {
                    break;
                }
                Some(k) if k.is_end_keyword() => break,
                _ => {
                    let before = self.pos;
                    let stmt = self.statement();
                    node.children.push(stmt);
                    if self.pos == before {
                        self.reject_one(&mut node);
                    }
                }
            }
        }
        if self
            .peek_kind()
            .is_some_and(|k| matches!(k, TokenKind::End | TokenKind::Join | TokenKind::JoinAny | TokenKind::JoinNone))
        {
            self.bump_into(&mut node);
        }
        self.optional_label(&mut node);
        Syntax::Node(node)
    }

    fn conditional_statement(&mut self) -> Syntax {
        let mut node = SyntaxNode::new(NodeKind::ConditionalStatement);
        self.bump_into(&mut node); // 'if'
        if self.peek_kind() == Some(TokenKind::LParen) {
            let group = self.paren_group();
            node.children.push(group);
        }
        let body = self.statement();
        node.children.push(body);
        if self.peek_kind() == Some(TokenKind::Else) {
            self.bump_into(&mut node);
            let alt = self.statement();
            node.children.push(alt);
        }
        Syntax::Node(node)
    }

    fn loop_statement(&mut self, tag: NodeKind) -> Syntax {
        let mut node = SyntaxNode::new(tag);
        self.bump_into(&mut node); // keyword
        if self.peek_kind() == Some(TokenKind::LParen) {
            let group = self.paren_group();
            node.children.push(group);
        }
        let body = self.statement();
        node.children.push(body);
        Syntax::Node(node)
    }

    fn case_statement(&mut self) -> Syntax {
        let mut node = SyntaxNode::new(NodeKind::CaseStatement);
        self.bump_into(&mut node); // case/casex/casez
        if self.peek_kind() == Some(TokenKind::LParen) {
            let group = self.paren_group();
            node.children.push(group);
        }
        while !self.at_end() && self.peek_kind() != Some(TokenKind::EndCase) {
            if self.peek_kind().is_some_and(|k| k.is_end_keyword()) {
                break;
            }
            let before = self.pos;
            let item = self.case_item();
            node.children.push(item);
            if self.pos == before {
                self.reject_one(&mut node);
            }
        }
        self.eat(TokenKind::EndCase, &mut node);
        Syntax::Node(node)
    }

    /// `expr, expr : statement` or `default : statement`.
    fn case_item(&mut self) -> Syntax {
        let mut item = SyntaxNode::new(NodeKind::CaseItem);
        if self.peek_kind() == Some(TokenKind::Default) {
            self.bump_into(&mut item);
        } else {
            loop {
                let expr = self.expression();
                item.children.push(expr);
                if self.peek_kind() == Some(TokenKind::Comma) {
                    self.bump_into(&mut item);
                } else {
                    break;
                }
            }
        }
        self.eat(TokenKind::Colon, &mut item);
        let stmt = self.statement();
        item.children.push(stmt);
        Syntax::Node(item)
    }

    /// Assignment or expression statement, consumed through `;`.
    fn simple_statement(&mut self) -> Syntax {
        let mut node = SyntaxNode::new(NodeKind::ExpressionStatement);
        // Leading keyword statements (return/disable/...) keep the keyword.
        if self
            .peek_kind()
            .is_some_and(|k| matches!(k, TokenKind::Return | TokenKind::Disable | TokenKind::OtherKeyword))
        {
            self.bump_into(&mut node);
            if self.peek_kind() == Some(TokenKind::Semicolon) {
                self.bump_into(&mut node);
                return Syntax::Node(node);
            }
        }
        if self.peek_kind() == Some(TokenKind::Semicolon) {
            self.bump_into(&mut node);
            return Syntax::Node(node);
        }
        let stmt = self.assignment_statement();
        node.children.push(stmt);
        Syntax::Node(node)
    }

    /// `lhs (=|op=|<=) rhs ;` or a bare expression through `;`.
    fn assignment_statement(&mut self) -> Syntax {
        let mut node = SyntaxNode::new(NodeKind::AssignmentStatement);
        let lhs = self.expression();
        node.children.push(lhs);
        if matches!(
            self.peek_kind(),
            Some(TokenKind::Equals) | Some(TokenKind::AssignOp) | Some(TokenKind::LessEq)
        ) {
            self.bump_into(&mut node);
            let rhs = self.expression();
            node.children.push(rhs);
        }
        self.eat(TokenKind::Semicolon, &mut node);
        Syntax::Node(node)
    }

    fn paren_group(&mut self) -> Syntax {
        let mut group = SyntaxNode::new(NodeKind::ParenGroup);
        self.eat(TokenKind::LParen, &mut group);
        while !matches!(self.peek_kind(), None | Some(TokenKind::RParen)) {
            if self.peek_kind().is_some_and(|k| k.is_end_keyword()) {
                break;
            }
            match self.peek_kind() {
                Some(TokenKind::Semicolon) | Some(TokenKind::Comma) => {
                    self.bump_into(&mut group)
                }
                _ => {
                    let before = self.pos;
                    let expr = self.expression();
                    group.children.push(expr);
                    if self.pos == before {
                        self.reject_one(&mut group);
                    }
                }
            }
        }
        self.eat(TokenKind::RParen, &mut group);
        Syntax::Node(group)
    }

    fn brace_group(&mut self, tag: NodeKind) -> Syntax {
        let mut group = SyntaxNode::new(tag);
        self.eat(TokenKind::LBrace, &mut group);
        while !matches!(self.peek_kind(), None | Some(TokenKind::RBrace)) {
            if self.peek_kind().is_some_and(|k| k.is_end_keyword()) {
                break;
            }
            let before = self.pos;
            let stmt = self.statement();
            group.children.push(stmt);
            if self.pos == before {
                self.reject_one(&mut group);
            }
        }
        self.eat(TokenKind::RBrace, &mut group);
        Syntax::Node(group)
    }

    // ---- expressions ----

    fn expression(&mut self) -> Syntax {
        let mut expr = self.binary_expression();
        if self.peek_kind() == Some(TokenKind::Question) {
            let mut cond = SyntaxNode::new(NodeKind::ConditionExpression);
            cond.children.push(expr);
            self.bump_into(&mut cond); // '?'
            let then_expr = self.binary_expression();
            cond.children.push(then_expr);
            self.eat(TokenKind::Colon, &mut cond);
            let else_expr = self.binary_expression();
            cond.children.push(else_expr);
            expr = Syntax::Node(cond);
        }
        expr
    }

    fn is_binary_operator(kind: TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Slash
                | TokenKind::Percent
                | TokenKind::Amp
                | TokenKind::Pipe
                | TokenKind::Caret
                | TokenKind::TildeAmp
                | TokenKind::TildePipe
                | TokenKind::TildeCaret
                | TokenKind::Less
                | TokenKind::Greater
                | TokenKind::LessEq
                | TokenKind::GreaterEq
                | TokenKind::EqEq
                | TokenKind::NotEq
                | TokenKind::CaseEq
                | TokenKind::CaseNotEq
                | TokenKind::WildcardEq
                | TokenKind::WildcardNotEq
                | TokenKind::AndAnd
                | TokenKind::OrOr
                | TokenKind::StarStar
                | TokenKind::LeftShift
                | TokenKind::RightShift
                | TokenKind::ArithLeftShift
                | TokenKind::ArithRightShift
                | TokenKind::LogicalImplies
                | TokenKind::ConstraintImplies
                | TokenKind::LtArrow
                | TokenKind::OverlapImplies
                | TokenKind::NonOverlapImplies
                | TokenKind::Inside
        )
    }

    fn binary_expression(&mut self) -> Syntax {
        let first = self.unary_expression();
        if !self.peek_kind().is_some_and(Self::is_binary_operator) {
            return first;
        }
        let mut node = SyntaxNode::new(NodeKind::BinaryExpression);
        node.children.push(first);
        while self.peek_kind().is_some_and(Self::is_binary_operator) {
            self.bump_into(&mut node); // the operator
            let operand = self.unary_expression();
            node.children.push(operand);
        }
        Syntax::Node(node)
    }

    fn unary_expression(&mut self) -> Syntax {
        if self.peek_kind().is_some_and(|k| k.is_unary_operator()) {
            let mut node = SyntaxNode::new(NodeKind::UnaryPrefixExpression);
            self.bump_into(&mut node); // the operator
            let operand = self.unary_expression();
            node.children.push(operand);
            return Syntax::Node(node);
        }
        self.primary_expression()
    }

    fn primary_expression(&mut self) -> Syntax {
        match self.peek_kind() {
            Some(TokenKind::LParen) => {
                let group = self.paren_group();
                self.postfix(group)
            }
            Some(TokenKind::LBrace) => self.concatenation(),
            Some(TokenKind::Number)
            | Some(TokenKind::StringLiteral)
            | Some(TokenKind::Apostrophe) => {
                let leaf = self.bump();
                self.postfix(leaf)
            }
            _ => self.reference_or_call(),
        }
    }

    fn reference_or_call(&mut self) -> Syntax {
        match self.peek_kind() {
            Some(TokenKind::Identifier)
            | Some(TokenKind::SystemTfIdentifier)
            | Some(TokenKind::MacroIdentifier)
            | Some(TokenKind::OtherKeyword)
            | Some(TokenKind::Dollar)
            | Some(TokenKind::Randomize)
            | Some(TokenKind::Default) => {
                let leaf = self.bump();
                self.postfix(leaf)
            }
            Some(TokenKind::MacroCallId) => {
                let mut call = SyntaxNode::new(NodeKind::MacroCall);
                self.bump_into(&mut call);
                if self.peek_kind() == Some(TokenKind::LParen) {
                    let group = self.paren_group();
                    call.children.push(group);
                }
                Syntax::Node(call)
            }
            _ => {
                // Not an expression head: emit an empty expression node; the
                // caller will reject the stray token if no progress is made.
                Syntax::node(NodeKind::Expression)
            }
        }
    }

    /// Postfix chains: `.field`, `[index]`, `(args)`, `::scope`, `with`.
    fn postfix(&mut self, head: Syntax) -> Syntax {
        let mut expr = head;
        loop {
            match self.peek_kind() {
                Some(TokenKind::Dot) | Some(TokenKind::ColonColon) => {
                    let mut node = SyntaxNode::new(NodeKind::Expression);
                    node.children.push(expr);
                    self.bump_into(&mut node);
                    if matches!(
                        self.peek_kind(),
                        Some(TokenKind::Identifier) | Some(TokenKind::Randomize)
                    ) {
                        self.bump_into(&mut node);
                    }
                    expr = Syntax::Node(node);
                }
                Some(TokenKind::LBracket) => {
                    let mut node = SyntaxNode::new(NodeKind::Expression);
                    node.children.push(expr);
                    let dims = self.dimension_range();
                    node.children.push(dims);
                    expr = Syntax::Node(node);
                }
                Some(TokenKind::LParen) => {
                    let mut node = SyntaxNode::new(NodeKind::FunctionCall);
                    node.children.push(expr);
                    let group = self.paren_group();
                    node.children.push(group);
                    expr = Syntax::Node(node);
                }
                Some(TokenKind::With) => {
                    let mut node = SyntaxNode::new(NodeKind::Expression);
                    node.children.push(expr);
                    self.bump_into(&mut node); // 'with'
                    if self.peek_kind() == Some(TokenKind::LParen) {
                        let group = self.paren_group();
                        node.children.push(group);
                    }
                    if self.peek_kind() == Some(TokenKind::LBrace) {
                        let block = self.brace_group(NodeKind::ConstraintBlock);
                        node.children.push(block);
                    }
                    expr = Syntax::Node(node);
                }
                _ => break,
            }
        }
        expr
    }

    /// `{...}` concatenation, replication, or streaming concatenation.
    fn concatenation(&mut self) -> Syntax {
        let streaming = matches!(
            self.peek_kind_at(1),
            Some(TokenKind::LeftShift) | Some(TokenKind::RightShift)
        );
        let tag = if streaming {
            NodeKind::StreamingConcatenation
        } else {
            NodeKind::ConcatenationExpression
        };
        let mut node = SyntaxNode::new(tag);
        self.eat(TokenKind::LBrace, &mut node);
        while !matches!(self.peek_kind(), None | Some(TokenKind::RBrace)) {
            if self.peek_kind().is_some_and(|k| k.is_end_keyword()) {
                break;
            }
            match self.peek_kind() {
                Some(TokenKind::Comma)
                | Some(TokenKind::LeftShift)
                | Some(TokenKind::RightShift) => self.bump_into(&mut node),
                // Value-range lists: `{[1:2], [8:9]}`.
                Some(TokenKind::LBracket) => {
                    let range = self.dimension_range();
                    node.children.push(range);
                }
                _ => {
                    let before = self.pos;
                    let expr = self.expression();
                    node.children.push(expr);
                    if self.pos == before {
                        self.reject_one(&mut node);
                    }
                }
            }
        }
        self.eat(TokenKind::RBrace, &mut node);
        self.postfix(Syntax::Node(node))
    }
}
