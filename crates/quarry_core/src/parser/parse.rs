//! Recursive-descent parser producing [`Program`]s.
//!
//! The parser drives the [`Scanner`] one token at a time with a single token
//! of lookahead.  Besides the tree it reports every comment it skipped (in
//! source order) and every byte offset at which a semicolon was inserted
//! automatically, which the analyzer consults for statement-boundary queries.
//!
//! Arrow parameters and destructuring assignment targets are parsed with the
//! cover grammar: the parser reads an ordinary expression and converts it to a
//! pattern once `=>` or `=` shows what it was.

use rustc_hash::FxHashSet;
use tracing::trace;

use crate::error::{QuarryError, QuarryResult};
use crate::parser::ast::*;
use crate::parser::scanner::{
    cook_template, parse_bigint_raw, Position, Scanner, ScannerState, Span, Token, TokenKind,
    TokenValue,
};

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

/// Comment style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    /// `// …`
    Line,
    /// `/* … */`
    Block,
}

/// A comment collected while parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub kind: CommentKind,
    /// Comment text without the delimiters.
    pub text: String,
    pub loc: Span,
}

/// Everything a parse produces.
#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub program: Program,
    /// Comments sorted by start offset.
    pub comments: Vec<Comment>,
    /// Offsets where automatic semicolon insertion fired.
    pub semicolons: FxHashSet<usize>,
}

/// Parse `source` as a whole program.
///
/// # Errors
///
/// Returns [`QuarryError::SyntaxError`] for the first grammar violation.
pub fn parse(source: &str, source_type: SourceType) -> QuarryResult<ParseOutput> {
    let mut parser = Parser::new(source, source_type)?;
    let program = parser.parse_program()?;
    trace!(
        statements = program.body.len(),
        comments = parser.comments.len(),
        "parsed program"
    );
    Ok(ParseOutput {
        program,
        comments: parser.comments,
        semicolons: parser.semicolons,
    })
}

/// Parse `source` as a single expression that must span the whole input.
///
/// # Errors
///
/// Returns [`QuarryError::SyntaxError`] when the text is not exactly one
/// expression.
pub fn parse_expression(source: &str) -> QuarryResult<(Expr, Vec<Comment>)> {
    let mut parser = Parser::new(source, SourceType::Module)?;
    let expr = parser.parse_expression()?;
    if parser.tok.kind != TokenKind::Eof {
        return Err(parser.unexpected());
    }
    Ok((expr, parser.comments))
}

// ─────────────────────────────────────────────────────────────────────────────
// Parser state
// ─────────────────────────────────────────────────────────────────────────────

/// Function-level grammar context.
#[derive(Debug, Clone, Copy, Default)]
struct FnContext {
    in_function: bool,
    is_async: bool,
    is_generator: bool,
}

/// A fetched token, the scanner state just before it, and the comment count
/// before the fetch (so a rewind can drop comments read past the current
/// token).
struct Lookahead {
    tok: Token,
    state: ScannerState,
    comments_len: usize,
}

pub(crate) struct Parser<'src> {
    scanner: Scanner<'src>,
    source: &'src str,
    source_type: SourceType,
    tok: Token,
    tok_state: ScannerState,
    lookahead: Option<Lookahead>,
    prev_end: Position,
    ctx: FnContext,
    comments: Vec<Comment>,
    semicolons: FxHashSet<usize>,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str, source_type: SourceType) -> QuarryResult<Self> {
        let mut scanner = Scanner::new(source);
        let mut comments = Vec::new();
        let first = Self::fetch(&mut scanner, &mut comments)?;
        Ok(Self {
            scanner,
            source,
            source_type,
            tok: first.tok,
            tok_state: first.state,
            lookahead: None,
            prev_end: Position {
                offset: 0,
                line: 1,
                column: 1,
            },
            ctx: FnContext::default(),
            comments,
            semicolons: FxHashSet::default(),
        })
    }

    // ── Token plumbing ──────────────────────────────────────────────────────

    /// Pull the next significant token, recording comments on the way.
    fn fetch(scanner: &mut Scanner<'_>, comments: &mut Vec<Comment>) -> QuarryResult<Lookahead> {
        let mut newline_in_comment = false;
        let comments_len = comments.len();
        loop {
            let state = scanner.checkpoint();
            let mut tok = scanner.next_token()?;
            if tok.kind.is_comment() {
                newline_in_comment |= tok.had_line_terminator_before;
                let kind = if tok.kind == TokenKind::SingleLineComment {
                    CommentKind::Line
                } else {
                    CommentKind::Block
                };
                let text = match tok.value {
                    TokenValue::Str(s) => s,
                    _ => String::new(),
                };
                comments.push(Comment {
                    kind,
                    text,
                    loc: tok.span,
                });
                continue;
            }
            tok.had_line_terminator_before |= newline_in_comment;
            return Ok(Lookahead {
                tok,
                state,
                comments_len,
            });
        }
    }

    fn advance(&mut self) -> QuarryResult<Token> {
        let next = match self.lookahead.take() {
            Some(la) => la,
            None => Self::fetch(&mut self.scanner, &mut self.comments)?,
        };
        self.prev_end = self.tok.span.end;
        self.tok_state = next.state;
        Ok(std::mem::replace(&mut self.tok, next.tok))
    }

    fn peek(&mut self) -> QuarryResult<&Token> {
        if self.lookahead.is_none() {
            self.lookahead = Some(Self::fetch(&mut self.scanner, &mut self.comments)?);
        }
        match &self.lookahead {
            Some(la) => Ok(&la.tok),
            None => Err(QuarryError::Internal("lookahead buffer empty".into())),
        }
    }

    fn peek_kind(&mut self) -> QuarryResult<TokenKind> {
        Ok(self.peek()?.kind)
    }

    /// Whether the lookahead token sits on the same line as the current one.
    fn peek_same_line(&mut self) -> QuarryResult<bool> {
        Ok(!self.peek()?.had_line_terminator_before)
    }

    /// Re-read the current `/` or `/=` token as a regular expression.
    fn rescan_regexp(&mut self) -> QuarryResult<()> {
        if let Some(la) = self.lookahead.take() {
            self.comments.truncate(la.comments_len);
        }
        let had_lt = self.tok.had_line_terminator_before;
        self.scanner.restore(self.tok_state.clone());
        let mut tok = self.scanner.rescan_regexp()?;
        tok.had_line_terminator_before = had_lt;
        self.tok = tok;
        Ok(())
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.tok.kind == kind
    }

    fn eat(&mut self, kind: TokenKind) -> QuarryResult<bool> {
        if self.at(kind) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: TokenKind) -> QuarryResult<Token> {
        if self.at(kind) {
            self.advance()
        } else {
            Err(self.error(format!("expected {kind:?}, found {:?}", self.tok.kind)))
        }
    }

    fn error(&self, message: String) -> QuarryError {
        QuarryError::syntax(message, self.tok.span.start.line, self.tok.span.start.column)
    }

    fn unexpected(&self) -> QuarryError {
        let text = self.tok.text(self.source);
        if self.tok.kind == TokenKind::Eof {
            self.error("unexpected end of input".into())
        } else {
            self.error(format!("unexpected token `{text}`"))
        }
    }

    /// Span from `start` to the end of the last consumed token.
    fn finish(&self, start: Position) -> Span {
        Span::new(start, self.prev_end)
    }

    fn start(&self) -> Position {
        self.tok.span.start
    }

    /// Consume a `;` or apply automatic semicolon insertion.
    fn semicolon(&mut self) -> QuarryResult<()> {
        if self.eat(TokenKind::Semicolon)? {
            return Ok(());
        }
        if self.can_insert_semicolon() {
            self.semicolons.insert(self.prev_end.offset);
            return Ok(());
        }
        Err(self.unexpected())
    }

    fn can_insert_semicolon(&self) -> bool {
        matches!(self.tok.kind, TokenKind::RightBrace | TokenKind::Eof)
            || self.tok.had_line_terminator_before
    }

    fn is_module(&self) -> bool {
        self.source_type == SourceType::Module
    }

    // ── Identifiers ─────────────────────────────────────────────────────────

    /// Whether the current token can be used as a binding or reference name.
    fn at_identifier(&self) -> bool {
        match self.tok.kind {
            TokenKind::Identifier => true,
            TokenKind::Yield => !self.ctx.is_generator,
            TokenKind::Await => !self.ctx.is_async && !(self.is_module() && !self.ctx.in_function),
            k => k.is_contextual(),
        }
    }

    fn parse_identifier(&mut self) -> QuarryResult<Ident> {
        if !self.at_identifier() {
            return Err(self.unexpected());
        }
        let tok = self.advance()?;
        Ok(Ident {
            loc: tok.span,
            name: tok.str_value().to_string(),
        })
    }

    /// Any *IdentifierName*, keywords included (after `.`, in export lists).
    fn parse_identifier_name(&mut self) -> QuarryResult<Ident> {
        if !self.tok.kind.is_identifier_name() {
            return Err(self.unexpected());
        }
        let tok = self.advance()?;
        Ok(Ident {
            loc: tok.span,
            name: tok.str_value().to_string(),
        })
    }

    fn parse_string_literal(&mut self) -> QuarryResult<StringLit> {
        if !self.at(TokenKind::StringLiteral) {
            return Err(self.error("expected string literal".into()));
        }
        let tok = self.advance()?;
        Ok(StringLit {
            loc: tok.span,
            value: tok.str_value().to_string(),
        })
    }

    // ── Program ─────────────────────────────────────────────────────────────

    fn parse_program(&mut self) -> QuarryResult<Program> {
        let start = Position {
            offset: 0,
            line: 1,
            column: 1,
        };
        let mut body = Vec::new();
        while !self.at(TokenKind::Eof) {
            body.push(self.parse_statement_list_item(true)?);
        }
        let end = self.tok.span.end;
        Ok(Program {
            loc: Span::new(start, end),
            source_type: self.source_type,
            body,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Statements
// ─────────────────────────────────────────────────────────────────────────────

impl Parser<'_> {
    /// A statement or declaration; module declarations only at top level.
    fn parse_statement_list_item(&mut self, top_level: bool) -> QuarryResult<Stmt> {
        let kind = self.tok.kind;
        match kind {
            TokenKind::Import => {
                let next = self.peek_kind()?;
                if matches!(next, TokenKind::LeftParen | TokenKind::Dot) {
                    return self.parse_statement();
                }
                if !top_level || !self.is_module() {
                    return Err(self.error("import declarations may only appear at top level of a module".into()));
                }
                self.parse_import_decl()
            }
            TokenKind::Export => {
                if !top_level || !self.is_module() {
                    return Err(self.error("export declarations may only appear at top level of a module".into()));
                }
                self.parse_export_decl()
            }
            _ => self.parse_statement(),
        }
    }

    fn is_let_declaration(&mut self) -> QuarryResult<bool> {
        if !self.at(TokenKind::Let) {
            return Ok(false);
        }
        let next = self.peek()?;
        Ok(next.kind == TokenKind::LeftBracket
            || next.kind == TokenKind::LeftBrace
            || (next.kind.is_identifier_name() && !matches!(next.kind, TokenKind::In | TokenKind::Instanceof | TokenKind::Of)))
    }

    fn is_async_function(&mut self) -> QuarryResult<bool> {
        Ok(self.at(TokenKind::Async)
            && self.peek_kind()? == TokenKind::Function
            && self.peek_same_line()?)
    }

    fn parse_statement(&mut self) -> QuarryResult<Stmt> {
        let start = self.start();
        let kind = self.tok.kind;
        match kind {
            TokenKind::LeftBrace => Ok(Stmt::Block(self.parse_block()?)),
            TokenKind::Semicolon => {
                self.advance()?;
                Ok(Stmt::Empty(EmptyStmt {
                    loc: self.finish(start),
                }))
            }
            TokenKind::Var | TokenKind::Const => {
                let decl = self.parse_var_decl(false)?;
                self.semicolon()?;
                Ok(Stmt::VarDecl(self.extend_decl(decl, start)))
            }
            TokenKind::Let if self.is_let_declaration()? => {
                let decl = self.parse_var_decl(false)?;
                self.semicolon()?;
                Ok(Stmt::VarDecl(self.extend_decl(decl, start)))
            }
            TokenKind::Function => Ok(Stmt::FnDecl(Box::new(self.parse_function_decl(false, false)?))),
            TokenKind::Async if self.is_async_function()? => {
                Ok(Stmt::FnDecl(Box::new(self.parse_function_decl(true, false)?)))
            }
            TokenKind::Class => Ok(Stmt::ClassDecl(Box::new(self.parse_class_decl(false)?))),
            TokenKind::If => self.parse_if(),
            TokenKind::For => self.parse_for(),
            TokenKind::While => {
                self.advance()?;
                let test = self.parse_paren_expression()?;
                let body = Box::new(self.parse_statement()?);
                Ok(Stmt::While(WhileStmt {
                    loc: self.finish(start),
                    test,
                    body,
                }))
            }
            TokenKind::Do => {
                self.advance()?;
                let body = Box::new(self.parse_statement()?);
                self.expect(TokenKind::While)?;
                let test = self.parse_paren_expression()?;
                // The `;` after do-while is always optional.
                self.eat(TokenKind::Semicolon)?;
                Ok(Stmt::DoWhile(DoWhileStmt {
                    loc: self.finish(start),
                    body,
                    test,
                }))
            }
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Try => self.parse_try(),
            TokenKind::Return => {
                if !self.ctx.in_function && self.is_module() {
                    return Err(self.error("'return' outside of function".into()));
                }
                self.advance()?;
                let argument = if self.at(TokenKind::Semicolon) || self.can_insert_semicolon() {
                    None
                } else {
                    Some(Box::new(self.parse_expression()?))
                };
                self.semicolon()?;
                Ok(Stmt::Return(ReturnStmt {
                    loc: self.finish(start),
                    argument,
                }))
            }
            TokenKind::Throw => {
                self.advance()?;
                if self.tok.had_line_terminator_before {
                    return Err(self.error("illegal newline after throw".into()));
                }
                let argument = Box::new(self.parse_expression()?);
                self.semicolon()?;
                Ok(Stmt::Throw(ThrowStmt {
                    loc: self.finish(start),
                    argument,
                }))
            }
            TokenKind::Break | TokenKind::Continue => {
                let is_break = self.at(TokenKind::Break);
                self.advance()?;
                let label = if self.at_identifier() && !self.tok.had_line_terminator_before {
                    Some(self.parse_identifier()?)
                } else {
                    None
                };
                self.semicolon()?;
                let loc = self.finish(start);
                Ok(if is_break {
                    Stmt::Break(BreakStmt { loc, label })
                } else {
                    Stmt::Continue(ContinueStmt { loc, label })
                })
            }
            TokenKind::Debugger => {
                self.advance()?;
                self.semicolon()?;
                Ok(Stmt::Debugger(DebuggerStmt {
                    loc: self.finish(start),
                }))
            }
            TokenKind::With => {
                if self.is_module() {
                    return Err(self.error("'with' in strict mode".into()));
                }
                self.advance()?;
                let object = self.parse_paren_expression()?;
                let body = Box::new(self.parse_statement()?);
                Ok(Stmt::With(WithStmt {
                    loc: self.finish(start),
                    object,
                    body,
                }))
            }
            _ if self.at_identifier() && self.peek_kind()? == TokenKind::Colon => {
                let label = self.parse_identifier()?;
                self.expect(TokenKind::Colon)?;
                let body = Box::new(self.parse_statement()?);
                Ok(Stmt::Labeled(LabeledStmt {
                    loc: self.finish(start),
                    label,
                    body,
                }))
            }
            _ => {
                let expr = Box::new(self.parse_expression()?);
                self.semicolon()?;
                Ok(Stmt::Expr(ExprStmt {
                    loc: self.finish(start),
                    expr,
                }))
            }
        }
    }

    /// Widen a declaration's span to cover its trailing `;`.
    fn extend_decl(&self, mut decl: VarDecl, start: Position) -> VarDecl {
        decl.loc = self.finish(start);
        decl
    }

    fn parse_block(&mut self) -> QuarryResult<BlockStmt> {
        let start = self.start();
        self.expect(TokenKind::LeftBrace)?;
        let mut body = Vec::new();
        while !self.at(TokenKind::RightBrace) {
            if self.at(TokenKind::Eof) {
                return Err(self.unexpected());
            }
            body.push(self.parse_statement_list_item(false)?);
        }
        self.advance()?;
        Ok(BlockStmt {
            loc: self.finish(start),
            body,
        })
    }

    fn parse_paren_expression(&mut self) -> QuarryResult<Box<Expr>> {
        self.expect(TokenKind::LeftParen)?;
        let expr = self.parse_expression()?;
        self.expect(TokenKind::RightParen)?;
        Ok(Box::new(expr))
    }

    /// `var`/`let`/`const` declarators, without the trailing `;`.
    fn parse_var_decl(&mut self, no_in: bool) -> QuarryResult<VarDecl> {
        let start = self.start();
        let kind = match self.advance()?.kind {
            TokenKind::Var => VarKind::Var,
            TokenKind::Let => VarKind::Let,
            _ => VarKind::Const,
        };
        let mut declarators = Vec::new();
        loop {
            let d_start = self.start();
            let id = self.parse_binding_target()?;
            let init = if self.eat(TokenKind::Equal)? {
                Some(Box::new(self.parse_assign(no_in)?))
            } else {
                None
            };
            declarators.push(VarDeclarator {
                loc: self.finish(d_start),
                id,
                init,
            });
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        Ok(VarDecl {
            loc: self.finish(start),
            kind,
            declarators,
        })
    }

    fn parse_if(&mut self) -> QuarryResult<Stmt> {
        let start = self.start();
        self.advance()?;
        let test = self.parse_paren_expression()?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.eat(TokenKind::Else)? {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Stmt::If(IfStmt {
            loc: self.finish(start),
            test,
            consequent,
            alternate,
        }))
    }

    fn parse_for(&mut self) -> QuarryResult<Stmt> {
        let start = self.start();
        self.advance()?;
        let is_await = self.at(TokenKind::Await) && (self.ctx.is_async || self.is_module());
        if is_await {
            self.advance()?;
        }
        self.expect(TokenKind::LeftParen)?;

        let init = if self.at(TokenKind::Semicolon) {
            None
        } else if self.at(TokenKind::Var) || self.at(TokenKind::Const) || self.is_let_declaration()? {
            let decl = self.parse_var_decl(true)?;
            if self.at(TokenKind::Of) || self.at(TokenKind::In) {
                return self.parse_for_in_of(start, is_await, ForInOfLeft::VarDecl(decl));
            }
            Some(ForInit::VarDecl(decl))
        } else {
            let expr = self.parse_expression_no_in()?;
            if self.at(TokenKind::Of) || self.at(TokenKind::In) {
                let pat = self.expr_to_pat(expr)?;
                return self.parse_for_in_of(start, is_await, ForInOfLeft::Pat(pat));
            }
            Some(ForInit::Expr(Box::new(expr)))
        };

        self.expect(TokenKind::Semicolon)?;
        let test = if self.at(TokenKind::Semicolon) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.expect(TokenKind::Semicolon)?;
        let update = if self.at(TokenKind::RightParen) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.expect(TokenKind::RightParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::For(ForStmt {
            loc: self.finish(start),
            init,
            test,
            update,
            body,
        }))
    }

    fn parse_for_in_of(&mut self, start: Position, is_await: bool, left: ForInOfLeft) -> QuarryResult<Stmt> {
        let is_of = self.advance()?.kind == TokenKind::Of;
        let right = Box::new(if is_of {
            self.parse_assign(false)?
        } else {
            self.parse_expression()?
        });
        self.expect(TokenKind::RightParen)?;
        let body = Box::new(self.parse_statement()?);
        let loc = self.finish(start);
        Ok(if is_of {
            Stmt::ForOf(ForOfStmt {
                loc,
                is_await,
                left,
                right,
                body,
            })
        } else {
            Stmt::ForIn(ForInStmt {
                loc,
                left,
                right,
                body,
            })
        })
    }

    fn parse_switch(&mut self) -> QuarryResult<Stmt> {
        let start = self.start();
        self.advance()?;
        let discriminant = self.parse_paren_expression()?;
        self.expect(TokenKind::LeftBrace)?;
        let mut cases = Vec::new();
        while !self.eat(TokenKind::RightBrace)? {
            let case_start = self.start();
            let test = if self.eat(TokenKind::Case)? {
                Some(self.parse_expression()?)
            } else {
                self.expect(TokenKind::Default)?;
                None
            };
            self.expect(TokenKind::Colon)?;
            let mut consequent = Vec::new();
            while !matches!(self.tok.kind, TokenKind::Case | TokenKind::Default | TokenKind::RightBrace) {
                if self.at(TokenKind::Eof) {
                    return Err(self.unexpected());
                }
                consequent.push(self.parse_statement_list_item(false)?);
            }
            cases.push(SwitchCase {
                loc: self.finish(case_start),
                test,
                consequent,
            });
        }
        Ok(Stmt::Switch(SwitchStmt {
            loc: self.finish(start),
            discriminant,
            cases,
        }))
    }

    fn parse_try(&mut self) -> QuarryResult<Stmt> {
        let start = self.start();
        self.advance()?;
        let block = Box::new(Stmt::Block(self.parse_block()?));
        let handler = if self.at(TokenKind::Catch) {
            let c_start = self.start();
            self.advance()?;
            let param = if self.eat(TokenKind::LeftParen)? {
                let pat = self.parse_binding_target()?;
                self.expect(TokenKind::RightParen)?;
                Some(pat)
            } else {
                None
            };
            let body = self.parse_block()?;
            Some(CatchClause {
                loc: self.finish(c_start),
                param,
                body,
            })
        } else {
            None
        };
        let finalizer = if self.eat(TokenKind::Finally)? {
            Some(Box::new(Stmt::Block(self.parse_block()?)))
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.error("missing catch or finally after try".into()));
        }
        Ok(Stmt::Try(TryStmt {
            loc: self.finish(start),
            block,
            handler,
            finalizer,
        }))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Functions, classes and binding patterns
// ─────────────────────────────────────────────────────────────────────────────

impl Parser<'_> {
    fn parse_function_decl(&mut self, is_async: bool, anonymous_ok: bool) -> QuarryResult<FnDecl> {
        let start = self.start();
        if is_async {
            self.advance()?;
        }
        self.expect(TokenKind::Function)?;
        let is_generator = self.eat(TokenKind::Star)?;
        let id = if anonymous_ok && self.at(TokenKind::LeftParen) {
            None
        } else {
            Some(self.parse_identifier()?)
        };
        let (params, body) = self.parse_function_rest(is_async, is_generator)?;
        Ok(FnDecl {
            loc: self.finish(start),
            id,
            is_async,
            is_generator,
            params,
            body,
        })
    }

    fn parse_function_expr(&mut self, is_async: bool) -> QuarryResult<FnExpr> {
        let start = self.start();
        if is_async {
            self.advance()?;
        }
        self.expect(TokenKind::Function)?;
        let is_generator = self.eat(TokenKind::Star)?;
        let id = if self.at(TokenKind::LeftParen) {
            None
        } else {
            Some(self.parse_identifier()?)
        };
        let (params, body) = self.parse_function_rest(is_async, is_generator)?;
        Ok(FnExpr {
            loc: self.finish(start),
            id,
            is_async,
            is_generator,
            params,
            body,
        })
    }

    /// Parameters and body, parsed in a fresh function context.
    fn parse_function_rest(&mut self, is_async: bool, is_generator: bool) -> QuarryResult<(Vec<Param>, BlockStmt)> {
        let saved = std::mem::replace(
            &mut self.ctx,
            FnContext {
                in_function: true,
                is_async,
                is_generator,
            },
        );
        let result = self
            .parse_params()
            .and_then(|params| Ok((params, self.parse_block()?)));
        self.ctx = saved;
        result
    }

    fn parse_params(&mut self) -> QuarryResult<Vec<Param>> {
        self.expect(TokenKind::LeftParen)?;
        let mut params = Vec::new();
        while !self.eat(TokenKind::RightParen)? {
            let start = self.start();
            if self.eat(TokenKind::DotDotDot)? {
                let argument = Box::new(self.parse_binding_target()?);
                let loc = self.finish(start);
                params.push(Param {
                    loc,
                    pat: Pat::Rest(Box::new(RestElement { loc, argument })),
                    default: None,
                });
                self.expect(TokenKind::RightParen)?;
                break;
            }
            let pat = self.parse_binding_target()?;
            let default = if self.eat(TokenKind::Equal)? {
                Some(self.parse_assign(false)?)
            } else {
                None
            };
            params.push(Param {
                loc: self.finish(start),
                pat,
                default,
            });
            if !self.at(TokenKind::RightParen) {
                self.expect(TokenKind::Comma)?;
            }
        }
        Ok(params)
    }

    /// An identifier, array pattern or object pattern.
    fn parse_binding_target(&mut self) -> QuarryResult<Pat> {
        match self.tok.kind {
            TokenKind::LeftBracket => self.parse_array_binding(),
            TokenKind::LeftBrace => self.parse_object_binding(),
            _ => Ok(Pat::Ident(self.parse_identifier()?)),
        }
    }

    /// A binding target with an optional `= default`.
    fn parse_binding_element(&mut self) -> QuarryResult<Pat> {
        let start = self.start();
        let target = self.parse_binding_target()?;
        if self.eat(TokenKind::Equal)? {
            let right = Box::new(self.parse_assign(false)?);
            return Ok(Pat::Assign(Box::new(AssignPat {
                loc: self.finish(start),
                left: Box::new(target),
                right,
            })));
        }
        Ok(target)
    }

    fn parse_array_binding(&mut self) -> QuarryResult<Pat> {
        let start = self.start();
        self.expect(TokenKind::LeftBracket)?;
        let mut elements = Vec::new();
        while !self.eat(TokenKind::RightBracket)? {
            if self.eat(TokenKind::Comma)? {
                elements.push(None);
                continue;
            }
            let el_start = self.start();
            if self.eat(TokenKind::DotDotDot)? {
                let argument = Box::new(self.parse_binding_target()?);
                elements.push(Some(Pat::Rest(Box::new(RestElement {
                    loc: self.finish(el_start),
                    argument,
                }))));
            } else {
                elements.push(Some(self.parse_binding_element()?));
            }
            if !self.at(TokenKind::RightBracket) {
                self.expect(TokenKind::Comma)?;
            }
        }
        Ok(Pat::Array(Box::new(ArrayPat {
            loc: self.finish(start),
            elements,
        })))
    }

    fn parse_object_binding(&mut self) -> QuarryResult<Pat> {
        let start = self.start();
        self.expect(TokenKind::LeftBrace)?;
        let mut properties = Vec::new();
        while !self.eat(TokenKind::RightBrace)? {
            let p_start = self.start();
            if self.eat(TokenKind::DotDotDot)? {
                let argument = Box::new(self.parse_binding_target()?);
                properties.push(ObjectPatProp::Rest(RestElement {
                    loc: self.finish(p_start),
                    argument,
                }));
            } else if self.at_identifier() && self.peek_kind()? != TokenKind::Colon {
                let key = self.parse_identifier()?;
                let value = if self.eat(TokenKind::Equal)? {
                    Some(Box::new(self.parse_assign(false)?))
                } else {
                    None
                };
                properties.push(ObjectPatProp::Assign(AssignPatProp {
                    loc: self.finish(p_start),
                    key,
                    value,
                }));
            } else {
                let key = self.parse_property_key()?;
                self.expect(TokenKind::Colon)?;
                let value = self.parse_binding_element()?;
                properties.push(ObjectPatProp::KeyValue(KeyValuePatProp {
                    loc: self.finish(p_start),
                    key,
                    value,
                }));
            }
            if !self.at(TokenKind::RightBrace) {
                self.expect(TokenKind::Comma)?;
            }
        }
        Ok(Pat::Object(Box::new(ObjectPat {
            loc: self.finish(start),
            properties,
        })))
    }

    fn parse_property_key(&mut self) -> QuarryResult<PropKey> {
        match self.tok.kind {
            TokenKind::StringLiteral => Ok(PropKey::Str(self.parse_string_literal()?)),
            TokenKind::NumericLiteral => {
                let tok = self.advance()?;
                let value = match tok.value {
                    TokenValue::Number(n) => n,
                    _ => f64::NAN,
                };
                Ok(PropKey::Num(NumLit {
                    loc: tok.span,
                    value,
                    raw: tok.text(self.source).to_string(),
                }))
            }
            TokenKind::LeftBracket => {
                self.advance()?;
                let expr = self.parse_assign(false)?;
                self.expect(TokenKind::RightBracket)?;
                Ok(PropKey::Computed(Box::new(expr)))
            }
            TokenKind::PrivateIdentifier => {
                let tok = self.advance()?;
                Ok(PropKey::Private(PrivateIdent {
                    loc: tok.span,
                    name: tok.str_value().to_string(),
                }))
            }
            _ => Ok(PropKey::Ident(self.parse_identifier_name()?)),
        }
    }

    /// Whether the token after a `get`/`set`/`async`/`static` modifier shows
    /// that the word is really the member name.
    fn modifier_is_name(&mut self) -> QuarryResult<bool> {
        Ok(matches!(
            self.peek_kind()?,
            TokenKind::LeftParen | TokenKind::Equal | TokenKind::Semicolon | TokenKind::RightBrace | TokenKind::Comma | TokenKind::Colon
        ))
    }

    // ── Classes ─────────────────────────────────────────────────────────────

    fn parse_class_decl(&mut self, anonymous_ok: bool) -> QuarryResult<ClassDecl> {
        let start = self.start();
        self.expect(TokenKind::Class)?;
        let id = if anonymous_ok && matches!(self.tok.kind, TokenKind::LeftBrace | TokenKind::Extends) {
            None
        } else {
            Some(self.parse_identifier()?)
        };
        let (super_class, body) = self.parse_class_tail()?;
        Ok(ClassDecl {
            loc: self.finish(start),
            id,
            super_class,
            body,
        })
    }

    fn parse_class_expr(&mut self) -> QuarryResult<ClassExpr> {
        let start = self.start();
        self.expect(TokenKind::Class)?;
        let id = if self.at_identifier() {
            Some(self.parse_identifier()?)
        } else {
            None
        };
        let (super_class, body) = self.parse_class_tail()?;
        Ok(ClassExpr {
            loc: self.finish(start),
            id,
            super_class,
            body,
        })
    }

    fn parse_class_tail(&mut self) -> QuarryResult<(Option<Box<Expr>>, ClassBody)> {
        let super_class = if self.eat(TokenKind::Extends)? {
            Some(Box::new(self.parse_lhs_expression()?))
        } else {
            None
        };
        let start = self.start();
        self.expect(TokenKind::LeftBrace)?;
        let mut members = Vec::new();
        while !self.eat(TokenKind::RightBrace)? {
            if self.eat(TokenKind::Semicolon)? {
                continue;
            }
            members.push(self.parse_class_member()?);
        }
        Ok((
            super_class,
            ClassBody {
                loc: self.finish(start),
                body: members,
            },
        ))
    }

    fn parse_class_member(&mut self) -> QuarryResult<ClassMember> {
        let start = self.start();
        let mut is_static = false;
        if self.at(TokenKind::Static) && !self.modifier_is_name()? {
            self.advance()?;
            is_static = true;
            if self.at(TokenKind::LeftBrace) {
                let saved = std::mem::replace(
                    &mut self.ctx,
                    FnContext {
                        in_function: true,
                        ..FnContext::default()
                    },
                );
                let block = self.parse_block();
                self.ctx = saved;
                return Ok(ClassMember::StaticBlock(StaticBlock {
                    loc: self.finish(start),
                    body: block?.body,
                }));
            }
        }
        let mut is_async = false;
        if self.at(TokenKind::Async) && !self.modifier_is_name()? && self.peek_same_line()? {
            self.advance()?;
            is_async = true;
        }
        let is_generator = self.eat(TokenKind::Star)?;
        let mut kind = MethodKind::Method;
        if (self.at(TokenKind::Get) || self.at(TokenKind::Set))
            && !is_async
            && !is_generator
            && !self.modifier_is_name()?
        {
            kind = if self.advance()?.kind == TokenKind::Get {
                MethodKind::Get
            } else {
                MethodKind::Set
            };
        }
        let key = self.parse_property_key()?;
        if self.at(TokenKind::LeftParen) {
            let is_constructor_name = match &key {
                PropKey::Ident(id) => id.name == "constructor",
                PropKey::Str(s) => s.value == "constructor",
                _ => false,
            };
            if !is_static && kind == MethodKind::Method && is_constructor_name {
                kind = MethodKind::Constructor;
            }
            let value = self.parse_method(is_async, is_generator)?;
            return Ok(ClassMember::Method(MethodDef {
                loc: self.finish(start),
                is_static,
                kind,
                key,
                value,
            }));
        }
        let value = if self.eat(TokenKind::Equal)? {
            let saved = std::mem::replace(
                &mut self.ctx,
                FnContext {
                    in_function: true,
                    ..FnContext::default()
                },
            );
            let value = self.parse_assign(false);
            self.ctx = saved;
            Some(Box::new(value?))
        } else {
            None
        };
        self.semicolon()?;
        Ok(ClassMember::Property(PropertyDef {
            loc: self.finish(start),
            is_static,
            key,
            value,
        }))
    }

    /// Method parameters and body; the function node starts at `(`.
    fn parse_method(&mut self, is_async: bool, is_generator: bool) -> QuarryResult<FnExpr> {
        let start = self.start();
        let (params, body) = self.parse_function_rest(is_async, is_generator)?;
        Ok(FnExpr {
            loc: self.finish(start),
            id: None,
            is_async,
            is_generator,
            params,
            body,
        })
    }

    // ── Modules ─────────────────────────────────────────────────────────────

    fn parse_module_export_name(&mut self) -> QuarryResult<ModuleExportName> {
        if self.at(TokenKind::StringLiteral) {
            Ok(ModuleExportName::Str(self.parse_string_literal()?))
        } else {
            Ok(ModuleExportName::Ident(self.parse_identifier_name()?))
        }
    }

    fn parse_import_attributes(&mut self) -> QuarryResult<Vec<ImportAttribute>> {
        let is_assert = self.at(TokenKind::Identifier)
            && self.tok.str_value() == "assert"
            && !self.tok.had_line_terminator_before;
        if !self.at(TokenKind::With) && !is_assert {
            return Ok(Vec::new());
        }
        self.advance()?;
        self.expect(TokenKind::LeftBrace)?;
        let mut attributes = Vec::new();
        while !self.eat(TokenKind::RightBrace)? {
            let start = self.start();
            let key = if self.at(TokenKind::StringLiteral) {
                self.parse_string_literal()?.value
            } else {
                self.parse_identifier_name()?.name
            };
            self.expect(TokenKind::Colon)?;
            let value = self.parse_string_literal()?;
            attributes.push(ImportAttribute {
                loc: self.finish(start),
                key,
                value,
            });
            if !self.at(TokenKind::RightBrace) {
                self.expect(TokenKind::Comma)?;
            }
        }
        Ok(attributes)
    }

    fn parse_import_decl(&mut self) -> QuarryResult<Stmt> {
        let start = self.start();
        self.expect(TokenKind::Import)?;
        let mut specifiers = Vec::new();
        if !self.at(TokenKind::StringLiteral) {
            if self.at_identifier() {
                let local = self.parse_identifier()?;
                specifiers.push(ImportSpecifier::Default(ImportDefaultSpecifier {
                    loc: local.loc,
                    local,
                }));
                self.eat(TokenKind::Comma)?;
            }
            if self.at(TokenKind::Star) {
                let s_start = self.start();
                self.advance()?;
                self.expect(TokenKind::As)?;
                let local = self.parse_identifier()?;
                specifiers.push(ImportSpecifier::Namespace(ImportNamespaceSpecifier {
                    loc: self.finish(s_start),
                    local,
                }));
            } else if self.eat(TokenKind::LeftBrace)? {
                while !self.eat(TokenKind::RightBrace)? {
                    let s_start = self.start();
                    let imported = self.parse_module_export_name()?;
                    let local = if self.eat(TokenKind::As)? {
                        self.parse_identifier()?
                    } else {
                        match &imported {
                            ModuleExportName::Ident(id) => id.clone(),
                            ModuleExportName::Str(_) => return Err(self.error("string import name requires `as`".into())),
                        }
                    };
                    specifiers.push(ImportSpecifier::Named(ImportNamedSpecifier {
                        loc: self.finish(s_start),
                        imported,
                        local,
                    }));
                    if !self.at(TokenKind::RightBrace) {
                        self.expect(TokenKind::Comma)?;
                    }
                }
            }
            self.expect(TokenKind::From)?;
        }
        let source = self.parse_string_literal()?;
        let attributes = self.parse_import_attributes()?;
        self.semicolon()?;
        Ok(Stmt::Import(ImportDecl {
            loc: self.finish(start),
            specifiers,
            source,
            attributes,
        }))
    }

    fn parse_export_decl(&mut self) -> QuarryResult<Stmt> {
        let start = self.start();
        self.expect(TokenKind::Export)?;

        if self.eat(TokenKind::Star)? {
            let exported = if self.eat(TokenKind::As)? {
                Some(self.parse_module_export_name()?)
            } else {
                None
            };
            self.expect(TokenKind::From)?;
            let source = self.parse_string_literal()?;
            let attributes = self.parse_import_attributes()?;
            self.semicolon()?;
            return Ok(Stmt::ExportAll(ExportAllDecl {
                loc: self.finish(start),
                exported,
                source,
                attributes,
            }));
        }

        if self.eat(TokenKind::Default)? {
            let declaration = if self.at(TokenKind::Function) {
                ExportDefaultExpr::Fn(Box::new(self.parse_function_decl(false, true)?))
            } else if self.is_async_function()? {
                ExportDefaultExpr::Fn(Box::new(self.parse_function_decl(true, true)?))
            } else if self.at(TokenKind::Class) {
                ExportDefaultExpr::Class(Box::new(self.parse_class_decl(true)?))
            } else {
                let expr = self.parse_assign(false)?;
                self.semicolon()?;
                ExportDefaultExpr::Expr(Box::new(expr))
            };
            return Ok(Stmt::ExportDefault(ExportDefaultDecl {
                loc: self.finish(start),
                declaration,
            }));
        }

        if self.eat(TokenKind::LeftBrace)? {
            let mut specifiers = Vec::new();
            while !self.eat(TokenKind::RightBrace)? {
                let s_start = self.start();
                let local = self.parse_module_export_name()?;
                let exported = if self.eat(TokenKind::As)? {
                    self.parse_module_export_name()?
                } else {
                    local.clone()
                };
                specifiers.push(ExportSpecifier {
                    loc: self.finish(s_start),
                    local,
                    exported,
                });
                if !self.at(TokenKind::RightBrace) {
                    self.expect(TokenKind::Comma)?;
                }
            }
            let (source, attributes) = if self.eat(TokenKind::From)? {
                (Some(self.parse_string_literal()?), self.parse_import_attributes()?)
            } else {
                (None, Vec::new())
            };
            self.semicolon()?;
            return Ok(Stmt::ExportNamed(ExportNamedDecl {
                loc: self.finish(start),
                specifiers,
                source,
                declaration: None,
                attributes,
            }));
        }

        let declaration = match self.tok.kind {
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                let decl_start = self.start();
                let decl = self.parse_var_decl(false)?;
                self.semicolon()?;
                Stmt::VarDecl(self.extend_decl(decl, decl_start))
            }
            TokenKind::Function => Stmt::FnDecl(Box::new(self.parse_function_decl(false, false)?)),
            TokenKind::Async => Stmt::FnDecl(Box::new(self.parse_function_decl(true, false)?)),
            TokenKind::Class => Stmt::ClassDecl(Box::new(self.parse_class_decl(false)?)),
            _ => return Err(self.unexpected()),
        };
        Ok(Stmt::ExportNamed(ExportNamedDecl {
            loc: self.finish(start),
            specifiers: Vec::new(),
            source: None,
            declaration: Some(Box::new(declaration)),
            attributes: Vec::new(),
        }))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Expressions
// ─────────────────────────────────────────────────────────────────────────────

/// A binary operator token resolved to its node operator.
#[derive(Clone, Copy)]
enum BinOp {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

/// Binding power of the binary operator at `kind`, if it is one.
fn binary_operator(kind: TokenKind, no_in: bool) -> Option<(u8, BinOp)> {
    use BinOp::{Binary, Logical};
    let entry = match kind {
        TokenKind::QuestionQuestion => (1, Logical(LogicalOp::NullishCoalesce)),
        TokenKind::PipePipe => (2, Logical(LogicalOp::Or)),
        TokenKind::AmpersandAmpersand => (3, Logical(LogicalOp::And)),
        TokenKind::Pipe => (4, Binary(BinaryOp::BitOr)),
        TokenKind::Caret => (5, Binary(BinaryOp::BitXor)),
        TokenKind::Ampersand => (6, Binary(BinaryOp::BitAnd)),
        TokenKind::EqualEqual => (7, Binary(BinaryOp::Eq)),
        TokenKind::BangEqual => (7, Binary(BinaryOp::NotEq)),
        TokenKind::EqualEqualEqual => (7, Binary(BinaryOp::StrictEq)),
        TokenKind::BangEqualEqual => (7, Binary(BinaryOp::StrictNotEq)),
        TokenKind::Less => (8, Binary(BinaryOp::Lt)),
        TokenKind::LessEqual => (8, Binary(BinaryOp::LtEq)),
        TokenKind::Greater => (8, Binary(BinaryOp::Gt)),
        TokenKind::GreaterEqual => (8, Binary(BinaryOp::GtEq)),
        TokenKind::Instanceof => (8, Binary(BinaryOp::Instanceof)),
        TokenKind::In if !no_in => (8, Binary(BinaryOp::In)),
        TokenKind::LessLess => (9, Binary(BinaryOp::Shl)),
        TokenKind::GreaterGreater => (9, Binary(BinaryOp::Shr)),
        TokenKind::GreaterGreaterGreater => (9, Binary(BinaryOp::UShr)),
        TokenKind::Plus => (10, Binary(BinaryOp::Add)),
        TokenKind::Minus => (10, Binary(BinaryOp::Sub)),
        TokenKind::Star => (11, Binary(BinaryOp::Mul)),
        TokenKind::Slash => (11, Binary(BinaryOp::Div)),
        TokenKind::Percent => (11, Binary(BinaryOp::Rem)),
        TokenKind::StarStar => (12, Binary(BinaryOp::Exp)),
        _ => return None,
    };
    Some(entry)
}

fn assign_operator(kind: TokenKind) -> Option<AssignOp> {
    Some(match kind {
        TokenKind::Equal => AssignOp::Assign,
        TokenKind::PlusEqual => AssignOp::AddAssign,
        TokenKind::MinusEqual => AssignOp::SubAssign,
        TokenKind::StarEqual => AssignOp::MulAssign,
        TokenKind::SlashEqual => AssignOp::DivAssign,
        TokenKind::PercentEqual => AssignOp::RemAssign,
        TokenKind::StarStarEqual => AssignOp::ExpAssign,
        TokenKind::LessLessEqual => AssignOp::ShlAssign,
        TokenKind::GreaterGreaterEqual => AssignOp::ShrAssign,
        TokenKind::GreaterGreaterGreaterEqual => AssignOp::UShrAssign,
        TokenKind::PipeEqual => AssignOp::BitOrAssign,
        TokenKind::CaretEqual => AssignOp::BitXorAssign,
        TokenKind::AmpersandEqual => AssignOp::BitAndAssign,
        TokenKind::AmpersandAmpersandEqual => AssignOp::LogicalAndAssign,
        TokenKind::PipePipeEqual => AssignOp::LogicalOrAssign,
        TokenKind::QuestionQuestionEqual => AssignOp::NullishAssign,
        _ => return None,
    })
}

/// Span of a template element's text, without the surrounding `` ` ``,
/// `${` and `}` delimiters.
fn template_element_span(span: Span, has_substitution: bool) -> Span {
    let trailing = if has_substitution { 2 } else { 1 };
    let mut start = span.start;
    start.offset += 1;
    start.column += 1;
    let mut end = span.end;
    end.offset = end.offset.saturating_sub(trailing);
    end.column = end.column.saturating_sub(trailing as u32);
    if end.offset < start.offset {
        end = start;
    }
    Span::new(start, end)
}

impl Parser<'_> {
    /// A comma-separated *Expression*.
    pub(crate) fn parse_expression(&mut self) -> QuarryResult<Expr> {
        self.parse_sequence(false)
    }

    /// An *Expression* in which a bare `in` ends the expression (`for` heads).
    fn parse_expression_no_in(&mut self) -> QuarryResult<Expr> {
        self.parse_sequence(true)
    }

    fn parse_sequence(&mut self, no_in: bool) -> QuarryResult<Expr> {
        let first = self.parse_assign(no_in)?;
        if !self.at(TokenKind::Comma) {
            return Ok(first);
        }
        let start = first.loc().start;
        let mut expressions = vec![first];
        while self.eat(TokenKind::Comma)? {
            expressions.push(self.parse_assign(no_in)?);
        }
        Ok(Expr::Sequence(Box::new(SequenceExpr {
            loc: self.finish(start),
            expressions,
        })))
    }

    /// An *AssignmentExpression*.
    fn parse_assign(&mut self, no_in: bool) -> QuarryResult<Expr> {
        if self.at(TokenKind::Yield) && self.ctx.is_generator {
            return self.parse_yield(no_in);
        }
        let start = self.start();
        let left = self.parse_conditional(no_in)?;
        if matches!(left, Expr::Arrow(_)) {
            return Ok(left);
        }
        let Some(op) = assign_operator(self.tok.kind) else {
            return Ok(left);
        };
        let target = if op == AssignOp::Assign {
            self.expr_to_pat(left)?
        } else {
            self.simple_target(left)?
        };
        self.advance()?;
        let right = Box::new(self.parse_assign(no_in)?);
        Ok(Expr::Assign(Box::new(AssignExpr {
            loc: self.finish(start),
            op,
            left: target,
            right,
        })))
    }

    fn parse_yield(&mut self, no_in: bool) -> QuarryResult<Expr> {
        let start = self.start();
        self.advance()?;
        let ends_here = self.tok.had_line_terminator_before
            || matches!(
                self.tok.kind,
                TokenKind::RightParen
                    | TokenKind::RightBracket
                    | TokenKind::RightBrace
                    | TokenKind::Comma
                    | TokenKind::Colon
                    | TokenKind::Semicolon
                    | TokenKind::Eof
            );
        let (delegate, argument) = if ends_here {
            (false, None)
        } else {
            let delegate = self.eat(TokenKind::Star)?;
            (delegate, Some(Box::new(self.parse_assign(no_in)?)))
        };
        Ok(Expr::Yield(Box::new(YieldExpr {
            loc: self.finish(start),
            delegate,
            argument,
        })))
    }

    fn parse_conditional(&mut self, no_in: bool) -> QuarryResult<Expr> {
        let start = self.start();
        let test = self.parse_binary(0, no_in)?;
        if matches!(test, Expr::Arrow(_)) || !self.at(TokenKind::Question) {
            return Ok(test);
        }
        self.advance()?;
        let consequent = Box::new(self.parse_assign(false)?);
        self.expect(TokenKind::Colon)?;
        let alternate = Box::new(self.parse_assign(no_in)?);
        Ok(Expr::Conditional(Box::new(ConditionalExpr {
            loc: self.finish(start),
            test: Box::new(test),
            consequent,
            alternate,
        })))
    }

    /// Precedence climbing over operators binding tighter than `min_prec`.
    fn parse_binary(&mut self, min_prec: u8, no_in: bool) -> QuarryResult<Expr> {
        let start = self.start();
        let mut left = self.parse_unary()?;
        if matches!(left, Expr::Arrow(_)) {
            return Ok(left);
        }
        while let Some((prec, op)) = binary_operator(self.tok.kind, no_in) {
            if prec <= min_prec {
                break;
            }
            self.advance()?;
            // `**` is right-associative.
            let next_min = if matches!(op, BinOp::Binary(BinaryOp::Exp)) { prec - 1 } else { prec };
            let right = Box::new(self.parse_binary(next_min, no_in)?);
            let loc = self.finish(start);
            let left_box = Box::new(left);
            left = match op {
                BinOp::Binary(op) => Expr::Binary(Box::new(BinaryExpr {
                    loc,
                    op,
                    left: left_box,
                    right,
                })),
                BinOp::Logical(op) => Expr::Logical(Box::new(LogicalExpr {
                    loc,
                    op,
                    left: left_box,
                    right,
                })),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> QuarryResult<Expr> {
        let start = self.start();
        let op = match self.tok.kind {
            TokenKind::Minus => Some(UnaryOp::Minus),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::Typeof => Some(UnaryOp::Typeof),
            TokenKind::Void => Some(UnaryOp::Void),
            TokenKind::Delete => Some(UnaryOp::Delete),
            _ => None,
        };
        if let Some(op) = op {
            self.advance()?;
            let argument = Box::new(self.parse_unary()?);
            return Ok(Expr::Unary(Box::new(UnaryExpr {
                loc: self.finish(start),
                op,
                argument,
            })));
        }
        if matches!(self.tok.kind, TokenKind::PlusPlus | TokenKind::MinusMinus) {
            let op = if self.advance()?.kind == TokenKind::PlusPlus {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            let argument = self.parse_unary()?;
            self.check_update_target(&argument)?;
            return Ok(Expr::Update(Box::new(UpdateExpr {
                loc: self.finish(start),
                op,
                prefix: true,
                argument: Box::new(argument),
            })));
        }
        if self.at(TokenKind::Await) && (self.ctx.is_async || (self.is_module() && !self.ctx.in_function)) {
            self.advance()?;
            let argument = Box::new(self.parse_unary()?);
            return Ok(Expr::Await(Box::new(AwaitExpr {
                loc: self.finish(start),
                argument,
            })));
        }

        let expr = self.parse_lhs_expression()?;
        if matches!(expr, Expr::Arrow(_))
            || !matches!(self.tok.kind, TokenKind::PlusPlus | TokenKind::MinusMinus)
            || self.tok.had_line_terminator_before
        {
            return Ok(expr);
        }
        self.check_update_target(&expr)?;
        let op = if self.advance()?.kind == TokenKind::PlusPlus {
            UpdateOp::Increment
        } else {
            UpdateOp::Decrement
        };
        Ok(Expr::Update(Box::new(UpdateExpr {
            loc: self.finish(start),
            op,
            prefix: false,
            argument: Box::new(expr),
        })))
    }

    fn check_update_target(&self, expr: &Expr) -> QuarryResult<()> {
        match expr {
            Expr::Ident(_) | Expr::Member(_) => Ok(()),
            _ => Err(QuarryError::syntax(
                "invalid left-hand side in update expression",
                expr.loc().start.line,
                expr.loc().start.column,
            )),
        }
    }

    /// A *LeftHandSideExpression*: member accesses, calls, optional chains
    /// and tagged templates on top of a primary or `new` expression.
    fn parse_lhs_expression(&mut self) -> QuarryResult<Expr> {
        let start = self.start();
        let expr = if self.at(TokenKind::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        if matches!(expr, Expr::Arrow(_)) {
            return Ok(expr);
        }
        self.parse_call_tail(start, expr, true)
    }

    fn parse_call_tail(&mut self, start: Position, mut expr: Expr, allow_calls: bool) -> QuarryResult<Expr> {
        let mut in_chain = false;
        loop {
            let kind = self.tok.kind;
            expr = match kind {
                TokenKind::Dot => {
                    self.advance()?;
                    let property = self.parse_member_name()?;
                    self.member(start, expr, property, false)
                }
                TokenKind::QuestionDot if allow_calls => {
                    self.advance()?;
                    in_chain = true;
                    match self.tok.kind {
                        TokenKind::LeftParen => {
                            let arguments = self.parse_arguments()?;
                            Expr::Call(Box::new(CallExpr {
                                loc: self.finish(start),
                                callee: Box::new(expr),
                                arguments,
                                optional: true,
                            }))
                        }
                        TokenKind::LeftBracket => {
                            let property = self.parse_computed_member()?;
                            self.member(start, expr, property, true)
                        }
                        _ => {
                            let property = self.parse_member_name()?;
                            self.member(start, expr, property, true)
                        }
                    }
                }
                TokenKind::LeftBracket => {
                    let property = self.parse_computed_member()?;
                    self.member(start, expr, property, false)
                }
                TokenKind::LeftParen if allow_calls => {
                    let arguments = self.parse_arguments()?;
                    Expr::Call(Box::new(CallExpr {
                        loc: self.finish(start),
                        callee: Box::new(expr),
                        arguments,
                        optional: false,
                    }))
                }
                TokenKind::NoSubstitutionTemplate | TokenKind::TemplateHead => {
                    if in_chain {
                        return Err(self.error("tagged template cannot be used in optional chain".into()));
                    }
                    let quasi = self.parse_template(true)?;
                    Expr::TaggedTemplate(Box::new(TaggedTemplateExpr {
                        loc: self.finish(start),
                        tag: Box::new(expr),
                        quasi,
                    }))
                }
                _ => break,
            };
        }
        if in_chain {
            return Ok(Expr::Chain(Box::new(ChainExpr {
                loc: self.finish(start),
                expression: Box::new(expr),
            })));
        }
        Ok(expr)
    }

    fn member(&self, start: Position, object: Expr, property: MemberProp, optional: bool) -> Expr {
        Expr::Member(Box::new(MemberExpr {
            loc: self.finish(start),
            object: Box::new(object),
            property,
            optional,
        }))
    }

    fn parse_member_name(&mut self) -> QuarryResult<MemberProp> {
        if self.at(TokenKind::PrivateIdentifier) {
            let tok = self.advance()?;
            return Ok(MemberProp::Private(PrivateIdent {
                loc: tok.span,
                name: tok.str_value().to_string(),
            }));
        }
        Ok(MemberProp::Ident(self.parse_identifier_name()?))
    }

    fn parse_computed_member(&mut self) -> QuarryResult<MemberProp> {
        self.expect(TokenKind::LeftBracket)?;
        let expr = self.parse_expression()?;
        self.expect(TokenKind::RightBracket)?;
        Ok(MemberProp::Computed(Box::new(expr)))
    }

    fn parse_arguments(&mut self) -> QuarryResult<Vec<Expr>> {
        self.expect(TokenKind::LeftParen)?;
        let mut arguments = Vec::new();
        while !self.eat(TokenKind::RightParen)? {
            arguments.push(self.parse_spread_or_assign()?);
            if !self.at(TokenKind::RightParen) {
                self.expect(TokenKind::Comma)?;
            }
        }
        Ok(arguments)
    }

    fn parse_spread_or_assign(&mut self) -> QuarryResult<Expr> {
        let start = self.start();
        if self.eat(TokenKind::DotDotDot)? {
            let argument = Box::new(self.parse_assign(false)?);
            return Ok(Expr::Spread(Box::new(SpreadElement {
                loc: self.finish(start),
                argument,
            })));
        }
        self.parse_assign(false)
    }

    fn parse_new(&mut self) -> QuarryResult<Expr> {
        let start = self.start();
        let new_tok = self.expect(TokenKind::New)?;
        if self.eat(TokenKind::Dot)? {
            let property = self.parse_identifier_name()?;
            if property.name != "target" {
                return Err(QuarryError::syntax(
                    "the only valid meta property for new is new.target",
                    property.loc.start.line,
                    property.loc.start.column,
                ));
            }
            return Ok(Expr::MetaProp(MetaPropExpr {
                loc: self.finish(start),
                meta: Ident {
                    loc: new_tok.span,
                    name: "new".into(),
                },
                property,
            }));
        }
        let callee_start = self.start();
        let callee = if self.at(TokenKind::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        let callee = self.parse_call_tail(callee_start, callee, false)?;
        let arguments = if self.at(TokenKind::LeftParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(Expr::New(Box::new(NewExpr {
            loc: self.finish(start),
            callee: Box::new(callee),
            arguments,
        })))
    }

    fn is_async_arrow_ident(&mut self) -> QuarryResult<bool> {
        let next = self.peek()?;
        Ok(!next.had_line_terminator_before
            && (next.kind == TokenKind::Identifier || (next.kind.is_contextual() && next.kind != TokenKind::Of)))
    }

    fn parse_primary(&mut self) -> QuarryResult<Expr> {
        let start = self.start();
        let kind = self.tok.kind;
        match kind {
            TokenKind::This => Ok(Expr::This(ThisExpr {
                loc: self.advance()?.span,
            })),
            TokenKind::Super => Ok(Expr::Super(SuperExpr {
                loc: self.advance()?.span,
            })),
            TokenKind::Null => Ok(Expr::Null(NullLit {
                loc: self.advance()?.span,
            })),
            TokenKind::True | TokenKind::False => Ok(Expr::Bool(BoolLit {
                loc: self.advance()?.span,
                value: kind == TokenKind::True,
            })),
            TokenKind::NumericLiteral => {
                let tok = self.advance()?;
                let raw = tok.text(self.source).to_string();
                if raw.ends_with('n') {
                    return Ok(Expr::BigInt(BigIntLit {
                        loc: tok.span,
                        value: parse_bigint_raw(&raw),
                        raw,
                    }));
                }
                let value = match tok.value {
                    TokenValue::Number(n) => n,
                    _ => f64::NAN,
                };
                Ok(Expr::Num(NumLit {
                    loc: tok.span,
                    value,
                    raw,
                }))
            }
            TokenKind::StringLiteral => Ok(Expr::Str(self.parse_string_literal()?)),
            TokenKind::Slash | TokenKind::SlashEqual => {
                self.rescan_regexp()?;
                self.parse_regexp()
            }
            TokenKind::RegExpLiteral => self.parse_regexp(),
            TokenKind::NoSubstitutionTemplate | TokenKind::TemplateHead => {
                Ok(Expr::Template(Box::new(self.parse_template(false)?)))
            }
            TokenKind::LeftParen => self.parse_paren_or_arrow(),
            TokenKind::LeftBracket => self.parse_array_literal(),
            TokenKind::LeftBrace => self.parse_object_literal(),
            TokenKind::Function => Ok(Expr::Fn(Box::new(self.parse_function_expr(false)?))),
            TokenKind::Class => Ok(Expr::Class(Box::new(self.parse_class_expr()?))),
            TokenKind::Import => self.parse_import_expr(),
            TokenKind::New => self.parse_new(),
            TokenKind::Async if self.is_async_function()? => {
                Ok(Expr::Fn(Box::new(self.parse_function_expr(true)?)))
            }
            TokenKind::Async if self.is_async_arrow_ident()? => {
                self.advance()?;
                let param = self.parse_identifier()?;
                let params = vec![Param {
                    loc: param.loc,
                    pat: Pat::Ident(param),
                    default: None,
                }];
                self.parse_arrow_body(start, true, params)
            }
            TokenKind::Async if self.peek_kind()? == TokenKind::LeftParen && self.peek_same_line()? => {
                let async_tok = self.advance()?;
                let arguments = self.parse_arguments()?;
                if self.at(TokenKind::Arrow) && !self.tok.had_line_terminator_before {
                    let params = self.cover_to_params(arguments)?;
                    return self.parse_arrow_body(start, true, params);
                }
                Ok(Expr::Call(Box::new(CallExpr {
                    loc: self.finish(start),
                    callee: Box::new(Expr::Ident(Ident {
                        loc: async_tok.span,
                        name: "async".into(),
                    })),
                    arguments,
                    optional: false,
                })))
            }
            _ if self.at_identifier() => {
                let ident = self.parse_identifier()?;
                if self.at(TokenKind::Arrow) && !self.tok.had_line_terminator_before {
                    let params = vec![Param {
                        loc: ident.loc,
                        pat: Pat::Ident(ident),
                        default: None,
                    }];
                    return self.parse_arrow_body(start, false, params);
                }
                Ok(Expr::Ident(ident))
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_regexp(&mut self) -> QuarryResult<Expr> {
        let tok = self.expect(TokenKind::RegExpLiteral)?;
        let raw = tok.str_value();
        let split = raw.rfind('/').unwrap_or(raw.len());
        let pattern = raw.get(1..split).unwrap_or_default().to_string();
        let flags = raw.get(split + 1..).unwrap_or_default().to_string();
        Ok(Expr::Regexp(RegExpLit {
            loc: tok.span,
            pattern,
            flags,
        }))
    }

    fn parse_template(&mut self, tagged: bool) -> QuarryResult<TemplateLit> {
        let start = self.start();
        let mut quasis = Vec::new();
        let mut expressions = Vec::new();
        loop {
            if !matches!(
                self.tok.kind,
                TokenKind::NoSubstitutionTemplate | TokenKind::TemplateHead | TokenKind::TemplateMiddle | TokenKind::TemplateTail
            ) {
                return Err(self.unexpected());
            }
            let tok = self.advance()?;
            let has_substitution = matches!(tok.kind, TokenKind::TemplateHead | TokenKind::TemplateMiddle);
            let raw = tok.str_value().to_string();
            let cooked = cook_template(&raw);
            if cooked.is_none() && !tagged {
                return Err(QuarryError::syntax(
                    "invalid escape sequence in template",
                    tok.span.start.line,
                    tok.span.start.column,
                ));
            }
            quasis.push(TemplateElement {
                loc: template_element_span(tok.span, has_substitution),
                raw,
                cooked,
                tail: !has_substitution,
            });
            if !has_substitution {
                break;
            }
            expressions.push(self.parse_expression()?);
        }
        Ok(TemplateLit {
            loc: self.finish(start),
            quasis,
            expressions,
        })
    }

    /// A parenthesized expression or the parameter list of an arrow function.
    fn parse_paren_or_arrow(&mut self) -> QuarryResult<Expr> {
        let start = self.start();
        self.expect(TokenKind::LeftParen)?;
        let mut items = Vec::new();
        while !self.at(TokenKind::RightParen) {
            let item = self.parse_spread_or_assign()?;
            let is_spread = matches!(item, Expr::Spread(_));
            items.push(item);
            if is_spread || !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RightParen)?;

        if self.at(TokenKind::Arrow) && !self.tok.had_line_terminator_before {
            let params = self.cover_to_params(items)?;
            return self.parse_arrow_body(start, false, params);
        }
        if items.iter().any(|e| matches!(e, Expr::Spread(_))) {
            return Err(self.unexpected());
        }
        match items.len() {
            0 => Err(self.unexpected()),
            1 => Ok(items.remove(0)),
            _ => {
                let first = items[0].loc();
                let last = items[items.len() - 1].loc();
                Ok(Expr::Sequence(Box::new(SequenceExpr {
                    loc: first.to(last),
                    expressions: items,
                })))
            }
        }
    }

    fn parse_arrow_body(&mut self, start: Position, is_async: bool, params: Vec<Param>) -> QuarryResult<Expr> {
        self.expect(TokenKind::Arrow)?;
        let saved = std::mem::replace(
            &mut self.ctx,
            FnContext {
                in_function: true,
                is_async,
                is_generator: false,
            },
        );
        let body = if self.at(TokenKind::LeftBrace) {
            self.parse_block().map(ArrowBody::Block)
        } else {
            self.parse_assign(false).map(|e| ArrowBody::Expr(Box::new(e)))
        };
        self.ctx = saved;
        Ok(Expr::Arrow(Box::new(ArrowExpr {
            loc: self.finish(start),
            is_async,
            params,
            body: body?,
        })))
    }

    fn parse_array_literal(&mut self) -> QuarryResult<Expr> {
        let start = self.start();
        self.expect(TokenKind::LeftBracket)?;
        let mut elements = Vec::new();
        while !self.eat(TokenKind::RightBracket)? {
            if self.eat(TokenKind::Comma)? {
                elements.push(None);
                continue;
            }
            elements.push(Some(self.parse_spread_or_assign()?));
            if !self.at(TokenKind::RightBracket) {
                self.expect(TokenKind::Comma)?;
            }
        }
        Ok(Expr::Array(Box::new(ArrayExpr {
            loc: self.finish(start),
            elements,
        })))
    }

    fn parse_object_literal(&mut self) -> QuarryResult<Expr> {
        let start = self.start();
        self.expect(TokenKind::LeftBrace)?;
        let mut properties = Vec::new();
        while !self.eat(TokenKind::RightBrace)? {
            let p_start = self.start();
            if self.eat(TokenKind::DotDotDot)? {
                let argument = Box::new(self.parse_assign(false)?);
                properties.push(ObjectProp::Spread(SpreadElement {
                    loc: self.finish(p_start),
                    argument,
                }));
            } else {
                properties.push(ObjectProp::Prop(Box::new(self.parse_object_member()?)));
            }
            if !self.at(TokenKind::RightBrace) {
                self.expect(TokenKind::Comma)?;
            }
        }
        Ok(Expr::Object(Box::new(ObjectExpr {
            loc: self.finish(start),
            properties,
        })))
    }

    fn parse_object_member(&mut self) -> QuarryResult<Prop> {
        let start = self.start();
        let mut is_async = false;
        if self.at(TokenKind::Async) && !self.modifier_is_name()? && self.peek_same_line()? {
            self.advance()?;
            is_async = true;
        }
        let is_generator = self.eat(TokenKind::Star)?;
        let mut accessor = None;
        if (self.at(TokenKind::Get) || self.at(TokenKind::Set))
            && !is_async
            && !is_generator
            && !self.modifier_is_name()?
        {
            accessor = Some(self.advance()?.kind);
        }
        let shorthand_ok = self.at_identifier();
        let key = self.parse_property_key()?;

        let value = if self.at(TokenKind::LeftParen) {
            let method = self.parse_method(is_async, is_generator)?;
            match accessor {
                Some(TokenKind::Get) => PropValue::Get(method),
                Some(_) => PropValue::Set(method),
                None => PropValue::Method(method),
            }
        } else if accessor.is_some() || is_async || is_generator {
            return Err(self.unexpected());
        } else if self.eat(TokenKind::Colon)? {
            PropValue::Value(Box::new(self.parse_assign(false)?))
        } else if let (PropKey::Ident(id), true) = (&key, shorthand_ok) {
            if self.eat(TokenKind::Equal)? {
                // `{ a = 1 }` is only valid as a destructuring target.
                let right = Box::new(self.parse_assign(false)?);
                PropValue::Value(Box::new(Expr::Assign(Box::new(AssignExpr {
                    loc: self.finish(start),
                    op: AssignOp::Assign,
                    left: Pat::Ident(id.clone()),
                    right,
                }))))
            } else {
                PropValue::Shorthand
            }
        } else {
            return Err(self.unexpected());
        };
        Ok(Prop {
            loc: self.finish(start),
            key,
            value,
        })
    }

    /// `import(...)` or `import.meta`.
    fn parse_import_expr(&mut self) -> QuarryResult<Expr> {
        let start = self.start();
        let import_tok = self.expect(TokenKind::Import)?;
        if self.eat(TokenKind::Dot)? {
            let property = self.parse_identifier_name()?;
            if property.name != "meta" {
                return Err(QuarryError::syntax(
                    "the only valid meta property for import is import.meta",
                    property.loc.start.line,
                    property.loc.start.column,
                ));
            }
            if !self.is_module() {
                return Err(QuarryError::syntax(
                    "cannot use 'import.meta' outside a module",
                    import_tok.span.start.line,
                    import_tok.span.start.column,
                ));
            }
            return Ok(Expr::MetaProp(MetaPropExpr {
                loc: self.finish(start),
                meta: Ident {
                    loc: import_tok.span,
                    name: "import".into(),
                },
                property,
            }));
        }
        self.expect(TokenKind::LeftParen)?;
        let source = Box::new(self.parse_assign(false)?);
        let options = if self.eat(TokenKind::Comma)? && !self.at(TokenKind::RightParen) {
            let options = self.parse_assign(false)?;
            self.eat(TokenKind::Comma)?;
            Some(Box::new(options))
        } else {
            None
        };
        self.expect(TokenKind::RightParen)?;
        Ok(Expr::Import(Box::new(ImportExpr {
            loc: self.finish(start),
            source,
            options,
        })))
    }

    // ── Cover grammar ───────────────────────────────────────────────────────

    fn invalid_target(&self, loc: Span) -> QuarryError {
        QuarryError::syntax("invalid assignment target", loc.start.line, loc.start.column)
    }

    /// Target of a compound assignment: an identifier or member expression.
    fn simple_target(&self, expr: Expr) -> QuarryResult<Pat> {
        match expr {
            Expr::Ident(id) => Ok(Pat::Ident(id)),
            Expr::Member(_) => Ok(Pat::Expr(Box::new(expr))),
            other => Err(self.invalid_target(other.loc())),
        }
    }

    /// Reinterpret an expression parsed under the cover grammar as a pattern.
    fn expr_to_pat(&self, expr: Expr) -> QuarryResult<Pat> {
        match expr {
            Expr::Ident(id) => Ok(Pat::Ident(id)),
            Expr::Member(_) => Ok(Pat::Expr(Box::new(expr))),
            Expr::Array(arr) => {
                let ArrayExpr { loc, elements } = *arr;
                let elements = elements
                    .into_iter()
                    .map(|el| el.map(|e| self.element_to_pat(e)).transpose())
                    .collect::<QuarryResult<Vec<_>>>()?;
                Ok(Pat::Array(Box::new(ArrayPat { loc, elements })))
            }
            Expr::Object(obj) => {
                let ObjectExpr { loc, properties } = *obj;
                let properties = properties
                    .into_iter()
                    .map(|p| self.prop_to_pat(p))
                    .collect::<QuarryResult<Vec<_>>>()?;
                Ok(Pat::Object(Box::new(ObjectPat { loc, properties })))
            }
            Expr::Assign(assign) if assign.op == AssignOp::Assign => {
                let AssignExpr { loc, left, right, .. } = *assign;
                Ok(Pat::Assign(Box::new(AssignPat {
                    loc,
                    left: Box::new(left),
                    right,
                })))
            }
            other => Err(self.invalid_target(other.loc())),
        }
    }

    /// An array element; spreads become rest elements.
    fn element_to_pat(&self, expr: Expr) -> QuarryResult<Pat> {
        match expr {
            Expr::Spread(spread) => {
                let SpreadElement { loc, argument } = *spread;
                Ok(Pat::Rest(Box::new(RestElement {
                    loc,
                    argument: Box::new(self.expr_to_pat(*argument)?),
                })))
            }
            other => self.expr_to_pat(other),
        }
    }

    fn prop_to_pat(&self, prop: ObjectProp) -> QuarryResult<ObjectPatProp> {
        let prop = match prop {
            ObjectProp::Spread(SpreadElement { loc, argument }) => {
                return Ok(ObjectPatProp::Rest(RestElement {
                    loc,
                    argument: Box::new(self.expr_to_pat(*argument)?),
                }));
            }
            ObjectProp::Prop(prop) => *prop,
        };
        let Prop { loc, key, value } = prop;
        match (key, value) {
            (PropKey::Ident(key), PropValue::Shorthand) => Ok(ObjectPatProp::Assign(AssignPatProp {
                loc,
                key,
                value: None,
            })),
            (PropKey::Ident(key), PropValue::Value(value))
                if matches!(&*value, Expr::Assign(a) if matches!(&a.left, Pat::Ident(id) if id.loc == key.loc)) =>
            {
                let Expr::Assign(assign) = *value else {
                    return Err(self.invalid_target(loc));
                };
                Ok(ObjectPatProp::Assign(AssignPatProp {
                    loc,
                    key,
                    value: Some(assign.right),
                }))
            }
            (key, PropValue::Value(value)) => Ok(ObjectPatProp::KeyValue(KeyValuePatProp {
                loc,
                key,
                value: self.expr_to_pat(*value)?,
            })),
            _ => Err(self.invalid_target(loc)),
        }
    }

    /// Arrow parameters from a parenthesized cover list.
    fn cover_to_params(&self, items: Vec<Expr>) -> QuarryResult<Vec<Param>> {
        items
            .into_iter()
            .map(|item| {
                let loc = item.loc();
                let (pat, default) = match item {
                    Expr::Assign(assign) if assign.op == AssignOp::Assign => {
                        let AssignExpr { left, right, .. } = *assign;
                        (left, Some(*right))
                    }
                    other => (self.element_to_pat(other)?, None),
                };
                Ok(Param { loc, pat, default })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(src: &str) -> ParseOutput {
        parse(src, SourceType::Module).unwrap()
    }

    fn script(src: &str) -> ParseOutput {
        parse(src, SourceType::Script).unwrap()
    }

    fn expr(src: &str) -> Expr {
        parse_expression(src).unwrap().0
    }

    // ── Statements and ASI ──────────────────────────────────────────────────

    #[test]
    fn test_statement_list() {
        let out = module("var a = 1; let b; const c = 2; if (a) b(); else { c }");
        assert_eq!(out.program.body.len(), 4);
        assert!(matches!(&out.program.body[3], Stmt::If(s) if s.alternate.is_some()));
    }

    #[test]
    fn test_asi_positions_recorded() {
        let out = script("a\nb");
        let mut positions: Vec<_> = out.semicolons.into_iter().collect();
        positions.sort_unstable();
        assert_eq!(positions, vec![1, 3]);
    }

    #[test]
    fn test_explicit_semicolon_not_recorded() {
        let out = script("a;");
        assert!(out.semicolons.is_empty());
    }

    #[test]
    fn test_comments_collected_in_order() {
        let out = script("/* x */ a // y\n");
        let texts: Vec<_> = out.comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec![" x ", " y"]);
        assert_eq!(out.comments[0].kind, CommentKind::Block);
        assert_eq!(out.comments[1].kind, CommentKind::Line);
    }

    #[test]
    fn test_top_level_return_only_in_scripts() {
        assert!(parse("return 1", SourceType::Module).is_err());
        assert!(parse("if (done) return;", SourceType::Script).is_ok());
        assert!(parse("function f() { return 1 }", SourceType::Module).is_ok());
    }

    #[test]
    fn test_module_declarations_rejected_in_script() {
        assert!(parse("import a from 'a'", SourceType::Script).is_err());
        assert!(parse("export const a = 1", SourceType::Script).is_err());
        assert!(parse("import('a')", SourceType::Script).is_ok());
    }

    #[test]
    fn test_with_rejected_in_module() {
        assert!(parse("with (a) b", SourceType::Module).is_err());
        assert!(parse("with (a) b", SourceType::Script).is_ok());
    }

    #[test]
    fn test_labels_and_loops() {
        let out = script("outer: for (const [k, v] of m) { for (x in o) continue outer; }");
        let Stmt::Labeled(labeled) = &out.program.body[0] else {
            panic!("expected labeled statement");
        };
        assert_eq!(labeled.label.name, "outer");
        assert!(matches!(*labeled.body, Stmt::ForOf(_)));
    }

    // ── Modules ─────────────────────────────────────────────────────────────

    #[test]
    fn test_import_forms() {
        let out = module(
            "import a, { b as c, d } from 'x';\nimport * as ns from 'y';\nimport 'z';\nimport j from './j.json' with { type: 'json' };",
        );
        let Stmt::Import(first) = &out.program.body[0] else {
            panic!("expected import");
        };
        assert_eq!(first.specifiers.len(), 3);
        assert_eq!(first.source.value, "x");
        let Stmt::Import(last) = &out.program.body[3] else {
            panic!("expected import");
        };
        assert_eq!(last.attributes[0].key, "type");
        assert_eq!(last.attributes[0].value.value, "json");
    }

    #[test]
    fn test_export_forms() {
        let out = module(
            "export default function () {}\nexport { a as b } from 'm';\nexport * as ns from 'n';\nexport class K {}\nexport const x = 1, y = 2;",
        );
        assert!(matches!(&out.program.body[0], Stmt::ExportDefault(d) if matches!(&d.declaration, ExportDefaultExpr::Fn(f) if f.id.is_none())));
        assert!(matches!(&out.program.body[1], Stmt::ExportNamed(e) if e.source.is_some() && e.specifiers.len() == 1));
        assert!(matches!(&out.program.body[2], Stmt::ExportAll(e) if e.exported.is_some()));
        assert!(matches!(&out.program.body[4], Stmt::ExportNamed(e) if e.declaration.is_some()));
    }

    // ── Expressions ─────────────────────────────────────────────────────────

    #[test]
    fn test_binary_precedence() {
        let Expr::Binary(add) = expr("1 + 2 * 3") else {
            panic!("expected binary");
        };
        assert_eq!(add.op, BinaryOp::Add);
        assert!(matches!(&*add.right, Expr::Binary(mul) if mul.op == BinaryOp::Mul));
    }

    #[test]
    fn test_exponent_is_right_associative() {
        let Expr::Binary(outer) = expr("2 ** 3 ** 2") else {
            panic!("expected binary");
        };
        assert!(matches!(&*outer.left, Expr::Num(n) if n.value == 2.0));
        assert!(matches!(&*outer.right, Expr::Binary(_)));
    }

    #[test]
    fn test_regexp_after_paren_statement() {
        let out = script("if (x) /re/g.test(y)");
        let Stmt::If(stmt) = &out.program.body[0] else {
            panic!("expected if");
        };
        let Stmt::Expr(call) = &*stmt.consequent else {
            panic!("expected expression statement");
        };
        let Expr::Call(call) = &*call.expr else {
            panic!("expected call");
        };
        let Expr::Member(member) = &*call.callee else {
            panic!("expected member");
        };
        assert!(matches!(&*member.object, Expr::Regexp(r) if r.pattern == "re" && r.flags == "g"));
    }

    #[test]
    fn test_division_chain() {
        assert!(matches!(expr("a / b / c"), Expr::Binary(b) if b.op == BinaryOp::Div));
    }

    #[test]
    fn test_arrow_parameters() {
        let Expr::Arrow(arrow) = expr("(a, { b }, c = 1, ...rest) => a") else {
            panic!("expected arrow");
        };
        assert_eq!(arrow.params.len(), 4);
        assert!(matches!(arrow.params[1].pat, Pat::Object(_)));
        assert!(arrow.params[2].default.is_some());
        assert!(matches!(arrow.params[3].pat, Pat::Rest(_)));
        assert!(matches!(arrow.body, ArrowBody::Expr(_)));
    }

    #[test]
    fn test_async_forms() {
        assert!(matches!(expr("async x => x"), Expr::Arrow(a) if a.is_async));
        assert!(matches!(expr("async (a, b) => { await a }"), Expr::Arrow(a) if a.is_async));
        assert!(matches!(expr("async(a)"), Expr::Call(_)));
        assert!(matches!(expr("async function () {}"), Expr::Fn(f) if f.is_async));
    }

    #[test]
    fn test_destructuring_assignment() {
        let Expr::Assign(assign) = expr("[a, , ...b] = c") else {
            panic!("expected assignment");
        };
        let Pat::Array(arr) = &assign.left else {
            panic!("expected array pattern");
        };
        assert_eq!(arr.elements.len(), 3);
        assert!(arr.elements[1].is_none());

        let Expr::Assign(assign) = expr("({ a = 1, b: { c } } = obj)") else {
            panic!("expected assignment");
        };
        let Pat::Object(obj) = &assign.left else {
            panic!("expected object pattern");
        };
        assert!(matches!(&obj.properties[0], ObjectPatProp::Assign(p) if p.value.is_some()));
        assert!(matches!(&obj.properties[1], ObjectPatProp::KeyValue(_)));
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert!(parse_expression("a + b = c").is_err());
        assert!(parse_expression("f() += 1").is_err());
    }

    #[test]
    fn test_optional_chain() {
        let Expr::Chain(chain) = expr("a?.b.c()") else {
            panic!("expected chain");
        };
        let Expr::Call(call) = &*chain.expression else {
            panic!("expected call in chain");
        };
        let Expr::Member(c) = &*call.callee else {
            panic!("expected member");
        };
        assert!(!c.optional);
        assert!(matches!(&*c.object, Expr::Member(b) if b.optional));
    }

    #[test]
    fn test_new_and_meta_properties() {
        let Expr::New(new) = expr("new a.b.C(1)") else {
            panic!("expected new");
        };
        assert_eq!(new.arguments.len(), 1);
        assert!(matches!(&*new.callee, Expr::Member(_)));
        assert!(matches!(expr("import.meta.url"), Expr::Member(_)));
        assert!(parse("function f() { return new.target }", SourceType::Script).is_ok());
        assert!(parse("import.meta", SourceType::Script).is_err());
    }

    #[test]
    fn test_template_literal() {
        let Expr::Template(tpl) = expr("`a${b}c\\n`") else {
            panic!("expected template");
        };
        assert_eq!(tpl.quasis.len(), 2);
        assert_eq!(tpl.expressions.len(), 1);
        assert_eq!(tpl.quasis[0].cooked.as_deref(), Some("a"));
        assert_eq!(tpl.quasis[1].raw, "c\\n");
        assert_eq!(tpl.quasis[1].cooked.as_deref(), Some("c\n"));
        assert!(tpl.quasis[1].tail);
    }

    #[test]
    fn test_bad_escape_only_allowed_when_tagged() {
        assert!(parse_expression(r"`\unicode`").is_err());
        let Expr::TaggedTemplate(tagged) = expr(r"tag`\unicode`") else {
            panic!("expected tagged template");
        };
        assert!(tagged.quasi.quasis[0].cooked.is_none());
    }

    #[test]
    fn test_object_literal_members() {
        let Expr::Object(obj) = expr("{ a, b: 1, get c() { return 1 }, [d]: 2, async e() {}, ...f }") else {
            panic!("expected object");
        };
        assert_eq!(obj.properties.len(), 6);
        assert!(matches!(&obj.properties[0], ObjectProp::Prop(p) if matches!(p.value, PropValue::Shorthand)));
        assert!(matches!(&obj.properties[2], ObjectProp::Prop(p) if matches!(p.value, PropValue::Get(_))));
        assert!(matches!(&obj.properties[3], ObjectProp::Prop(p) if p.key.is_computed()));
        assert!(matches!(&obj.properties[5], ObjectProp::Spread(_)));
    }

    #[test]
    fn test_class_members() {
        let out = module("class A extends B { static x = 1; get y() { return 2 } constructor() { super() } #p = 3; static { init() } }");
        let Stmt::ClassDecl(class) = &out.program.body[0] else {
            panic!("expected class");
        };
        assert!(class.super_class.is_some());
        let members = &class.body.body;
        assert_eq!(members.len(), 5);
        assert!(matches!(&members[0], ClassMember::Property(p) if p.is_static));
        assert!(matches!(&members[1], ClassMember::Method(m) if m.kind == MethodKind::Get));
        assert!(matches!(&members[2], ClassMember::Method(m) if m.kind == MethodKind::Constructor));
        assert!(matches!(&members[3], ClassMember::Property(p) if matches!(p.key, PropKey::Private(_))));
        assert!(matches!(&members[4], ClassMember::StaticBlock(_)));
    }

    #[test]
    fn test_dynamic_import_with_options() {
        let Expr::Import(import) = expr("import('./a', { with: { type: 'json' } })") else {
            panic!("expected import()");
        };
        assert!(matches!(&*import.source, Expr::Str(s) if s.value == "./a"));
        assert!(import.options.is_some());
    }

    #[test]
    fn test_top_level_await_module_only() {
        assert!(parse("await x", SourceType::Module).is_ok());
        // In scripts `await` is an identifier, so `await x` is two expressions
        // with no separator.
        assert!(parse("await x", SourceType::Script).is_err());
        assert!(parse("await(x)", SourceType::Script).is_ok());
    }

    #[test]
    fn test_bigint_literal() {
        assert!(matches!(expr("10n"), Expr::BigInt(b) if b.value == Some(num_bigint::BigInt::from(10))));
        let Expr::BigInt(wide) = expr("340282366920938463463374607431768211456n") else {
            panic!("expected a BigInt literal");
        };
        assert_eq!(
            wide.value.map(|v| v.to_string()).as_deref(),
            Some("340282366920938463463374607431768211456")
        );
    }

    #[test]
    fn test_expression_must_consume_input() {
        assert!(parse_expression("a b").is_err());
        assert!(parse_expression("1 +").is_err());
    }

    #[test]
    fn test_locations_cover_source() {
        let src = "foo.bar(1)";
        let e = expr(src);
        assert_eq!(&src[e.loc().range()], src);
        let Expr::Call(call) = e else {
            panic!("expected call");
        };
        assert_eq!(&src[call.callee.loc().range()], "foo.bar");
    }
}
