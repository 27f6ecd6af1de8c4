//! JavaScript lexer (scanner).
//!
//! See [`Scanner`] for the main entry point.  The parser pulls tokens one at a
//! time; when a `/` that the scanner classified as division turns out to start
//! a regular expression, the parser rewinds with [`Scanner::restore`] and asks
//! for [`Scanner::rescan_regexp`].
//!
//! String and identifier tokens carry their *cooked* value; template tokens
//! carry the raw body and are cooked by [`cook_template`].

use num_bigint::BigInt;

use crate::error::{QuarryError, QuarryResult};

// ─────────────────────────────────────────────────────────────────────────────
// Position / Span
// ─────────────────────────────────────────────────────────────────────────────

/// A byte offset + line/column location in source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    /// Byte offset from the beginning of the source string.
    pub offset: usize,
    /// 1-based line number (incremented on every *LineTerminator*).
    pub line: u32,
    /// 1-based column number, measured in Unicode scalar values.
    pub column: u32,
}

/// A half-open `[start, end)` source span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Inclusive start of the span.
    pub start: Position,
    /// Exclusive end of the span.
    pub end: Position,
}

impl Span {
    /// Span covering `start` up to `end`.
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// The byte range `[start, end)`.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start.offset..self.end.offset
    }

    /// Whether `other` lies entirely inside `self`.
    pub fn contains(&self, other: &Span) -> bool {
        self.start.offset <= other.start.offset && other.end.offset <= self.end.offset
    }

    /// Smallest span enclosing both `self` and `other`.
    pub fn to(&self, other: Span) -> Span {
        Span {
            start: self.start,
            end: other.end,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────────────

/// The syntactic category of a JavaScript lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // ── Literals ──────────────────────────────────────────────────────────
    /// Decimal, hex, binary, octal or BigInt (trailing `n`) literal.
    NumericLiteral,
    /// String literal enclosed in `"` or `'`.
    StringLiteral,
    /// A complete template literal with no substitutions: `` `…` ``.
    NoSubstitutionTemplate,
    /// Opening span of a substituted template: `` `…${ ``.
    TemplateHead,
    /// Middle span between two substitutions: `` }…${ ``.
    TemplateMiddle,
    /// Closing span of a substituted template: `` }…` ``.
    TemplateTail,
    /// Regular-expression literal `/pattern/flags`.
    RegExpLiteral,

    // ── Identifiers ───────────────────────────────────────────────────────
    Identifier,
    /// A private identifier beginning with `#`.
    PrivateIdentifier,

    // ── Reserved words ────────────────────────────────────────────────────
    Await,
    Break,
    Case,
    Catch,
    Class,
    Const,
    Continue,
    Debugger,
    Default,
    Delete,
    Do,
    Else,
    Enum,
    Export,
    Extends,
    False,
    Finally,
    For,
    Function,
    If,
    Import,
    In,
    Instanceof,
    Let,
    New,
    Null,
    Of,
    Return,
    Static,
    Super,
    Switch,
    This,
    Throw,
    True,
    Try,
    Typeof,
    Var,
    Void,
    While,
    With,
    Yield,

    // ── Contextual keywords ───────────────────────────────────────────────
    Async,
    From,
    As,
    Get,
    Set,
    Target,
    Meta,

    // ── Punctuators ───────────────────────────────────────────────────────
    LeftBrace,
    RightBrace,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Dot,
    DotDotDot,
    Semicolon,
    Comma,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    EqualEqual,
    BangEqual,
    EqualEqualEqual,
    BangEqualEqual,
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    LessLess,
    GreaterGreater,
    GreaterGreaterGreater,
    Ampersand,
    Pipe,
    Caret,
    Bang,
    Tilde,
    AmpersandAmpersand,
    PipePipe,
    QuestionQuestion,
    Question,
    Colon,
    Equal,
    PlusEqual,
    MinusEqual,
    StarEqual,
    StarStarEqual,
    SlashEqual,
    PercentEqual,
    LessLessEqual,
    GreaterGreaterEqual,
    GreaterGreaterGreaterEqual,
    AmpersandEqual,
    PipeEqual,
    CaretEqual,
    AmpersandAmpersandEqual,
    PipePipeEqual,
    QuestionQuestionEqual,
    /// `=>`
    Arrow,
    /// `?.`
    QuestionDot,

    // ── Comments ──────────────────────────────────────────────────────────
    /// Single-line comment `// …` (also used for a leading `#!` line).
    SingleLineComment,
    /// Block comment `/* … */`.
    MultiLineComment,

    /// End of input.
    Eof,
}

impl TokenKind {
    /// Reserved and contextual words; all of them are valid *IdentifierName*s
    /// after `.` and as property keys.
    pub fn is_keyword(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Await
                | Break
                | Case
                | Catch
                | Class
                | Const
                | Continue
                | Debugger
                | Default
                | Delete
                | Do
                | Else
                | Enum
                | Export
                | Extends
                | False
                | Finally
                | For
                | Function
                | If
                | Import
                | In
                | Instanceof
                | Let
                | New
                | Null
                | Of
                | Return
                | Static
                | Super
                | Switch
                | This
                | Throw
                | True
                | Try
                | Typeof
                | Var
                | Void
                | While
                | With
                | Yield
                | Async
                | From
                | As
                | Get
                | Set
                | Target
                | Meta
        )
    }

    /// Whether the token may appear where an *IdentifierName* is expected.
    pub fn is_identifier_name(self) -> bool {
        self == TokenKind::Identifier || self.is_keyword()
    }

    /// Words that are keywords only in particular positions and otherwise act
    /// as plain identifiers (`let`, `static`, `yield` and `await` follow the
    /// sloppy-mode script rules).
    pub fn is_contextual(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Async | From | As | Get | Set | Target | Meta | Of | Let | Static | Yield | Await
        )
    }

    /// Whether the token is a comment.
    pub fn is_comment(self) -> bool {
        matches!(
            self,
            TokenKind::SingleLineComment | TokenKind::MultiLineComment
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TokenValue / Token
// ─────────────────────────────────────────────────────────────────────────────

/// The payload value associated with a [`Token`].
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    /// No semantic value (punctuators, EOF).
    None,
    /// Cooked identifier, keyword or string value, raw template body, raw
    /// regexp or comment text.
    Str(String),
    /// Parsed numeric value for [`TokenKind::NumericLiteral`].
    Number(f64),
}

/// A single lexical token produced by the [`Scanner`].
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The syntactic category.
    pub kind: TokenKind,
    /// The associated value, if any.
    pub value: TokenValue,
    /// Source span of the token.
    pub span: Span,
    /// `true` when at least one *LineTerminator* separates this token from
    /// the previous one.  Drives automatic semicolon insertion.
    pub had_line_terminator_before: bool,
}

impl Token {
    /// The token's source text.
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        &source[self.span.range()]
    }

    /// The string payload, or `""` when the token has none.
    pub fn str_value(&self) -> &str {
        match &self.value {
            TokenValue::Str(s) => s,
            _ => "",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Character-classification helpers
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_js_whitespace(c: char) -> bool {
    matches!(
        c,
        '\t' | '\x0B'
            | '\x0C'
            | ' '
            | '\u{00A0}'
            | '\u{FEFF}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
    ) || is_line_terminator(c)
}

fn is_id_start(c: char) -> bool {
    c == '$' || c == '_' || c.is_alphabetic()
}

fn is_id_continue(c: char) -> bool {
    c == '$' || c == '_' || c == '\u{200C}' || c == '\u{200D}' || c.is_alphanumeric()
}

fn keyword_kind(s: &str) -> Option<TokenKind> {
    use TokenKind::*;
    let kind = match s {
        "await" => Await,
        "break" => Break,
        "case" => Case,
        "catch" => Catch,
        "class" => Class,
        "const" => Const,
        "continue" => Continue,
        "debugger" => Debugger,
        "default" => Default,
        "delete" => Delete,
        "do" => Do,
        "else" => Else,
        "enum" => Enum,
        "export" => Export,
        "extends" => Extends,
        "false" => False,
        "finally" => Finally,
        "for" => For,
        "function" => Function,
        "if" => If,
        "import" => Import,
        "in" => In,
        "instanceof" => Instanceof,
        "let" => Let,
        "new" => New,
        "null" => Null,
        "of" => Of,
        "return" => Return,
        "static" => Static,
        "super" => Super,
        "switch" => Switch,
        "this" => This,
        "throw" => Throw,
        "true" => True,
        "try" => Try,
        "typeof" => Typeof,
        "var" => Var,
        "void" => Void,
        "while" => While,
        "with" => With,
        "yield" => Yield,
        "async" => Async,
        "from" => From,
        "as" => As,
        "get" => Get,
        "set" => Set,
        "target" => Target,
        "meta" => Meta,
        _ => return None,
    };
    Some(kind)
}

/// Guess whether a `/` after `last` starts a regular expression.
///
/// The guess is correct for everything except a few statement-level
/// positions (`if (x) /re/`), which the parser repairs by rescanning.
fn slash_is_regexp(last: Option<TokenKind>) -> bool {
    use TokenKind::*;
    match last {
        None => true,
        Some(k) => !matches!(
            k,
            Identifier
                | PrivateIdentifier
                | NumericLiteral
                | StringLiteral
                | NoSubstitutionTemplate
                | TemplateTail
                | RegExpLiteral
                | RightParen
                | RightBracket
                | RightBrace
                | PlusPlus
                | MinusMinus
                | True
                | False
                | Null
                | This
                | Super
                | Async
                | From
                | As
                | Get
                | Set
                | Target
                | Meta
                | Static
                | Let
        ),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scanner
// ─────────────────────────────────────────────────────────────────────────────

/// Resumable scanner position, see [`Scanner::checkpoint`].
#[derive(Debug, Clone)]
pub struct ScannerState {
    pos: usize,
    line: u32,
    column: u32,
    template_stack: Vec<usize>,
    brace_depth: usize,
    last_significant_kind: Option<TokenKind>,
}

/// Incremental JavaScript tokenizer.
pub struct Scanner<'src> {
    source: &'src str,
    pos: usize,
    line: u32,
    column: u32,
    /// Brace depth at each open `${`; a `}` at that depth resumes the template.
    template_stack: Vec<usize>,
    brace_depth: usize,
    /// Last non-comment token kind, for the regexp/division decision.
    last_significant_kind: Option<TokenKind>,
}

impl<'src> Scanner<'src> {
    /// Create a scanner positioned at the start of `source`.
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            column: 1,
            template_stack: Vec::new(),
            brace_depth: 0,
            last_significant_kind: None,
        }
    }

    /// The full source text being scanned.
    pub fn source(&self) -> &'src str {
        self.source
    }

    /// Returns `true` once all input has been consumed.
    pub fn is_eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// Snapshot the scanner so it can be rewound with [`Scanner::restore`].
    pub fn checkpoint(&self) -> ScannerState {
        ScannerState {
            pos: self.pos,
            line: self.line,
            column: self.column,
            template_stack: self.template_stack.clone(),
            brace_depth: self.brace_depth,
            last_significant_kind: self.last_significant_kind,
        }
    }

    /// Rewind to a previously taken [`ScannerState`].
    pub fn restore(&mut self, state: ScannerState) {
        self.pos = state.pos;
        self.line = state.line;
        self.column = state.column;
        self.template_stack = state.template_stack;
        self.brace_depth = state.brace_depth;
        self.last_significant_kind = state.last_significant_kind;
    }

    fn err(&self, message: String) -> QuarryError {
        QuarryError::syntax(message, self.line, self.column)
    }

    // ── Low-level character helpers ─────────────────────────────────────────

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek2(&self) -> Option<char> {
        self.source[self.pos..].chars().nth(1)
    }

    /// Consume one character, keeping line/column bookkeeping current.
    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        match ch {
            '\r' => {
                // CRLF counts as one line terminator.
                if self.source[self.pos..].starts_with('\n') {
                    self.pos += 1;
                }
                self.line += 1;
                self.column = 1;
            }
            '\n' | '\u{2028}' | '\u{2029}' => {
                self.line += 1;
                self.column = 1;
            }
            _ => self.column += 1,
        }
        Some(ch)
    }

    /// Consume `expected` if it is the next character.
    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn current_pos(&self) -> Position {
        Position {
            offset: self.pos,
            line: self.line,
            column: self.column,
        }
    }

    /// Skip whitespace; returns whether a line terminator was crossed.
    fn skip_whitespace(&mut self) -> bool {
        let mut had_lt = false;
        while let Some(c) = self.peek() {
            if !is_js_whitespace(c) {
                break;
            }
            had_lt |= is_line_terminator(c);
            self.advance();
        }
        had_lt
    }

    fn skip_while(&mut self, pred: impl Fn(char) -> bool) {
        while matches!(self.peek(), Some(c) if pred(c)) {
            self.advance();
        }
    }

    // ── Comments ────────────────────────────────────────────────────────────

    /// Consume the rest of a line; returns the text from `text_start`.
    fn scan_line_comment(&mut self, text_start: usize) -> String {
        self.skip_while(|c| !is_line_terminator(c));
        self.source[text_start..self.pos].to_string()
    }

    /// Consume a block comment body after `/*`.  Returns the text and whether
    /// it spans a line terminator.
    fn scan_block_comment(&mut self) -> QuarryResult<(String, bool)> {
        let text_start = self.pos;
        let mut inner_lt = false;
        loop {
            match self.peek() {
                None => return Err(self.err("unterminated block comment".into())),
                Some('*') if self.peek2() == Some('/') => {
                    let text = self.source[text_start..self.pos].to_string();
                    self.advance();
                    self.advance();
                    return Ok((text, inner_lt));
                }
                Some(c) => {
                    inner_lt |= is_line_terminator(c);
                    self.advance();
                }
            }
        }
    }

    // ── String / template escapes ───────────────────────────────────────────

    /// Validate one escape sequence after a consumed `\`.
    fn scan_escape_sequence(&mut self) -> QuarryResult<()> {
        let Some(c) = self.advance() else {
            return Err(self.err("unterminated escape sequence".into()));
        };
        match c {
            'u' if self.eat('{') => {
                let digits_start = self.pos;
                self.skip_while(|d| d.is_ascii_hexdigit());
                if self.pos == digits_start || !self.eat('}') {
                    return Err(self.err("invalid Unicode escape sequence".into()));
                }
            }
            'u' => self.expect_hex_digits(4, "invalid Unicode escape sequence")?,
            'x' => self.expect_hex_digits(2, "invalid hex escape sequence")?,
            _ => {}
        }
        Ok(())
    }

    fn expect_hex_digits(&mut self, count: usize, message: &str) -> QuarryResult<()> {
        for _ in 0..count {
            match self.peek() {
                Some(d) if d.is_ascii_hexdigit() => {
                    self.advance();
                }
                _ => return Err(self.err(message.to_string())),
            }
        }
        Ok(())
    }

    fn scan_string(&mut self, quote: char) -> QuarryResult<(TokenKind, TokenValue)> {
        let body_start = self.pos;
        loop {
            match self.peek() {
                None | Some('\n' | '\r') => {
                    return Err(self.err("unterminated string literal".into()));
                }
                Some(c) if c == quote => break,
                Some('\\') => {
                    self.advance();
                    if self.peek() == Some('\r') {
                        self.advance();
                    } else {
                        self.scan_escape_sequence()?;
                    }
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
        let body = &self.source[body_start..self.pos];
        self.advance();
        let cooked =
            cook(body, false).ok_or_else(|| self.err("invalid escape in string literal".into()))?;
        Ok((TokenKind::StringLiteral, TokenValue::Str(cooked)))
    }

    /// Scan template characters up to a closing `` ` `` or `${`.
    ///
    /// `opening` selects the head/no-substitution kinds; otherwise the part
    /// continues a substitution and yields middle/tail kinds.
    fn scan_template_part(&mut self, opening: bool) -> QuarryResult<(TokenKind, TokenValue)> {
        let body_start = self.pos;
        let has_substitution = loop {
            match self.peek() {
                None => return Err(self.err("unterminated template literal".into())),
                Some('`') => break false,
                Some('$') if self.peek2() == Some('{') => break true,
                Some('\\') => {
                    self.advance();
                    self.advance();
                }
                Some(_) => {
                    self.advance();
                }
            }
        };
        let raw = self.source[body_start..self.pos].to_string();
        if has_substitution {
            self.advance();
            self.advance();
            self.template_stack.push(self.brace_depth);
        } else {
            self.advance();
        }
        let kind = match (opening, has_substitution) {
            (true, false) => TokenKind::NoSubstitutionTemplate,
            (true, true) => TokenKind::TemplateHead,
            (false, true) => TokenKind::TemplateMiddle,
            (false, false) => TokenKind::TemplateTail,
        };
        Ok((kind, TokenValue::Str(raw)))
    }

    // ── Regular-expression literal ──────────────────────────────────────────

    /// Scan the body and flags of a regexp whose opening `/` has been
    /// consumed.  The value is the raw `/pattern/flags` text.
    fn scan_regexp(&mut self, start: Position) -> QuarryResult<(TokenKind, TokenValue)> {
        let mut in_class = false;
        loop {
            match self.advance() {
                None | Some('\n' | '\r' | '\u{2028}' | '\u{2029}') => {
                    return Err(self.err("unterminated regular expression literal".into()));
                }
                Some('[') => in_class = true,
                Some(']') => in_class = false,
                Some('/') if !in_class => break,
                Some('\\') => match self.advance() {
                    None | Some('\n' | '\r' | '\u{2028}' | '\u{2029}') => {
                        return Err(self.err("unterminated regular expression literal".into()));
                    }
                    Some(_) => {}
                },
                Some(_) => {}
            }
        }
        self.skip_while(is_id_continue);
        let raw = self.source[start.offset..self.pos].to_string();
        Ok((TokenKind::RegExpLiteral, TokenValue::Str(raw)))
    }

    /// Re-read the token at the current position as a regular expression.
    ///
    /// Used by the parser after [`Scanner::restore`] when a `/` or `/=` was
    /// tokenized as division in a position that expects an expression.
    pub fn rescan_regexp(&mut self) -> QuarryResult<Token> {
        let had_lt = self.skip_whitespace();
        let start = self.current_pos();
        if !self.eat('/') {
            return Err(self.err("expected regular expression".into()));
        }
        let (kind, value) = self.scan_regexp(start)?;
        self.last_significant_kind = Some(kind);
        Ok(self.finish(kind, value, start, had_lt))
    }

    // ── Numeric literal ─────────────────────────────────────────────────────

    /// Scan a numeric literal given that `first` has already been consumed.
    fn scan_numeric(&mut self, first: char, start: Position) -> QuarryResult<(TokenKind, TokenValue)> {
        let radix_digits = if first == '0' {
            match self.peek() {
                Some('x' | 'X') => Some(16),
                Some('o' | 'O') => Some(8),
                Some('b' | 'B') => Some(2),
                _ => None,
            }
        } else {
            None
        };
        if let Some(radix) = radix_digits {
            self.advance();
            self.skip_while(|c| c.is_digit(radix) || c == '_');
            self.eat('n');
        } else {
            if first != '.' {
                self.skip_while(|c| c.is_ascii_digit() || c == '_');
                if self.eat('n') {
                    return self.finish_numeric(start);
                }
                if self.eat('.') {
                    self.skip_while(|c| c.is_ascii_digit() || c == '_');
                }
            } else {
                self.skip_while(|c| c.is_ascii_digit() || c == '_');
            }
            if matches!(self.peek(), Some('e' | 'E')) {
                self.advance();
                if matches!(self.peek(), Some('+' | '-')) {
                    self.advance();
                }
                self.skip_while(|c| c.is_ascii_digit() || c == '_');
            }
        }
        self.finish_numeric(start)
    }

    fn finish_numeric(&mut self, start: Position) -> QuarryResult<(TokenKind, TokenValue)> {
        if matches!(self.peek(), Some(c) if is_id_start(c)) {
            return Err(self.err("identifier starts immediately after numeric literal".into()));
        }
        let raw = &self.source[start.offset..self.pos];
        Ok((TokenKind::NumericLiteral, TokenValue::Number(parse_numeric_raw(raw))))
    }

    // ── Identifier / keyword ────────────────────────────────────────────────

    /// Scan an identifier given that `first` has already been consumed.
    /// Escaped identifiers are never keywords.
    fn scan_identifier(&mut self, first: char, start: Position) -> QuarryResult<(TokenKind, TokenValue)> {
        let mut escaped = first == '\\';
        if escaped {
            self.scan_escape_sequence()?;
        }
        loop {
            match self.peek() {
                Some(c) if is_id_continue(c) => {
                    self.advance();
                }
                Some('\\') if self.peek2() == Some('u') => {
                    self.advance();
                    self.scan_escape_sequence()?;
                    escaped = true;
                }
                _ => break,
            }
        }
        let raw = &self.source[start.offset..self.pos];
        if escaped {
            let name = cook(raw, false).ok_or_else(|| self.err("invalid identifier escape".into()))?;
            return Ok((TokenKind::Identifier, TokenValue::Str(name)));
        }
        let kind = keyword_kind(raw).unwrap_or(TokenKind::Identifier);
        Ok((kind, TokenValue::Str(raw.to_string())))
    }

    // ── Punctuators ─────────────────────────────────────────────────────────

    /// Longest-match punctuator starting with the consumed character `c`.
    fn scan_punctuator(&mut self, c: char) -> Option<TokenKind> {
        use TokenKind::*;
        let kind = match c {
            '(' => LeftParen,
            ')' => RightParen,
            '[' => LeftBracket,
            ']' => RightBracket,
            ';' => Semicolon,
            ',' => Comma,
            '~' => Tilde,
            ':' => Colon,
            '<' if self.eat('<') => if self.eat('=') { LessLessEqual } else { LessLess },
            '<' => if self.eat('=') { LessEqual } else { Less },
            '>' if self.eat('>') => {
                if self.eat('>') {
                    if self.eat('=') { GreaterGreaterGreaterEqual } else { GreaterGreaterGreater }
                } else if self.eat('=') {
                    GreaterGreaterEqual
                } else {
                    GreaterGreater
                }
            }
            '>' => if self.eat('=') { GreaterEqual } else { Greater },
            '=' if self.eat('=') => if self.eat('=') { EqualEqualEqual } else { EqualEqual },
            '=' => if self.eat('>') { Arrow } else { Equal },
            '!' if self.eat('=') => if self.eat('=') { BangEqualEqual } else { BangEqual },
            '!' => Bang,
            '+' if self.eat('+') => PlusPlus,
            '+' => if self.eat('=') { PlusEqual } else { Plus },
            '-' if self.eat('-') => MinusMinus,
            '-' => if self.eat('=') { MinusEqual } else { Minus },
            '*' if self.eat('*') => if self.eat('=') { StarStarEqual } else { StarStar },
            '*' => if self.eat('=') { StarEqual } else { Star },
            '%' => if self.eat('=') { PercentEqual } else { Percent },
            '&' if self.eat('&') => if self.eat('=') { AmpersandAmpersandEqual } else { AmpersandAmpersand },
            '&' => if self.eat('=') { AmpersandEqual } else { Ampersand },
            '|' if self.eat('|') => if self.eat('=') { PipePipeEqual } else { PipePipe },
            '|' => if self.eat('=') { PipeEqual } else { Pipe },
            '^' => if self.eat('=') { CaretEqual } else { Caret },
            '?' if self.eat('?') => if self.eat('=') { QuestionQuestionEqual } else { QuestionQuestion },
            // `?.` but not `?.5`, which is `?` followed by `.5`.
            '?' if self.peek() == Some('.') && !matches!(self.peek2(), Some(d) if d.is_ascii_digit()) => {
                self.advance();
                QuestionDot
            }
            '?' => Question,
            _ => return None,
        };
        Some(kind)
    }

    fn finish(&self, kind: TokenKind, value: TokenValue, start: Position, had_lt: bool) -> Token {
        Token {
            kind,
            value,
            span: Span::new(start, self.current_pos()),
            had_line_terminator_before: had_lt,
        }
    }

    // ── Main public API ─────────────────────────────────────────────────────

    /// Scan and return the next [`Token`], comments included.
    ///
    /// Returns a token with [`TokenKind::Eof`] when the input is exhausted.
    pub fn next_token(&mut self) -> QuarryResult<Token> {
        let had_lt = self.skip_whitespace();
        let start = self.current_pos();

        if self.pos == 0 && self.source.starts_with("#!") {
            let text = self.scan_line_comment(0);
            return Ok(self.finish(TokenKind::SingleLineComment, TokenValue::Str(text), start, had_lt));
        }

        let Some(c) = self.advance() else {
            return Ok(self.finish(TokenKind::Eof, TokenValue::None, start, had_lt));
        };

        let (kind, value) = match c {
            '/' if self.eat('/') => {
                let text = self.scan_line_comment(self.pos);
                // Comments are not significant for the regexp decision.
                return Ok(self.finish(TokenKind::SingleLineComment, TokenValue::Str(text), start, had_lt));
            }
            '/' if self.eat('*') => {
                let (text, inner_lt) = self.scan_block_comment()?;
                return Ok(self.finish(
                    TokenKind::MultiLineComment,
                    TokenValue::Str(text),
                    start,
                    had_lt || inner_lt,
                ));
            }
            '/' if slash_is_regexp(self.last_significant_kind) => self.scan_regexp(start)?,
            '/' if self.eat('=') => (TokenKind::SlashEqual, TokenValue::None),
            '/' => (TokenKind::Slash, TokenValue::None),
            '"' | '\'' => self.scan_string(c)?,
            '`' => self.scan_template_part(true)?,
            c if c.is_ascii_digit() => self.scan_numeric(c, start)?,
            '.' if matches!(self.peek(), Some(d) if d.is_ascii_digit()) => self.scan_numeric('.', start)?,
            '.' if self.peek() == Some('.') && self.peek2() == Some('.') => {
                self.advance();
                self.advance();
                (TokenKind::DotDotDot, TokenValue::None)
            }
            '.' => (TokenKind::Dot, TokenValue::None),
            '#' => {
                let name_start = self.current_pos();
                match self.advance() {
                    Some(first) if is_id_start(first) || first == '\\' => {
                        let (_, value) = self.scan_identifier(first, name_start)?;
                        (TokenKind::PrivateIdentifier, value)
                    }
                    _ => return Err(self.err("invalid or unexpected token '#'".into())),
                }
            }
            c if is_id_start(c) => self.scan_identifier(c, start)?,
            '\\' if self.peek() == Some('u') => self.scan_identifier(c, start)?,
            '}' if self.template_stack.last() == Some(&self.brace_depth) => {
                self.template_stack.pop();
                self.scan_template_part(false)?
            }
            '}' => {
                self.brace_depth = self.brace_depth.saturating_sub(1);
                (TokenKind::RightBrace, TokenValue::None)
            }
            '{' => {
                self.brace_depth += 1;
                (TokenKind::LeftBrace, TokenValue::None)
            }
            _ => match self.scan_punctuator(c) {
                Some(kind) => (kind, TokenValue::None),
                None => return Err(self.err(format!("unexpected character {c:?}"))),
            },
        };

        self.last_significant_kind = Some(kind);
        Ok(self.finish(kind, value, start, had_lt))
    }

    /// Convenience: tokenize the entire `source` string and return all tokens
    /// (the [`TokenKind::Eof`] sentinel is **not** included).
    ///
    /// # Errors
    ///
    /// Returns the first [`QuarryError::SyntaxError`] encountered.
    pub fn tokenize_all(source: &'src str) -> QuarryResult<Vec<Token>> {
        let mut scanner = Scanner::new(source);
        let mut tokens = Vec::new();
        loop {
            let tok = scanner.next_token()?;
            if tok.kind == TokenKind::Eof {
                break;
            }
            tokens.push(tok);
        }
        Ok(tokens)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Literal cooking
// ─────────────────────────────────────────────────────────────────────────────

/// Cook the raw body of a template element.
///
/// Returns `None` when the body holds an escape that is invalid in templates
/// (legal only in tagged templates, whose cooked value is then `undefined`).
pub fn cook_template(raw: &str) -> Option<String> {
    cook(raw, true)
}

/// Resolve escape sequences in a string, template or identifier body.
///
/// Template bodies normalize `\r\n` and `\r` to `\n` and reject legacy octal
/// escapes.
fn cook(body: &str, template: bool) -> Option<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' && template {
            chars.next_if_eq(&'\n');
            out.push('\n');
            continue;
        }
        if c != '\\' {
            out.push(c);
            continue;
        }
        let esc = chars.next()?;
        match esc {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' if !matches!(chars.peek(), Some(d) if d.is_ascii_digit()) => out.push('\0'),
            '0'..='7' if template => return None,
            '0'..='7' => {
                let mut value = esc.to_digit(8)?;
                let max_len = if esc <= '3' { 3 } else { 2 };
                for _ in 1..max_len {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(value)?);
            }
            '8' | '9' if template => return None,
            'x' => {
                let hi = chars.next()?.to_digit(16)?;
                let lo = chars.next()?.to_digit(16)?;
                out.push(char::from_u32(hi * 16 + lo)?);
            }
            'u' => {
                let unit = read_unicode_escape(&mut chars)?;
                if (0xD800..0xDC00).contains(&unit) {
                    // Join a surrogate pair written as two escapes.
                    let mut lookahead = chars.clone();
                    if lookahead.next() == Some('\\') && lookahead.next() == Some('u') {
                        if let Some(low) = read_unicode_escape(&mut lookahead)
                            && (0xDC00..0xE000).contains(&low)
                        {
                            chars = lookahead;
                            let joined = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
                            out.push(char::from_u32(joined)?);
                            continue;
                        }
                    }
                    out.push('\u{FFFD}');
                } else {
                    out.push(char::from_u32(unit).unwrap_or('\u{FFFD}'));
                }
            }
            // Line continuations produce nothing.
            '\r' => {
                chars.next_if_eq(&'\n');
            }
            '\n' | '\u{2028}' | '\u{2029}' => {}
            other => out.push(other),
        }
    }
    Some(out)
}

fn read_unicode_escape(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<u32> {
    if chars.next_if_eq(&'{').is_some() {
        let mut value: u32 = 0;
        let mut digits = 0;
        loop {
            let c = chars.next()?;
            if c == '}' {
                break;
            }
            value = value.checked_mul(16)?.checked_add(c.to_digit(16)?)?;
            digits += 1;
        }
        (digits > 0 && value <= 0x10FFFF).then_some(value)
    } else {
        let mut value = 0;
        for _ in 0..4 {
            value = value * 16 + chars.next()?.to_digit(16)?;
        }
        Some(value)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Numeric parsing helper
// ─────────────────────────────────────────────────────────────────────────────

/// Parse the raw text of a numeric literal to an `f64`.
///
/// Numeric separators (`_`) and the BigInt suffix (`n`) are stripped before
/// parsing.  Returns [`f64::NAN`] if the raw text cannot be parsed (should not
/// happen for well-formed input).
fn parse_numeric_raw(raw: &str) -> f64 {
    let clean: String = raw.chars().filter(|&c| c != '_' && c != 'n').collect();
    let radix = match clean.get(..2) {
        Some("0x" | "0X") => 16,
        Some("0o" | "0O") => 8,
        Some("0b" | "0B") => 2,
        _ if clean.len() > 1 && clean.starts_with('0') && clean.bytes().all(|b| (b'0'..=b'7').contains(&b)) => {
            return digits_to_f64(&clean[1..], 8);
        }
        _ => return clean.parse::<f64>().unwrap_or(f64::NAN),
    };
    digits_to_f64(&clean[2..], radix)
}

fn digits_to_f64(digits: &str, radix: u32) -> f64 {
    digits.chars().try_fold(0.0_f64, |acc, c| {
        c.to_digit(radix).map(|d| acc * f64::from(radix) + f64::from(d))
    }).unwrap_or(f64::NAN)
}

/// Parse the digits of a BigInt literal (`123n`, `0xFFn`).
pub fn parse_bigint_raw(raw: &str) -> Option<BigInt> {
    let clean: String = raw.chars().filter(|&c| c != '_' && c != 'n').collect();
    let (digits, radix) = match clean.get(..2) {
        Some("0x" | "0X") => (&clean[2..], 16),
        Some("0o" | "0O") => (&clean[2..], 8),
        Some("0b" | "0B") => (&clean[2..], 2),
        _ => (clean.as_str(), 10),
    };
    BigInt::parse_bytes(digits.as_bytes(), radix)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Tokenise `src`, ignoring comments, and return a list of token kinds.
    fn kinds(src: &str) -> Vec<TokenKind> {
        Scanner::tokenize_all(src)
            .unwrap()
            .into_iter()
            .filter(|t| !t.kind.is_comment())
            .map(|t| t.kind)
            .collect()
    }

    fn tokens(src: &str) -> Vec<Token> {
        Scanner::tokenize_all(src).unwrap()
    }

    // ── Keywords / identifiers ────────────────────────────────────────────────

    #[test]
    fn test_keywords_and_contextual_words() {
        assert_eq!(
            kinds("typeof require of get async"),
            vec![
                TokenKind::Typeof,
                TokenKind::Identifier,
                TokenKind::Of,
                TokenKind::Get,
                TokenKind::Async,
            ]
        );
        assert!(TokenKind::Of.is_contextual());
        assert!(!TokenKind::Typeof.is_contextual());
        assert!(TokenKind::Default.is_identifier_name());
    }

    #[test]
    fn test_keyword_tokens_carry_their_text() {
        let toks = tokens("module.default");
        assert_eq!(toks[2].kind, TokenKind::Default);
        assert_eq!(toks[2].str_value(), "default");
    }

    #[test]
    fn test_escaped_identifier_is_never_a_keyword() {
        let toks = tokens(r"\u0069f");
        assert_eq!(toks[0].kind, TokenKind::Identifier);
        assert_eq!(toks[0].str_value(), "if");
    }

    #[test]
    fn test_private_identifier() {
        let toks = tokens("#secret");
        assert_eq!(toks[0].kind, TokenKind::PrivateIdentifier);
        assert_eq!(toks[0].str_value(), "secret");
    }

    // ── Numeric literals ──────────────────────────────────────────────────────

    #[test]
    fn test_numeric_values() {
        let cases = [
            ("42", 42.0),
            ("3.25", 3.25),
            (".5", 0.5),
            ("1e3", 1000.0),
            ("0x1F", 31.0),
            ("0o17", 15.0),
            ("0b101", 5.0),
            ("017", 15.0),
            ("1_000", 1000.0),
        ];
        for (src, expected) in cases {
            let toks = tokens(src);
            assert_eq!(toks[0].value, TokenValue::Number(expected), "{src}");
        }
    }

    #[test]
    fn test_bigint_literal() {
        let toks = tokens("12n");
        assert_eq!(toks[0].kind, TokenKind::NumericLiteral);
        assert_eq!(parse_bigint_raw(toks[0].text("12n")), Some(BigInt::from(12)));
        assert_eq!(parse_bigint_raw("0xffn"), Some(BigInt::from(255)));
        let wide = parse_bigint_raw("0x1_0000_0000_0000_0000_0000_0000_0000_0000n").expect("hex");
        assert_eq!(wide, BigInt::from(1) << 128u32);
    }

    #[test]
    fn test_identifier_after_number_is_error() {
        assert!(Scanner::tokenize_all("3in x").is_err());
    }

    // ── Strings and templates ─────────────────────────────────────────────────

    #[test]
    fn test_string_value_is_cooked() {
        let toks = tokens(r#""a\tb" 'it\'s' "\x41B\u{43}""#);
        assert_eq!(toks[0].str_value(), "a\tb");
        assert_eq!(toks[1].str_value(), "it's");
        assert_eq!(toks[2].str_value(), "ABC");
    }

    #[test]
    fn test_string_surrogate_pair_escape() {
        let toks = tokens(r#""\uD83D\uDE00""#);
        assert_eq!(toks[0].str_value(), "\u{1F600}");
    }

    #[test]
    fn test_string_line_continuation() {
        let toks = tokens("'ab\\\ncd'");
        assert_eq!(toks[0].str_value(), "abcd");
    }

    #[test]
    fn test_string_unterminated_error() {
        assert!(Scanner::tokenize_all(r#""unterminated"#).is_err());
    }

    #[test]
    fn test_template_parts() {
        let toks = tokens("`a ${x} b ${y}!`");
        let parts: Vec<_> = toks.iter().map(|t| (t.kind, t.str_value().to_string())).collect();
        assert_eq!(
            parts,
            vec![
                (TokenKind::TemplateHead, "a ".to_string()),
                (TokenKind::Identifier, "x".to_string()),
                (TokenKind::TemplateMiddle, " b ".to_string()),
                (TokenKind::Identifier, "y".to_string()),
                (TokenKind::TemplateTail, "!".to_string()),
            ]
        );
    }

    #[test]
    fn test_template_with_object_literal_substitution() {
        assert_eq!(
            kinds("`${{k:1}}`"),
            vec![
                TokenKind::TemplateHead,
                TokenKind::LeftBrace,
                TokenKind::Identifier,
                TokenKind::Colon,
                TokenKind::NumericLiteral,
                TokenKind::RightBrace,
                TokenKind::TemplateTail,
            ]
        );
    }

    #[test]
    fn test_cook_template() {
        assert_eq!(cook_template(r"a\nb").as_deref(), Some("a\nb"));
        assert_eq!(cook_template("a\r\nb").as_deref(), Some("a\nb"));
        assert_eq!(cook_template(r"\1"), None);
    }

    // ── Regular expressions ───────────────────────────────────────────────────

    #[test]
    fn test_regexp_after_assignment() {
        let toks = tokens("x = /a[/]b/gi");
        assert_eq!(toks[2].kind, TokenKind::RegExpLiteral);
        assert_eq!(toks[2].str_value(), "/a[/]b/gi");
    }

    #[test]
    fn test_division_after_identifier_and_paren() {
        assert_eq!(
            kinds("a / b"),
            vec![TokenKind::Identifier, TokenKind::Slash, TokenKind::Identifier]
        );
        assert_eq!(
            kinds("(a) /= 2"),
            vec![
                TokenKind::LeftParen,
                TokenKind::Identifier,
                TokenKind::RightParen,
                TokenKind::SlashEqual,
                TokenKind::NumericLiteral,
            ]
        );
    }

    #[test]
    fn test_rescan_regexp_after_checkpoint() {
        let mut scanner = Scanner::new("if (x) /re/.test(y)");
        for _ in 0..4 {
            scanner.next_token().unwrap();
        }
        let checkpoint = scanner.checkpoint();
        assert_eq!(scanner.next_token().unwrap().kind, TokenKind::Slash);
        scanner.restore(checkpoint);
        let tok = scanner.rescan_regexp().unwrap();
        assert_eq!(tok.kind, TokenKind::RegExpLiteral);
        assert_eq!(tok.str_value(), "/re/");
        assert_eq!(scanner.next_token().unwrap().kind, TokenKind::Dot);
    }

    // ── Comments and punctuators ──────────────────────────────────────────────

    #[test]
    fn test_comments_are_tokens() {
        let toks = tokens("/* webpackChunkName: \"a\" */ // tail");
        assert_eq!(toks[0].kind, TokenKind::MultiLineComment);
        assert_eq!(toks[0].str_value(), " webpackChunkName: \"a\" ");
        assert_eq!(toks[1].kind, TokenKind::SingleLineComment);
        assert_eq!(toks[1].str_value(), " tail");
    }

    #[test]
    fn test_hashbang_is_a_comment() {
        let toks = tokens("#!/usr/bin/env node\nx");
        assert_eq!(toks[0].kind, TokenKind::SingleLineComment);
        assert_eq!(toks[1].kind, TokenKind::Identifier);
    }

    #[test]
    fn test_longest_match_punctuators() {
        assert_eq!(
            kinds(">>>= ** ?. ?? ??= => !== ..."),
            vec![
                TokenKind::GreaterGreaterGreaterEqual,
                TokenKind::StarStar,
                TokenKind::QuestionDot,
                TokenKind::QuestionQuestion,
                TokenKind::QuestionQuestionEqual,
                TokenKind::Arrow,
                TokenKind::BangEqualEqual,
                TokenKind::DotDotDot,
            ]
        );
    }

    #[test]
    fn test_question_dot_before_digit_is_conditional() {
        assert_eq!(
            kinds("a?.5:1"),
            vec![
                TokenKind::Identifier,
                TokenKind::Question,
                TokenKind::NumericLiteral,
                TokenKind::Colon,
                TokenKind::NumericLiteral,
            ]
        );
    }

    // ── Positions / line terminators ──────────────────────────────────────────

    #[test]
    fn test_line_column_tracking() {
        let toks = tokens("x\r\n  y");
        assert_eq!(toks[1].span.start.line, 2);
        assert_eq!(toks[1].span.start.column, 3);
        assert_eq!(toks[1].span.start.offset, 5);
    }

    #[test]
    fn test_line_terminator_flag() {
        let toks = tokens("x y\nz");
        assert!(!toks[1].had_line_terminator_before);
        assert!(toks[2].had_line_terminator_before);
    }

    #[test]
    fn test_block_comment_with_newline_sets_flag() {
        let toks = tokens("a /*\n*/");
        assert!(toks[1].had_line_terminator_before);
    }

    #[test]
    fn test_error_reports_position() {
        let err = Scanner::tokenize_all("a\n  @").unwrap_err();
        assert!(matches!(err, QuarryError::SyntaxError { line: 2, .. }));
    }
}
