//! ES2025 Abstract Syntax Tree node definitions.
//!
//! Every node struct carries a [`SourceLocation`] field (`loc`) that pinpoints
//! its position in the source text.  [`SourceLocation`] is a type alias for
//! [`crate::parser::scanner::Span`] so it is [`Copy`].
//!
//! # Structure
//!
//! - [`Program`]: root node.
//! - [`Stmt`]: statement nodes, including `import`/`export` declarations.
//! - [`Expr`]: expression nodes.  Optional chains are wrapped in
//!   [`Expr::Chain`]; the member and call links inside carry an `optional`
//!   flag where `?.` was written.
//! - [`Pat`]: binding/assignment pattern nodes.
//! - Literal types: [`NullLit`], [`BoolLit`], [`NumLit`], [`BigIntLit`],
//!   [`StringLit`], [`RegExpLit`], [`TemplateLit`].
//!
//! [`ExprKind`] names every expression variant without its payload and keys
//! per-kind hook tables; [`NodeKey`] identifies one node for memoization.

use num_bigint::BigInt;

use crate::parser::scanner::Span;

// ─────────────────────────────────────────────────────────────────────────────
// Source location
// ─────────────────────────────────────────────────────────────────────────────

/// Location of a node in the source text.
pub type SourceLocation = Span;

// ─────────────────────────────────────────────────────────────────────────────
// Program
// ─────────────────────────────────────────────────────────────────────────────

/// Goal symbol the source was parsed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    /// Sloppy-mode script; `import`/`export` declarations are rejected.
    Script,
    /// ES module; implicitly strict.
    Module,
}

/// The root node.
#[derive(Debug, Clone)]
pub struct Program {
    pub loc: SourceLocation,
    pub source_type: SourceType,
    pub body: Vec<Stmt>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Common helpers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Ident {
    pub loc: SourceLocation,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct PrivateIdent {
    pub loc: SourceLocation,
    pub name: String,
}

/// A formal parameter with an optional default initializer.
#[derive(Debug, Clone)]
pub struct Param {
    pub loc: SourceLocation,
    pub pat: Pat,
    pub default: Option<Expr>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Statements
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Stmt {
    Block(BlockStmt),
    VarDecl(VarDecl),
    FnDecl(Box<FnDecl>),
    ClassDecl(Box<ClassDecl>),
    Expr(ExprStmt),
    If(IfStmt),
    For(ForStmt),
    ForIn(ForInStmt),
    ForOf(ForOfStmt),
    While(WhileStmt),
    DoWhile(DoWhileStmt),
    Switch(SwitchStmt),
    Try(TryStmt),
    Return(ReturnStmt),
    Throw(ThrowStmt),
    Break(BreakStmt),
    Continue(ContinueStmt),
    Labeled(LabeledStmt),
    Debugger(DebuggerStmt),
    With(WithStmt),
    Empty(EmptyStmt),

    // ── Module declarations (module source type only) ─────────────────────
    Import(ImportDecl),
    ExportNamed(ExportNamedDecl),
    ExportDefault(ExportDefaultDecl),
    ExportAll(ExportAllDecl),
}

impl Stmt {
    /// Source location of the statement.
    pub fn loc(&self) -> SourceLocation {
        match self {
            Stmt::Block(s) => s.loc,
            Stmt::VarDecl(s) => s.loc,
            Stmt::FnDecl(s) => s.loc,
            Stmt::ClassDecl(s) => s.loc,
            Stmt::Expr(s) => s.loc,
            Stmt::If(s) => s.loc,
            Stmt::For(s) => s.loc,
            Stmt::ForIn(s) => s.loc,
            Stmt::ForOf(s) => s.loc,
            Stmt::While(s) => s.loc,
            Stmt::DoWhile(s) => s.loc,
            Stmt::Switch(s) => s.loc,
            Stmt::Try(s) => s.loc,
            Stmt::Return(s) => s.loc,
            Stmt::Throw(s) => s.loc,
            Stmt::Break(s) => s.loc,
            Stmt::Continue(s) => s.loc,
            Stmt::Labeled(s) => s.loc,
            Stmt::Debugger(s) => s.loc,
            Stmt::With(s) => s.loc,
            Stmt::Empty(s) => s.loc,
            Stmt::Import(s) => s.loc,
            Stmt::ExportNamed(s) => s.loc,
            Stmt::ExportDefault(s) => s.loc,
            Stmt::ExportAll(s) => s.loc,
        }
    }

    /// Whether this is an `import`/`export` declaration.
    pub fn is_module_decl(&self) -> bool {
        matches!(
            self,
            Stmt::Import(_) | Stmt::ExportNamed(_) | Stmt::ExportDefault(_) | Stmt::ExportAll(_)
        )
    }
}

#[derive(Debug, Clone)]
pub struct BlockStmt {
    pub loc: SourceLocation,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct ExprStmt {
    pub loc: SourceLocation,
    pub expr: Box<Expr>,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub loc: SourceLocation,
    pub test: Box<Expr>,
    pub consequent: Box<Stmt>,
    pub alternate: Option<Box<Stmt>>,
}

#[derive(Debug, Clone)]
pub struct ForStmt {
    pub loc: SourceLocation,
    pub init: Option<ForInit>,
    pub test: Option<Box<Expr>>,
    pub update: Option<Box<Expr>>,
    pub body: Box<Stmt>,
}

#[derive(Debug, Clone)]
pub enum ForInit {
    VarDecl(VarDecl),
    Expr(Box<Expr>),
}

#[derive(Debug, Clone)]
pub struct ForInStmt {
    pub loc: SourceLocation,
    pub left: ForInOfLeft,
    pub right: Box<Expr>,
    pub body: Box<Stmt>,
}

#[derive(Debug, Clone)]
pub struct ForOfStmt {
    pub loc: SourceLocation,
    /// `for await (… of …)`.
    pub is_await: bool,
    pub left: ForInOfLeft,
    pub right: Box<Expr>,
    pub body: Box<Stmt>,
}

/// Left-hand side of `for…in` / `for…of`.
#[derive(Debug, Clone)]
pub enum ForInOfLeft {
    VarDecl(VarDecl),
    Pat(Pat),
}

#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub loc: SourceLocation,
    pub test: Box<Expr>,
    pub body: Box<Stmt>,
}

#[derive(Debug, Clone)]
pub struct DoWhileStmt {
    pub loc: SourceLocation,
    pub body: Box<Stmt>,
    pub test: Box<Expr>,
}

#[derive(Debug, Clone)]
pub struct SwitchStmt {
    pub loc: SourceLocation,
    pub discriminant: Box<Expr>,
    pub cases: Vec<SwitchCase>,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub loc: SourceLocation,
    /// `None` for the `default:` clause.
    pub test: Option<Expr>,
    pub consequent: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct TryStmt {
    pub loc: SourceLocation,
    /// Always a [`Stmt::Block`], as is `finalizer`.
    pub block: Box<Stmt>,
    pub handler: Option<CatchClause>,
    pub finalizer: Option<Box<Stmt>>,
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    pub loc: SourceLocation,
    pub param: Option<Pat>,
    pub body: BlockStmt,
}

#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub loc: SourceLocation,
    pub argument: Option<Box<Expr>>,
}

#[derive(Debug, Clone)]
pub struct ThrowStmt {
    pub loc: SourceLocation,
    pub argument: Box<Expr>,
}

#[derive(Debug, Clone)]
pub struct BreakStmt {
    pub loc: SourceLocation,
    pub label: Option<Ident>,
}

#[derive(Debug, Clone)]
pub struct ContinueStmt {
    pub loc: SourceLocation,
    pub label: Option<Ident>,
}

#[derive(Debug, Clone)]
pub struct LabeledStmt {
    pub loc: SourceLocation,
    pub label: Ident,
    pub body: Box<Stmt>,
}

#[derive(Debug, Clone)]
pub struct DebuggerStmt {
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct WithStmt {
    pub loc: SourceLocation,
    pub object: Box<Expr>,
    pub body: Box<Stmt>,
}

#[derive(Debug, Clone)]
pub struct EmptyStmt {
    pub loc: SourceLocation,
}

// ─────────────────────────────────────────────────────────────────────────────
// Variable declarations
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub loc: SourceLocation,
    pub kind: VarKind,
    pub declarators: Vec<VarDeclarator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

impl VarKind {
    /// Keyword spelling of the declaration kind.
    pub fn as_str(self) -> &'static str {
        match self {
            VarKind::Var => "var",
            VarKind::Let => "let",
            VarKind::Const => "const",
        }
    }
}

#[derive(Debug, Clone)]
pub struct VarDeclarator {
    pub loc: SourceLocation,
    pub id: Pat,
    pub init: Option<Box<Expr>>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Function declarations / expressions
// ─────────────────────────────────────────────────────────────────────────────

/// A function declaration.  `id` is `None` only for `export default function`.
#[derive(Debug, Clone)]
pub struct FnDecl {
    pub loc: SourceLocation,
    pub id: Option<Ident>,
    pub is_async: bool,
    pub is_generator: bool,
    pub params: Vec<Param>,
    pub body: BlockStmt,
}

#[derive(Debug, Clone)]
pub struct FnExpr {
    pub loc: SourceLocation,
    pub id: Option<Ident>,
    pub is_async: bool,
    pub is_generator: bool,
    pub params: Vec<Param>,
    pub body: BlockStmt,
}

#[derive(Debug, Clone)]
pub struct ArrowExpr {
    pub loc: SourceLocation,
    pub is_async: bool,
    pub params: Vec<Param>,
    pub body: ArrowBody,
}

#[derive(Debug, Clone)]
pub enum ArrowBody {
    Block(BlockStmt),
    Expr(Box<Expr>),
}

// ─────────────────────────────────────────────────────────────────────────────
// Class declarations / expressions
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub loc: SourceLocation,
    pub id: Option<Ident>,
    pub super_class: Option<Box<Expr>>,
    pub body: ClassBody,
}

#[derive(Debug, Clone)]
pub struct ClassExpr {
    pub loc: SourceLocation,
    pub id: Option<Ident>,
    pub super_class: Option<Box<Expr>>,
    pub body: ClassBody,
}

#[derive(Debug, Clone)]
pub struct ClassBody {
    pub loc: SourceLocation,
    pub body: Vec<ClassMember>,
}

#[derive(Debug, Clone)]
pub enum ClassMember {
    Method(MethodDef),
    Property(PropertyDef),
    StaticBlock(StaticBlock),
}

impl ClassMember {
    pub fn loc(&self) -> SourceLocation {
        match self {
            ClassMember::Method(m) => m.loc,
            ClassMember::Property(p) => p.loc,
            ClassMember::StaticBlock(b) => b.loc,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MethodDef {
    pub loc: SourceLocation,
    pub is_static: bool,
    pub kind: MethodKind,
    pub key: PropKey,
    pub value: FnExpr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Constructor,
    Method,
    Get,
    Set,
}

#[derive(Debug, Clone)]
pub struct PropertyDef {
    pub loc: SourceLocation,
    pub is_static: bool,
    pub key: PropKey,
    pub value: Option<Box<Expr>>,
}

#[derive(Debug, Clone)]
pub struct StaticBlock {
    pub loc: SourceLocation,
    pub body: Vec<Stmt>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Module declarations
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub loc: SourceLocation,
    pub specifiers: Vec<ImportSpecifier>,
    pub source: StringLit,
    pub attributes: Vec<ImportAttribute>,
}

#[derive(Debug, Clone)]
pub enum ImportSpecifier {
    /// `import { imported as local }`
    Named(ImportNamedSpecifier),
    /// `import local`
    Default(ImportDefaultSpecifier),
    /// `import * as local`
    Namespace(ImportNamespaceSpecifier),
}

impl ImportSpecifier {
    /// The binding introduced into module scope.
    pub fn local(&self) -> &Ident {
        match self {
            ImportSpecifier::Named(s) => &s.local,
            ImportSpecifier::Default(s) => &s.local,
            ImportSpecifier::Namespace(s) => &s.local,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImportNamedSpecifier {
    pub loc: SourceLocation,
    pub imported: ModuleExportName,
    pub local: Ident,
}

#[derive(Debug, Clone)]
pub struct ImportDefaultSpecifier {
    pub loc: SourceLocation,
    pub local: Ident,
}

#[derive(Debug, Clone)]
pub struct ImportNamespaceSpecifier {
    pub loc: SourceLocation,
    pub local: Ident,
}

/// One `with { key: "value" }` import attribute.
#[derive(Debug, Clone)]
pub struct ImportAttribute {
    pub loc: SourceLocation,
    pub key: String,
    pub value: StringLit,
}

#[derive(Debug, Clone)]
pub struct ExportNamedDecl {
    pub loc: SourceLocation,
    pub specifiers: Vec<ExportSpecifier>,
    pub source: Option<StringLit>,
    pub declaration: Option<Box<Stmt>>,
    pub attributes: Vec<ImportAttribute>,
}

#[derive(Debug, Clone)]
pub struct ExportSpecifier {
    pub loc: SourceLocation,
    pub local: ModuleExportName,
    pub exported: ModuleExportName,
}

#[derive(Debug, Clone)]
pub struct ExportDefaultDecl {
    pub loc: SourceLocation,
    pub declaration: ExportDefaultExpr,
}

#[derive(Debug, Clone)]
pub enum ExportDefaultExpr {
    Fn(Box<FnDecl>),
    Class(Box<ClassDecl>),
    Expr(Box<Expr>),
}

#[derive(Debug, Clone)]
pub struct ExportAllDecl {
    pub loc: SourceLocation,
    /// `export * as exported from …`
    pub exported: Option<ModuleExportName>,
    pub source: StringLit,
    pub attributes: Vec<ImportAttribute>,
}

/// An export name: an identifier or (ES2022) a string literal.
#[derive(Debug, Clone)]
pub enum ModuleExportName {
    Ident(Ident),
    Str(StringLit),
}

impl ModuleExportName {
    pub fn name(&self) -> &str {
        match self {
            ModuleExportName::Ident(i) => &i.name,
            ModuleExportName::Str(s) => &s.value,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Literals
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct NullLit {
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct BoolLit {
    pub loc: SourceLocation,
    pub value: bool,
}

#[derive(Debug, Clone)]
pub struct NumLit {
    pub loc: SourceLocation,
    pub value: f64,
    pub raw: String,
}

/// A BigInt literal.  `value` is `None` when the digits are malformed.
#[derive(Debug, Clone)]
pub struct BigIntLit {
    pub loc: SourceLocation,
    pub value: Option<BigInt>,
    pub raw: String,
}

#[derive(Debug, Clone)]
pub struct StringLit {
    pub loc: SourceLocation,
    /// Cooked value.
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct RegExpLit {
    pub loc: SourceLocation,
    pub pattern: String,
    pub flags: String,
}

#[derive(Debug, Clone)]
pub struct TemplateLit {
    pub loc: SourceLocation,
    pub quasis: Vec<TemplateElement>,
    pub expressions: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub struct TemplateElement {
    pub loc: SourceLocation,
    pub raw: String,
    /// `None` for an invalid escape inside a tagged template.
    pub cooked: Option<String>,
    pub tail: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Expressions
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Expr {
    // ── Literals ──────────────────────────────────────────────────────────
    Null(NullLit),
    Bool(BoolLit),
    Num(NumLit),
    Str(StringLit),
    BigInt(BigIntLit),
    Regexp(RegExpLit),
    Template(Box<TemplateLit>),

    // ── Primary ───────────────────────────────────────────────────────────
    Ident(Ident),
    This(ThisExpr),
    Super(SuperExpr),
    Array(Box<ArrayExpr>),
    Object(Box<ObjectExpr>),

    // ── Function-like ─────────────────────────────────────────────────────
    Fn(Box<FnExpr>),
    Arrow(Box<ArrowExpr>),
    Class(Box<ClassExpr>),

    // ── Operators ─────────────────────────────────────────────────────────
    Unary(Box<UnaryExpr>),
    Update(Box<UpdateExpr>),
    Binary(Box<BinaryExpr>),
    Logical(Box<LogicalExpr>),
    Conditional(Box<ConditionalExpr>),
    Assign(Box<AssignExpr>),
    Sequence(Box<SequenceExpr>),

    // ── Member / call ─────────────────────────────────────────────────────
    Member(Box<MemberExpr>),
    Call(Box<CallExpr>),
    New(Box<NewExpr>),
    /// Root of an optional chain such as `a?.b.c()`.
    Chain(Box<ChainExpr>),

    TaggedTemplate(Box<TaggedTemplateExpr>),
    Spread(Box<SpreadElement>),
    Yield(Box<YieldExpr>),
    Await(Box<AwaitExpr>),

    // ── Dynamic import / meta ─────────────────────────────────────────────
    Import(Box<ImportExpr>),
    MetaProp(MetaPropExpr),
}

/// Payload-free discriminant of [`Expr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprKind {
    Null,
    Bool,
    Num,
    Str,
    BigInt,
    Regexp,
    Template,
    Ident,
    This,
    Super,
    Array,
    Object,
    Fn,
    Arrow,
    Class,
    Unary,
    Update,
    Binary,
    Logical,
    Conditional,
    Assign,
    Sequence,
    Member,
    Call,
    New,
    Chain,
    TaggedTemplate,
    Spread,
    Yield,
    Await,
    Import,
    MetaProp,
}

/// Identity of one AST node: its kind and byte range.
///
/// Two distinct nodes of the same kind never share a range, so the key is
/// stable for the lifetime of a parse and can key memo tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub kind: ExprKind,
    pub start: usize,
    pub end: usize,
}

impl Expr {
    /// Source location of the expression.
    pub fn loc(&self) -> SourceLocation {
        match self {
            Expr::Null(e) => e.loc,
            Expr::Bool(e) => e.loc,
            Expr::Num(e) => e.loc,
            Expr::Str(e) => e.loc,
            Expr::BigInt(e) => e.loc,
            Expr::Regexp(e) => e.loc,
            Expr::Template(e) => e.loc,
            Expr::Ident(e) => e.loc,
            Expr::This(e) => e.loc,
            Expr::Super(e) => e.loc,
            Expr::Array(e) => e.loc,
            Expr::Object(e) => e.loc,
            Expr::Fn(e) => e.loc,
            Expr::Arrow(e) => e.loc,
            Expr::Class(e) => e.loc,
            Expr::Unary(e) => e.loc,
            Expr::Update(e) => e.loc,
            Expr::Binary(e) => e.loc,
            Expr::Logical(e) => e.loc,
            Expr::Conditional(e) => e.loc,
            Expr::Assign(e) => e.loc,
            Expr::Sequence(e) => e.loc,
            Expr::Member(e) => e.loc,
            Expr::Call(e) => e.loc,
            Expr::New(e) => e.loc,
            Expr::Chain(e) => e.loc,
            Expr::TaggedTemplate(e) => e.loc,
            Expr::Spread(e) => e.loc,
            Expr::Yield(e) => e.loc,
            Expr::Await(e) => e.loc,
            Expr::Import(e) => e.loc,
            Expr::MetaProp(e) => e.loc,
        }
    }

    /// The expression's kind.
    pub fn kind(&self) -> ExprKind {
        match self {
            Expr::Null(_) => ExprKind::Null,
            Expr::Bool(_) => ExprKind::Bool,
            Expr::Num(_) => ExprKind::Num,
            Expr::Str(_) => ExprKind::Str,
            Expr::BigInt(_) => ExprKind::BigInt,
            Expr::Regexp(_) => ExprKind::Regexp,
            Expr::Template(_) => ExprKind::Template,
            Expr::Ident(_) => ExprKind::Ident,
            Expr::This(_) => ExprKind::This,
            Expr::Super(_) => ExprKind::Super,
            Expr::Array(_) => ExprKind::Array,
            Expr::Object(_) => ExprKind::Object,
            Expr::Fn(_) => ExprKind::Fn,
            Expr::Arrow(_) => ExprKind::Arrow,
            Expr::Class(_) => ExprKind::Class,
            Expr::Unary(_) => ExprKind::Unary,
            Expr::Update(_) => ExprKind::Update,
            Expr::Binary(_) => ExprKind::Binary,
            Expr::Logical(_) => ExprKind::Logical,
            Expr::Conditional(_) => ExprKind::Conditional,
            Expr::Assign(_) => ExprKind::Assign,
            Expr::Sequence(_) => ExprKind::Sequence,
            Expr::Member(_) => ExprKind::Member,
            Expr::Call(_) => ExprKind::Call,
            Expr::New(_) => ExprKind::New,
            Expr::Chain(_) => ExprKind::Chain,
            Expr::TaggedTemplate(_) => ExprKind::TaggedTemplate,
            Expr::Spread(_) => ExprKind::Spread,
            Expr::Yield(_) => ExprKind::Yield,
            Expr::Await(_) => ExprKind::Await,
            Expr::Import(_) => ExprKind::Import,
            Expr::MetaProp(_) => ExprKind::MetaProp,
        }
    }

    /// Memoization key for this node.
    pub fn key(&self) -> NodeKey {
        let loc = self.loc();
        NodeKey {
            kind: self.kind(),
            start: loc.start.offset,
            end: loc.end.offset,
        }
    }

    /// Strip a [`Expr::Chain`] wrapper, if any.
    pub fn unwrap_chain(&self) -> &Expr {
        match self {
            Expr::Chain(chain) => &chain.expression,
            other => other,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ThisExpr {
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct SuperExpr {
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct ArrayExpr {
    pub loc: SourceLocation,
    /// `None` entries are holes (`[a, , b]`).
    pub elements: Vec<Option<Expr>>,
}

#[derive(Debug, Clone)]
pub struct ObjectExpr {
    pub loc: SourceLocation,
    pub properties: Vec<ObjectProp>,
}

#[derive(Debug, Clone)]
pub enum ObjectProp {
    Prop(Box<Prop>),
    Spread(SpreadElement),
}

#[derive(Debug, Clone)]
pub struct Prop {
    pub loc: SourceLocation,
    pub key: PropKey,
    pub value: PropValue,
}

#[derive(Debug, Clone)]
pub enum PropKey {
    Ident(Ident),
    Private(PrivateIdent),
    Str(StringLit),
    Num(NumLit),
    Computed(Box<Expr>),
}

impl PropKey {
    pub fn is_computed(&self) -> bool {
        matches!(self, PropKey::Computed(_))
    }

    pub fn loc(&self) -> SourceLocation {
        match self {
            PropKey::Ident(i) => i.loc,
            PropKey::Private(p) => p.loc,
            PropKey::Str(s) => s.loc,
            PropKey::Num(n) => n.loc,
            PropKey::Computed(e) => e.loc(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum PropValue {
    Value(Box<Expr>),
    /// `{ a }`; the value is the identifier named by the key.
    Shorthand,
    Get(FnExpr),
    Set(FnExpr),
    Method(FnExpr),
}

#[derive(Debug, Clone)]
pub struct SpreadElement {
    pub loc: SourceLocation,
    pub argument: Box<Expr>,
}

#[derive(Debug, Clone)]
pub struct UnaryExpr {
    pub loc: SourceLocation,
    pub op: UnaryOp,
    pub argument: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Minus,
    Plus,
    Not,
    BitNot,
    Typeof,
    Void,
    Delete,
}

#[derive(Debug, Clone)]
pub struct UpdateExpr {
    pub loc: SourceLocation,
    pub op: UpdateOp,
    pub prefix: bool,
    pub argument: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub loc: SourceLocation,
    pub op: BinaryOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Shl,
    Shr,
    UShr,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Exp,
    BitOr,
    BitXor,
    BitAnd,
    In,
    Instanceof,
}

#[derive(Debug, Clone)]
pub struct LogicalExpr {
    pub loc: SourceLocation,
    pub op: LogicalOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
    NullishCoalesce,
}

#[derive(Debug, Clone)]
pub struct ConditionalExpr {
    pub loc: SourceLocation,
    pub test: Box<Expr>,
    pub consequent: Box<Expr>,
    pub alternate: Box<Expr>,
}

/// Assignment.  Simple targets are [`Pat::Ident`] or [`Pat::Expr`];
/// destructuring targets use the other pattern variants.
#[derive(Debug, Clone)]
pub struct AssignExpr {
    pub loc: SourceLocation,
    pub op: AssignOp,
    pub left: Pat,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
    ExpAssign,
    ShlAssign,
    ShrAssign,
    UShrAssign,
    BitOrAssign,
    BitXorAssign,
    BitAndAssign,
    LogicalAndAssign,
    LogicalOrAssign,
    NullishAssign,
}

#[derive(Debug, Clone)]
pub struct SequenceExpr {
    pub loc: SourceLocation,
    pub expressions: Vec<Expr>,
}

/// `object.property`, `object[property]` or, inside a chain,
/// `object?.property`.
#[derive(Debug, Clone)]
pub struct MemberExpr {
    pub loc: SourceLocation,
    pub object: Box<Expr>,
    pub property: MemberProp,
    pub optional: bool,
}

impl MemberExpr {
    pub fn is_computed(&self) -> bool {
        matches!(self.property, MemberProp::Computed(_))
    }
}

#[derive(Debug, Clone)]
pub enum MemberProp {
    Ident(Ident),
    Private(PrivateIdent),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone)]
pub struct CallExpr {
    pub loc: SourceLocation,
    pub callee: Box<Expr>,
    pub arguments: Vec<Expr>,
    /// `callee?.(…)`.
    pub optional: bool,
}

#[derive(Debug, Clone)]
pub struct NewExpr {
    pub loc: SourceLocation,
    pub callee: Box<Expr>,
    pub arguments: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub struct ChainExpr {
    pub loc: SourceLocation,
    /// A [`Expr::Member`] or [`Expr::Call`].
    pub expression: Box<Expr>,
}

#[derive(Debug, Clone)]
pub struct TaggedTemplateExpr {
    pub loc: SourceLocation,
    pub tag: Box<Expr>,
    pub quasi: TemplateLit,
}

#[derive(Debug, Clone)]
pub struct YieldExpr {
    pub loc: SourceLocation,
    pub delegate: bool,
    pub argument: Option<Box<Expr>>,
}

#[derive(Debug, Clone)]
pub struct AwaitExpr {
    pub loc: SourceLocation,
    pub argument: Box<Expr>,
}

/// Dynamic `import(source, options?)`.
#[derive(Debug, Clone)]
pub struct ImportExpr {
    pub loc: SourceLocation,
    pub source: Box<Expr>,
    pub options: Option<Box<Expr>>,
}

/// `new.target` or `import.meta`.
#[derive(Debug, Clone)]
pub struct MetaPropExpr {
    pub loc: SourceLocation,
    pub meta: Ident,
    pub property: Ident,
}

// ─────────────────────────────────────────────────────────────────────────────
// Patterns
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Pat {
    Ident(Ident),
    Array(Box<ArrayPat>),
    Object(Box<ObjectPat>),
    Rest(Box<RestElement>),
    Assign(Box<AssignPat>),
    /// A member expression used as an assignment target.
    Expr(Box<Expr>),
}

impl Pat {
    pub fn loc(&self) -> SourceLocation {
        match self {
            Pat::Ident(p) => p.loc,
            Pat::Array(p) => p.loc,
            Pat::Object(p) => p.loc,
            Pat::Rest(p) => p.loc,
            Pat::Assign(p) => p.loc,
            Pat::Expr(e) => e.loc(),
        }
    }

    /// Visit every identifier bound by this pattern, in source order.
    /// Default values and computed keys are not visited.
    pub fn for_each_binding<'a>(&'a self, f: &mut impl FnMut(&'a Ident)) {
        match self {
            Pat::Ident(id) => f(id),
            Pat::Array(arr) => {
                for el in arr.elements.iter().flatten() {
                    el.for_each_binding(f);
                }
            }
            Pat::Object(obj) => {
                for prop in &obj.properties {
                    match prop {
                        ObjectPatProp::KeyValue(kv) => kv.value.for_each_binding(f),
                        ObjectPatProp::Assign(a) => f(&a.key),
                        ObjectPatProp::Rest(r) => r.argument.for_each_binding(f),
                    }
                }
            }
            Pat::Rest(r) => r.argument.for_each_binding(f),
            Pat::Assign(a) => a.left.for_each_binding(f),
            Pat::Expr(_) => {}
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArrayPat {
    pub loc: SourceLocation,
    pub elements: Vec<Option<Pat>>,
}

#[derive(Debug, Clone)]
pub struct ObjectPat {
    pub loc: SourceLocation,
    pub properties: Vec<ObjectPatProp>,
}

#[derive(Debug, Clone)]
pub enum ObjectPatProp {
    /// `{ key: value }`
    KeyValue(KeyValuePatProp),
    /// `{ key }` or `{ key = default }`
    Assign(AssignPatProp),
    /// `{ ...rest }`
    Rest(RestElement),
}

#[derive(Debug, Clone)]
pub struct KeyValuePatProp {
    pub loc: SourceLocation,
    pub key: PropKey,
    pub value: Pat,
}

#[derive(Debug, Clone)]
pub struct AssignPatProp {
    pub loc: SourceLocation,
    pub key: Ident,
    pub value: Option<Box<Expr>>,
}

#[derive(Debug, Clone)]
pub struct RestElement {
    pub loc: SourceLocation,
    pub argument: Box<Pat>,
}

#[derive(Debug, Clone)]
pub struct AssignPat {
    pub loc: SourceLocation,
    pub left: Box<Pat>,
    pub right: Box<Expr>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::scanner::Position;

    fn loc(start: usize, end: usize) -> SourceLocation {
        Span::new(
            Position {
                offset: start,
                line: 1,
                column: start as u32 + 1,
            },
            Position {
                offset: end,
                line: 1,
                column: end as u32 + 1,
            },
        )
    }

    fn ident(name: &str, start: usize) -> Ident {
        Ident {
            loc: loc(start, start + name.len()),
            name: name.into(),
        }
    }

    #[test]
    fn test_expr_kind_and_key() {
        let e = Expr::Ident(ident("require", 4));
        assert_eq!(e.kind(), ExprKind::Ident);
        assert_eq!(
            e.key(),
            NodeKey {
                kind: ExprKind::Ident,
                start: 4,
                end: 11
            }
        );
    }

    #[test]
    fn test_unwrap_chain() {
        let member = Expr::Member(Box::new(MemberExpr {
            loc: loc(0, 4),
            object: Box::new(Expr::Ident(ident("a", 0))),
            property: MemberProp::Ident(ident("b", 3)),
            optional: true,
        }));
        let chain = Expr::Chain(Box::new(ChainExpr {
            loc: loc(0, 4),
            expression: Box::new(member),
        }));
        assert_eq!(chain.kind(), ExprKind::Chain);
        assert_eq!(chain.unwrap_chain().kind(), ExprKind::Member);
    }

    #[test]
    fn test_pattern_bindings_in_source_order() {
        // { a, b: [c, ...d], ...e } = …
        let pat = Pat::Object(Box::new(ObjectPat {
            loc: loc(0, 20),
            properties: vec![
                ObjectPatProp::Assign(AssignPatProp {
                    loc: loc(2, 3),
                    key: ident("a", 2),
                    value: None,
                }),
                ObjectPatProp::KeyValue(KeyValuePatProp {
                    loc: loc(5, 15),
                    key: PropKey::Ident(ident("b", 5)),
                    value: Pat::Array(Box::new(ArrayPat {
                        loc: loc(8, 15),
                        elements: vec![
                            Some(Pat::Ident(ident("c", 9))),
                            Some(Pat::Rest(Box::new(RestElement {
                                loc: loc(12, 16),
                                argument: Box::new(Pat::Ident(ident("d", 15))),
                            }))),
                        ],
                    })),
                }),
                ObjectPatProp::Rest(RestElement {
                    loc: loc(17, 21),
                    argument: Box::new(Pat::Ident(ident("e", 20))),
                }),
            ],
        }));
        let mut names = Vec::new();
        pat.for_each_binding(&mut |id| names.push(id.name.as_str()));
        assert_eq!(names, vec!["a", "c", "d", "e"]);
    }

    #[test]
    fn test_member_target_binds_nothing() {
        let pat = Pat::Expr(Box::new(Expr::This(ThisExpr { loc: loc(0, 4) })));
        let mut count = 0;
        pat.for_each_binding(&mut |_| count += 1);
        assert_eq!(count, 0);
    }

    #[test]
    fn test_module_decl_detection() {
        let stmt = Stmt::ExportAll(ExportAllDecl {
            loc: loc(0, 20),
            exported: None,
            source: StringLit {
                loc: loc(14, 19),
                value: "./a".into(),
            },
            attributes: vec![],
        });
        assert!(stmt.is_module_decl());
        assert!(!Stmt::Empty(EmptyStmt { loc: loc(0, 1) }).is_module_decl());
    }

    #[test]
    fn test_var_kind_spelling() {
        assert_eq!(VarKind::Const.as_str(), "const");
        assert_eq!(VarKind::Let.as_str(), "let");
    }
}
