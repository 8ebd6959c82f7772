//! AST node types for the playground example language.
//!
//! Every node carries a [`Span`] for error reporting and for the
//! transformer's line-preserving rewrites. Large recursive types are boxed
//! to keep enum sizes reasonable.
//!
//! The same AST covers both syntaxes the system deals with: author-written
//! source (which may contain markup elements) and compiled module text
//! (which never does — the transformer has lowered every element to an
//! `h(...)` call by then).

use crate::Span;

// ══════════════════════════════════════════════════════════════════════════════
// Top Level
// ══════════════════════════════════════════════════════════════════════════════

/// A complete example module: imports followed by statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub imports: Vec<ImportDecl>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// `import { a, b } from "specifier"`
///
/// Import declarations are single-line by grammar — the transformer relies
/// on this to rewrite them without disturbing line numbering.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub names: Vec<Ident>,
    pub specifier: String,
    /// Span of the quoted specifier (for unresolved-import errors).
    pub specifier_span: Span,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ══════════════════════════════════════════════════════════════════════════════

/// A spanned identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let(LetStmt),
    Assign(AssignStmt),
    Fn(FnDecl),
    Return(ReturnStmt),
    If(IfStmt),
    Expr(Expr),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Let(s) => s.span,
            Stmt::Assign(s) => s.span,
            Stmt::Fn(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::Expr(e) => e.span,
        }
    }
}

/// `let name = expr`
#[derive(Debug, Clone, PartialEq)]
pub struct LetStmt {
    pub name: Ident,
    pub value: Expr,
    pub span: Span,
}

/// `name = expr` (the name must already be bound)
#[derive(Debug, Clone, PartialEq)]
pub struct AssignStmt {
    pub name: Ident,
    pub value: Expr,
    pub span: Span,
}

/// `fn name(params) { body }`
#[derive(Debug, Clone, PartialEq)]
pub struct FnDecl {
    pub name: Ident,
    pub params: Vec<Ident>,
    pub body: Block,
    pub span: Span,
}

/// `return [expr]`
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

/// `if cond { } [else if ... | else { }]`
#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_block: Block,
    pub else_branch: Option<ElseBranch>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElseBranch {
    ElseIf(Box<IfStmt>),
    Block(Block),
}

/// `{ stmts }` — function bodies and if/else arms.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    NumberLit(f64),
    StringLit(String),
    BoolLit(bool),
    NilLit,

    Identifier(String),
    ListLit(Vec<Expr>),
    /// `{ "key": expr, ident: expr }` — generated by the transformer for
    /// markup props, also available to authors for demo data.
    ObjectLit(Vec<ObjectEntry>),

    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Member {
        object: Box<Expr>,
        field: Ident,
    },
    Lambda(LambdaExpr),
    Paren(Box<Expr>),

    /// Inline markup. Only ever present in author-written source; the
    /// transformer lowers these before the realm sees the module.
    Element(Box<ElementExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectEntry {
    pub key: Ident,
    pub value: Expr,
    pub span: Span,
}

/// `fn(params) { body }`
#[derive(Debug, Clone, PartialEq)]
pub struct LambdaExpr {
    pub params: Vec<Ident>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    And,
    Or,
}

// ══════════════════════════════════════════════════════════════════════════════
// Markup
// ══════════════════════════════════════════════════════════════════════════════

/// `<name attr="str" attr={expr}> children </name>` or `<name ... />`.
///
/// Lower-case names are intrinsic tags; capitalized names are component
/// references resolved as identifiers at run time.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementExpr {
    pub name: Ident,
    pub attrs: Vec<Attr>,
    pub children: Vec<Child>,
    pub self_closing: bool,
    pub span: Span,
}

impl ElementExpr {
    /// Whether this element names a component (capitalized) rather than an
    /// intrinsic tag.
    pub fn is_component(&self) -> bool {
        self.name
            .name
            .starts_with(|c: char| c.is_ascii_uppercase())
    }
}

/// One attribute. A bare attribute (`<input disabled>`) has no value and
/// compiles to `true`.
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub name: Ident,
    pub value: Option<AttrValue>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// `attr="literal"`
    Str(String, Span),
    /// `attr={expr}`
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    Element(ElementExpr),
    /// `{expr}` interpolation.
    Expr(Expr),
    /// Raw text run, whitespace-collapsed.
    Text(TextRun),
}

impl Child {
    pub fn span(&self) -> Span {
        match self {
            Child::Element(e) => e.span,
            Child::Expr(e) => e.span,
            Child::Text(t) => t.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub span: Span,
}
