//! Parsed-tree node types for the Tally language.
//!
//! The tree is produced by an external parsing stage; the analyzer treats it
//! as well-formed and never mutates it. Every node carries a [`Span`] and a
//! stable [`NodeId`]; all analysis outputs (types, cost expressions, resolved
//! symbols, scopes) live in side tables keyed by `NodeId`, never on the nodes
//! themselves. Large recursive types are boxed to keep enum sizes reasonable.

use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

// ══════════════════════════════════════════════════════════════════════════════
// Node identity
// ══════════════════════════════════════════════════════════════════════════════

/// Stable identity of a tree node, assigned by the producer of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic [`NodeId`] allocator for tree producers (parser glue, tests,
/// and the prelude, which reserves the upper id range for platform
/// declarations).
#[derive(Debug)]
pub struct NodeIdGen {
    next: u32,
}

impl NodeIdGen {
    /// Allocator starting at id 0 — for parsed source trees.
    pub fn new() -> Self {
        Self { next: 0 }
    }

    /// Allocator starting at an arbitrary id — the prelude starts at
    /// `0x8000_0000` so platform ids never collide with parsed ones.
    pub fn starting_at(next: u32) -> Self {
        Self { next }
    }

    pub fn next(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}

impl Default for NodeIdGen {
    fn default() -> Self {
        Self::new()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ══════════════════════════════════════════════════════════════════════════════

/// A spanned identifier. May be path-qualified with dots (`Option.Some`).
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
// Type signifiers
// ══════════════════════════════════════════════════════════════════════════════

/// A type as written by the user — syntax, not semantics.
///
/// Signifiers are resolved to semantic types by the member-binding pass;
/// until then they are opaque names.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSignifier {
    pub id: NodeId,
    pub kind: SignifierKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignifierKind {
    /// A bare type name: `I64`, `Point`.
    Ground(String),
    /// A parameterized type name: `List<I64, 10>`.
    Parameterized {
        name: String,
        args: Vec<TypeSignifier>,
    },
    /// A function type literal: `(I64, Bool) -> I64`.
    FunctionType {
        params: Vec<TypeSignifier>,
        ret: Box<TypeSignifier>,
    },
    /// An omitted type, to be inferred.
    Implicit,
    /// A numeric literal used as a type argument — a fin bound: `List<I64, 10>`.
    NumericLiteral(u64),
}

// ══════════════════════════════════════════════════════════════════════════════
// Top level
// ══════════════════════════════════════════════════════════════════════════════

/// A complete parsed file: the root of analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct FileNode {
    pub id: NodeId,
    /// Source file name, if the source was named.
    pub name: Option<String>,
    pub defs: Vec<Def>,
    pub span: Span,
}

/// A top-level definition.
#[derive(Debug, Clone, PartialEq)]
pub enum Def {
    Function(FunctionDef),
    Record(RecordDef),
    Object(ObjectDef),
    Sum(SumDef),
}

impl Def {
    pub fn id(&self) -> NodeId {
        match self {
            Def::Function(d) => d.id,
            Def::Record(d) => d.id,
            Def::Object(d) => d.id,
            Def::Sum(d) => d.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Def::Function(d) => &d.name.name,
            Def::Record(d) => &d.name.name,
            Def::Object(d) => &d.name.name,
            Def::Sum(d) => &d.name.name,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Def::Function(d) => d.span,
            Def::Record(d) => d.span,
            Def::Object(d) => d.span,
            Def::Sum(d) => d.span,
        }
    }
}

/// A declared type parameter: `T` (standard) or `N fin` (a cost/size bound).
#[derive(Debug, Clone, PartialEq)]
pub struct TypeParamDecl {
    pub id: NodeId,
    pub name: Ident,
    /// True for fin-kind parameters — placeholders for a cost bound.
    pub fin: bool,
    pub span: Span,
}

/// A formal parameter: `x: I64`.
#[derive(Debug, Clone, PartialEq)]
pub struct FormalParamDecl {
    pub id: NodeId,
    pub name: Ident,
    pub sig: TypeSignifier,
    pub span: Span,
}

/// `fn name<T, N fin>(x: T): Ret { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub id: NodeId,
    pub name: Ident,
    pub type_params: Vec<TypeParamDecl>,
    pub params: Vec<FormalParamDecl>,
    pub return_sig: TypeSignifier,
    pub body: Block,
    pub span: Span,
}

/// A field declaration inside a record or object.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub id: NodeId,
    pub name: Ident,
    pub sig: TypeSignifier,
    pub mutable: bool,
    pub span: Span,
}

/// `record Name<T> { field: T }`
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDef {
    pub id: NodeId,
    pub name: Ident,
    pub type_params: Vec<TypeParamDecl>,
    pub fields: Vec<FieldDecl>,
    pub span: Span,
}

/// `object Name { field: I64 }` — a singleton.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDef {
    pub id: NodeId,
    pub name: Ident,
    pub fields: Vec<FieldDecl>,
    pub span: Span,
}

/// `sum Name<T> { Member1 ... }` — a closed set of record/object members.
#[derive(Debug, Clone, PartialEq)]
pub struct SumDef {
    pub id: NodeId,
    pub name: Ident,
    pub type_params: Vec<TypeParamDecl>,
    pub members: Vec<SumMember>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SumMember {
    Record(RecordDef),
    Object(ObjectDef),
}

impl SumMember {
    pub fn id(&self) -> NodeId {
        match self {
            SumMember::Record(d) => d.id,
            SumMember::Object(d) => d.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SumMember::Record(d) => &d.name.name,
            SumMember::Object(d) => &d.name.name,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements & blocks
// ══════════════════════════════════════════════════════════════════════════════

/// A braced sequence of lines. Introduces a scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: NodeId,
    pub lines: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let(LetStmt),
    Assign(AssignStmt),
    Return(ReturnStmt),
    Expr(Expr),
}

impl Stmt {
    pub fn id(&self) -> NodeId {
        match self {
            Stmt::Let(s) => s.id,
            Stmt::Assign(s) => s.id,
            Stmt::Return(s) => s.id,
            Stmt::Expr(e) => e.id,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Stmt::Let(s) => s.span,
            Stmt::Assign(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::Expr(e) => e.span,
        }
    }

    /// Stable node-kind name, used as the architecture cost-overlay key.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Stmt::Let(_) => "let",
            Stmt::Assign(_) => "assign",
            Stmt::Return(_) => "return",
            Stmt::Expr(e) => e.kind_name(),
        }
    }
}

/// `let x = e` / `let mut x: T = e`
#[derive(Debug, Clone, PartialEq)]
pub struct LetStmt {
    pub id: NodeId,
    pub name: Ident,
    pub mutable: bool,
    pub sig: Option<TypeSignifier>,
    pub value: Expr,
    pub span: Span,
}

/// `x = e` or `x.field = e`
#[derive(Debug, Clone, PartialEq)]
pub struct AssignStmt {
    pub id: NodeId,
    /// Target path: a local name followed by zero or more field names.
    pub target: Vec<Ident>,
    pub value: Expr,
    pub span: Span,
}

/// `return e`
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub id: NodeId,
    pub value: Expr,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    // ── Literals ──
    IntLit(i64),
    BoolLit(bool),
    CharLit(char),
    /// String literal — its type carries the literal's length as a fin bound.
    StringLit(String),
    /// Decimal literal, kept as written (the evaluator owns numeric parsing).
    DecimalLit(String),
    ListLit(Vec<Expr>),
    SetLit(Vec<Expr>),
    DictLit(Vec<(Expr, Expr)>),
    PairLit(Box<Expr>, Box<Expr>),

    // ── Names ──
    /// A (possibly path-qualified) name reference.
    Identifier(String),
    /// `object.member`
    MemberAccess { object: Box<Expr>, member: Ident },

    // ── Calls ──
    /// `callee<T, ...>(args)` — function call or record/member construction.
    Call {
        callee: Ident,
        type_args: Vec<TypeSignifier>,
        args: Vec<Expr>,
    },
    /// `object.method(args)` — resolves to a built-in member.
    MethodCall {
        object: Box<Expr>,
        method: Ident,
        args: Vec<Expr>,
    },

    // ── Control flow ──
    If {
        condition: Box<Expr>,
        then_block: Block,
        else_block: Option<Block>,
    },
    /// `for item in iterable { ... }`
    Foreach {
        item: Ident,
        iterable: Box<Expr>,
        body: Block,
    },
}

impl Expr {
    /// Stable node-kind name, used as the architecture cost-overlay key.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ExprKind::IntLit(_) => "int-literal",
            ExprKind::BoolLit(_) => "bool-literal",
            ExprKind::CharLit(_) => "char-literal",
            ExprKind::StringLit(_) => "string-literal",
            ExprKind::DecimalLit(_) => "decimal-literal",
            ExprKind::ListLit(_) => "list-literal",
            ExprKind::SetLit(_) => "set-literal",
            ExprKind::DictLit(_) => "dictionary-literal",
            ExprKind::PairLit(_, _) => "pair-literal",
            ExprKind::Identifier(_) => "identifier",
            ExprKind::MemberAccess { .. } => "member-access",
            ExprKind::Call { .. } => "call",
            ExprKind::MethodCall { .. } => "method-call",
            ExprKind::If { .. } => "if",
            ExprKind::Foreach { .. } => "foreach",
        }
    }
}

/// Cost-overlay key for block nodes.
pub const BLOCK_KIND: &str = "block";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_gen_monotonic() {
        let mut ids = NodeIdGen::new();
        assert_eq!(ids.next(), NodeId(0));
        assert_eq!(ids.next(), NodeId(1));
        let mut platform = NodeIdGen::starting_at(0x8000_0000);
        assert_eq!(platform.next(), NodeId(0x8000_0000));
    }

    #[test]
    fn test_kind_names_are_stable() {
        let mut ids = NodeIdGen::new();
        let span = Span::point(1, 1);
        let e = Expr {
            id: ids.next(),
            kind: ExprKind::IntLit(7),
            span,
        };
        assert_eq!(e.kind_name(), "int-literal");
        let s = Stmt::Expr(e);
        assert_eq!(s.kind_name(), "int-literal");
    }
}
