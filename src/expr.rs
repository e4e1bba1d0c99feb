//! The Nix expression tree consumed by this crate.
//!
//! The tree is produced by an external front end; this crate never parses
//! source text itself. Every node owns its children exclusively, so the tree
//! is acyclic and needs no reference counting. An absent node (a missing
//! `or` default on a select, a formal parameter without a default) is
//! represented as `Option` and is a valid case in its own right, never an
//! error.
//!
//! Nodes are immutable for this crate's lifetime: everything downstream
//! borrows `&Expr` and only ever reads positions and literal payloads.

use std::collections::BTreeMap;
use std::fmt;

/// A 1-based (line, column) source position: where a token begins in the
/// original file.
///
/// Positions are attached to function applications and attribute bindings;
/// literal nodes carry none of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Pos {
    pub line: u32,
    pub column: u32,
}

impl Pos {
    pub fn new(line: u32, column: u32) -> Self {
        Pos { line, column }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// One syntactic construct of the Nix expression language.
///
/// This is a closed sum type: dispatch over it is a single exhaustive match,
/// so there is no most-specific-first ordering hazard between structurally
/// overlapping variants. The enum is `#[non_exhaustive]` so that variants
/// added by a newer front end reach [`crate::visit::ExprVisitor::visit_unknown`]
/// in downstream code instead of crashing it.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Expr {
    /// Integer literal.
    Int(i64),
    /// Plain, non-interpolated string literal: `"..."`.
    Str(StrLit),
    /// Indented string literal: `''...''`.
    IndStr(IndStrLit),
    /// Path literal: `./foo/bar.nix`.
    Path(PathLit),
    /// Variable reference.
    Var(Var),
    /// Field select: `subject.a.b or default`.
    Select(Select),
    /// Has-field test: `subject ? a.b`.
    HasAttr(HasAttr),
    /// Record (attribute set) literal: `{ a = 1; }` or `rec { ... }`.
    Attrs(AttrSet),
    /// List literal.
    List(List),
    /// Lambda: `x: body` or `{ a, b ? 0 }: body`.
    Lambda(Lambda),
    /// Let binding: `let ... in body`.
    Let(Let),
    /// Scope injection: `with attrs; body`.
    With(With),
    /// Conditional: `if cond then a else b`.
    If(If),
    /// Assertion: `assert cond; body`.
    Assert(Assert),
    /// Boolean negation: `!e`.
    Not(Not),
    /// Function application: `f x`.
    App(App),
    /// Equality: `a == b`.
    Eq(Binary),
    /// Inequality: `a != b`.
    NEq(Binary),
    /// Boolean and: `a && b`.
    And(Binary),
    /// Boolean or: `a || b`.
    Or(Binary),
    /// Implication: `a -> b`.
    Impl(Binary),
    /// Record merge: `a // b`.
    Update(Binary),
    /// List concatenation: `a ++ b`.
    ConcatLists(Binary),
    /// String concatenation / interpolation: `"a${b}c"`, `a + b`.
    ConcatStrings(ConcatStrings),
    /// Position-only marker: `__curPos`.
    CurPos(Pos),
}

/// Plain string literal payload. Interpolated strings are
/// [`Expr::ConcatStrings`], never this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrLit {
    pub value: String,
}

/// Indented (`''...''`) string literal payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndStrLit {
    pub value: String,
}

/// Path literal payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathLit {
    pub path: String,
}

/// Bare variable reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Var {
    pub name: String,
}

/// `subject.path` with an optional `or default`.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub subject: Box<Expr>,
    pub path: Vec<String>,
    pub default: Option<Box<Expr>>,
}

/// `subject ? path`.
#[derive(Debug, Clone, PartialEq)]
pub struct HasAttr {
    pub subject: Box<Expr>,
    pub path: Vec<String>,
}

/// A statically named attribute binding inside an [`AttrSet`].
///
/// The position points at the start of the attribute name in the source,
/// which is what the scanner's column heuristic builds on.
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub pos: Pos,
    pub value: Expr,
}

/// A dynamically named attribute binding: `${name} = value;`.
#[derive(Debug, Clone, PartialEq)]
pub struct DynAttr {
    pub pos: Pos,
    pub name: Expr,
    pub value: Expr,
}

/// Attribute set literal. Statically named bindings live in a sorted table
/// keyed by name; dynamically named ones keep their declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttrSet {
    pub recursive: bool,
    pub attrs: BTreeMap<String, Attr>,
    pub dynamic_attrs: Vec<DynAttr>,
}

/// List literal payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct List {
    pub elems: Vec<Expr>,
}

/// One formal parameter of a pattern lambda, with its optional default.
#[derive(Debug, Clone, PartialEq)]
pub struct Formal {
    pub name: String,
    pub default: Option<Expr>,
}

/// Lambda payload. `arg` is the plain argument name (`x:` form or the
/// `args @ { ... }` binding); `formals` are the destructured parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    pub arg: Option<String>,
    pub formals: Vec<Formal>,
    pub body: Box<Expr>,
}

/// `let defs in body`.
#[derive(Debug, Clone, PartialEq)]
pub struct Let {
    pub defs: AttrSet,
    pub body: Box<Expr>,
}

/// `with scope; body`.
#[derive(Debug, Clone, PartialEq)]
pub struct With {
    pub scope: Box<Expr>,
    pub body: Box<Expr>,
}

/// `if cond then then_branch else else_branch`.
#[derive(Debug, Clone, PartialEq)]
pub struct If {
    pub cond: Box<Expr>,
    pub then_branch: Box<Expr>,
    pub else_branch: Box<Expr>,
}

/// `assert cond; body`.
#[derive(Debug, Clone, PartialEq)]
pub struct Assert {
    pub cond: Box<Expr>,
    pub body: Box<Expr>,
}

/// `!operand`.
#[derive(Debug, Clone, PartialEq)]
pub struct Not {
    pub operand: Box<Expr>,
}

/// Function application. This is one of the few nodes that knows its own
/// position.
#[derive(Debug, Clone, PartialEq)]
pub struct App {
    pub pos: Pos,
    pub func: Box<Expr>,
    pub arg: Box<Expr>,
}

/// Shared payload of the two-operand variants (`==`, `!=`, `&&`, `||`,
/// `->`, `//`, `++`).
#[derive(Debug, Clone, PartialEq)]
pub struct Binary {
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
}

/// String concatenation payload. The part list mirrors the front end's
/// nullable field: a node with no list at all is valid and has no children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConcatStrings {
    pub parts: Option<Vec<Expr>>,
}

impl Expr {
    /// Convenience constructor for a plain string literal.
    pub fn string(value: impl Into<String>) -> Self {
        Expr::Str(StrLit {
            value: value.into(),
        })
    }

    /// Convenience constructor for a variable reference.
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(Var { name: name.into() })
    }

    /// Convenience constructor for a function application.
    pub fn app(pos: Pos, func: Expr, arg: Expr) -> Self {
        Expr::App(App {
            pos,
            func: Box::new(func),
            arg: Box::new(arg),
        })
    }
}

impl AttrSet {
    /// Bind a statically named attribute.
    pub fn bind(&mut self, name: impl Into<String>, pos: Pos, value: Expr) -> &mut Self {
        self.attrs.insert(name.into(), Attr { pos, value });
        self
    }
}
