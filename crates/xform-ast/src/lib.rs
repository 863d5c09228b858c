//! AST types for the XForm language.
//!
//! Shaped after `petty_xpath1::ast` (a tagged `Expression` enum with small
//! helper methods, and separate sum types for location-path pieces) but
//! generalized from an XPath-only expression grammar to XForm's full
//! module/control-flow/constructor grammar.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    /// `and`/`or` never evaluate their right-hand side once the left side
    /// determines the result.
    pub fn short_circuits(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    VarRef(String),
    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    Let {
        name: String,
        value: Box<Expr>,
        body: Box<Expr>,
    },
    For {
        name: String,
        seq: Box<Expr>,
        where_clause: Option<Box<Expr>>,
        body: Box<Expr>,
    },
    Match {
        target: Box<Expr>,
        cases: Vec<(Pattern, Expr)>,
        default: Option<Box<Expr>>,
    },
    FuncCall {
        name: String,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Path(PathExpr),
    Constructor(Constructor),
    TextConstructor(Box<Expr>),
    /// A literal run of character data inside an element constructor body.
    Text(String),
    /// A `{expr}` hole inside an element constructor body.
    Interp(Box<Expr>),
}

impl Expr {
    /// True for the four control forms that sit at the top of the
    /// precedence ladder (`if`, `let`, `for`, `match`).
    pub fn is_control_form(&self) -> bool {
        matches!(
            self,
            Expr::If { .. } | Expr::Let { .. } | Expr::For { .. } | Expr::Match { .. }
        )
    }
}

/// One piece of an element constructor's content list. Structurally just
/// an `Expr`; the alias documents the narrower set of variants a parser
/// actually produces there (`Text`, `Interp`, `Constructor`, `TextConstructor`).
pub type Content = Expr;

#[derive(Debug, Clone, PartialEq)]
pub enum PathStart {
    /// Bare `.`
    Context,
    /// Leading `/`
    Root,
    /// Leading `.//`
    Desc,
    /// Leading `//`
    DescRoot,
    /// An identifier followed by a path continuation (`name/...`).
    Var(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Desc,
    DescOrSelf,
    SelfAxis,
    Parent,
    Attr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepTest {
    Name(String),
    Wildcard,
    TextTest,
    NodeTest,
    CommentTest,
    PiTest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathStep {
    pub axis: Axis,
    pub test: StepTest,
    pub predicates: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathExpr {
    pub start: PathStart,
    pub steps: Vec<PathStep>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constructor {
    pub name: String,
    pub attrs: Vec<(String, Expr)>,
    pub contents: Vec<Content>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypedPatternKind {
    Node,
    Text,
    Comment,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Wildcard,
    Typed(TypedPatternKind),
    Attribute(String),
    Element {
        name: String,
        var: Option<String>,
        child: Option<Box<Pattern>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub type_ref: Option<String>,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub params: Vec<Param>,
    pub body: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleDef {
    pub pattern: Pattern,
    pub body: Expr,
}

#[derive(Debug, Clone, Default)]
pub struct Module {
    pub functions: HashMap<String, FunctionDef>,
    pub rules: HashMap<String, Vec<RuleDef>>,
    /// Source order matters: each initializer may reference a
    /// previously-bound module variable.
    pub vars: Vec<(String, Expr)>,
    pub namespaces: HashMap<String, String>,
    pub imports: Vec<(String, Option<String>)>,
    pub expr: Option<Expr>,
}
