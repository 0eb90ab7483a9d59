#![forbid(unsafe_code)]

//! Syntax trees for guarded-command programs and their specifications.
//!
//! Nodes are plain data: every transformation elsewhere in the workspace
//! builds new trees instead of mutating these.

mod display;
mod json;
mod names;

use miette::SourceSpan;
use serde::{Deserialize, Serialize};

pub use names::{NameOptions, Names};

pub type Span = SourceSpan;

/// A row/column pair. Rows are 1-based source lines, columns are 0-based.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Byte offset of this position inside `src`, clamped to the text.
    pub fn offset_in(&self, src: &str) -> usize {
        let row = self.row.max(1);
        let mut offset = 0;
        for (i, line) in src.split_inclusive('\n').enumerate() {
            if i + 1 == row {
                let line_len = line.trim_end_matches('\n').len();
                return offset + self.col.min(line_len);
            }
            offset += line.len();
        }
        src.len()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
    pub start: Position,
    pub end: Position,
}

impl TextRange {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// The range starting where `first` starts and ending where `last` ends.
    pub fn cover(first: TextRange, last: TextRange) -> Self {
        Self {
            start: first.start,
            end: last.end,
        }
    }

    pub fn span_in(&self, src: &str) -> Span {
        let start = self.start.offset_in(src);
        let end = self.end.offset_in(src).max(start);
        SourceSpan::new(start.into(), end - start)
    }
}

/// A map or scalar reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Variable {
    Name {
        name: String,
    },
    /// `base[selector]`
    Select {
        base: Box<Variable>,
        selector: Box<IntExpr>,
    },
    /// The value of `base` with index `selector` replaced by `value`.
    Store {
        base: Box<Variable>,
        selector: Box<IntExpr>,
        value: Box<Expr>,
    },
}

/// A value that can stand in a substitution, a call argument or an rvalue:
/// either an integer expression or a map-valued variable.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expr {
    Map(Variable),
    Int(IntExpr),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Plus,
    Minus,
    Mult,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BoolOp {
    And,
    Or,
    Implies,
    Iff,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompOp {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<>")]
    Ne,
}

impl CompOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompOp::Lt => "<",
            CompOp::Gt => ">",
            CompOp::Le => "<=",
            CompOp::Ge => ">=",
            CompOp::Eq => "=",
            CompOp::Ne => "<>",
        }
    }
}

/// A binder shared by quantifiers and aggregates: `(Q k : condition : inner)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Quantified<B> {
    pub bound_var: String,
    pub condition: Box<Predicate>,
    pub inner: Box<B>,
}

impl<B> Quantified<B> {
    pub fn new(bound_var: impl Into<String>, condition: Predicate, inner: B) -> Self {
        Self {
            bound_var: bound_var.into(),
            condition: Box::new(condition),
            inner: Box::new(inner),
        }
    }
}

/// Serialized with one `type` tag per operator, see `json.rs`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IntExpr {
    Const {
        value: i64,
    },
    Var {
        var: Variable,
    },
    Negate {
        inner: Box<IntExpr>,
    },
    Binary {
        op: ArithOp,
        left: Box<IntExpr>,
        right: Box<IntExpr>,
    },
    /// Shorthand invocation; arguments are integers or map values.
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Sum(Quantified<IntExpr>),
    Prod(Quantified<IntExpr>),
    /// Number of bound values satisfying both condition and inner.
    Count(Quantified<Predicate>),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Predicate {
    Const {
        value: bool,
    },
    Not {
        inner: Box<Predicate>,
    },
    Binary {
        op: BoolOp,
        left: Box<Predicate>,
        right: Box<Predicate>,
    },
    Comp {
        op: CompOp,
        left: Box<IntExpr>,
        right: Box<IntExpr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
    /// `arr2[0..n)` is a permutation of `arr1[0..n)`.
    Perm {
        arr1: Variable,
        arr2: Variable,
        n: Box<IntExpr>,
    },
    Forall(Quantified<Predicate>),
    Exists(Quantified<Predicate>),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assign {
    pub lvalues: Vec<Variable>,
    pub rvalues: Vec<Expr>,
    #[serde(rename = "textRange", default)]
    pub range: TextRange,
}

/// Parallel guard/body arrays shared by `if` and `do`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardedCommands {
    pub guards: Vec<Predicate>,
    pub commands: Vec<Vec<Statement>>,
    #[serde(rename = "textRange", default)]
    pub range: TextRange,
}

impl GuardedCommands {
    pub fn branches(&self) -> impl Iterator<Item = (&Predicate, &[Statement])> {
        self.guards
            .iter()
            .zip(self.commands.iter().map(Vec::as_slice))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Statement {
    Abort {
        #[serde(rename = "textRange", default)]
        range: TextRange,
    },
    Skip {
        #[serde(rename = "textRange", default)]
        range: TextRange,
    },
    Assign(Assign),
    If(GuardedCommands),
    Do(GuardedCommands),
}

impl Statement {
    pub fn range(&self) -> TextRange {
        match self {
            Statement::Abort { range } | Statement::Skip { range } => *range,
            Statement::Assign(a) => a.range,
            Statement::If(g) | Statement::Do(g) => g.range,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl Program {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    /// Text range from the first to the last statement, or `0:0` when empty.
    pub fn range(&self) -> TextRange {
        range_of(&self.statements).unwrap_or_default()
    }

    pub fn count_loops(&self) -> usize {
        count_loops(&self.statements)
    }
}

pub fn range_of(statements: &[Statement]) -> Option<TextRange> {
    let first = statements.first()?;
    let last = statements.last()?;
    Some(TextRange::cover(first.range(), last.range()))
}

/// Number of `do` statements at any depth.
pub fn count_loops(statements: &[Statement]) -> usize {
    statements
        .iter()
        .map(|s| match s {
            Statement::Do(g) => 1 + g.commands.iter().map(|c| count_loops(c)).sum::<usize>(),
            Statement::If(g) => g.commands.iter().map(|c| count_loops(c)).sum(),
            _ => 0,
        })
        .sum()
}

impl Variable {
    pub fn name(name: impl Into<String>) -> Self {
        Variable::Name { name: name.into() }
    }

    pub fn select(base: Variable, selector: IntExpr) -> Self {
        Variable::Select {
            base: Box::new(base),
            selector: Box::new(selector),
        }
    }

    pub fn store(base: Variable, selector: IntExpr, value: Expr) -> Self {
        Variable::Store {
            base: Box::new(base),
            selector: Box::new(selector),
            value: Box::new(value),
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Variable::Name { name } => Some(name),
            _ => None,
        }
    }
}

impl Expr {
    pub fn name(name: impl Into<String>) -> Self {
        Expr::Int(IntExpr::name(name))
    }

    /// Views a map-typed value as a variable, looking through a `Var` wrapper.
    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Expr::Map(v) => Some(v),
            Expr::Int(IntExpr::Var { var }) => Some(var),
            Expr::Int(_) => None,
        }
    }
}

impl From<IntExpr> for Expr {
    fn from(e: IntExpr) -> Self {
        Expr::Int(e)
    }
}

impl From<Variable> for Expr {
    fn from(v: Variable) -> Self {
        Expr::Map(v)
    }
}

impl IntExpr {
    pub fn constant(value: i64) -> Self {
        IntExpr::Const { value }
    }

    pub fn var(var: Variable) -> Self {
        IntExpr::Var { var }
    }

    pub fn name(name: impl Into<String>) -> Self {
        IntExpr::Var {
            var: Variable::name(name),
        }
    }

    pub fn select(base: Variable, selector: IntExpr) -> Self {
        IntExpr::var(Variable::select(base, selector))
    }

    pub fn negate(inner: IntExpr) -> Self {
        IntExpr::Negate {
            inner: Box::new(inner),
        }
    }

    pub fn binary(op: ArithOp, left: IntExpr, right: IntExpr) -> Self {
        IntExpr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn plus(left: IntExpr, right: IntExpr) -> Self {
        Self::binary(ArithOp::Plus, left, right)
    }

    pub fn minus(left: IntExpr, right: IntExpr) -> Self {
        Self::binary(ArithOp::Minus, left, right)
    }

    pub fn mult(left: IntExpr, right: IntExpr) -> Self {
        Self::binary(ArithOp::Mult, left, right)
    }

    /// `Some(name)` when this expression is exactly a bare name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            IntExpr::Var { var } => var.as_name(),
            _ => None,
        }
    }

    pub fn is_name(&self, name: &str) -> bool {
        self.as_name() == Some(name)
    }
}

impl Predicate {
    pub const TRUE: Predicate = Predicate::Const { value: true };
    pub const FALSE: Predicate = Predicate::Const { value: false };

    pub fn not(inner: Predicate) -> Self {
        Predicate::Not {
            inner: Box::new(inner),
        }
    }

    pub fn binary(op: BoolOp, left: Predicate, right: Predicate) -> Self {
        Predicate::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn and(left: Predicate, right: Predicate) -> Self {
        Self::binary(BoolOp::And, left, right)
    }

    pub fn or(left: Predicate, right: Predicate) -> Self {
        Self::binary(BoolOp::Or, left, right)
    }

    pub fn implies(left: Predicate, right: Predicate) -> Self {
        Self::binary(BoolOp::Implies, left, right)
    }

    pub fn iff(left: Predicate, right: Predicate) -> Self {
        Self::binary(BoolOp::Iff, left, right)
    }

    pub fn comp(op: CompOp, left: IntExpr, right: IntExpr) -> Self {
        Predicate::Comp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn eq(left: IntExpr, right: IntExpr) -> Self {
        Self::comp(CompOp::Eq, left, right)
    }

    /// Left-nested disjunction `((p1 || p2) || p3) ...`; `None` for no operands.
    pub fn disjunction<I>(operands: I) -> Option<Predicate>
    where
        I: IntoIterator<Item = Predicate>,
    {
        operands.into_iter().reduce(Predicate::or)
    }

    /// Left-nested conjunction; `None` for no operands.
    pub fn conjunction<I>(operands: I) -> Option<Predicate>
    where
        I: IntoIterator<Item = Predicate>,
    {
        operands.into_iter().reduce(Predicate::and)
    }
}
