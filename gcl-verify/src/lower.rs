//! Lowering of predicates to Simplify's prefix syntax.
//!
//! Every node is first offered to the enabled [`AxiomTrigger`]s; a node no
//! trigger claims is lowered structurally. Aggregates (`SUM`, `PROD`, `N`),
//! `perm` and array-membership `E` quantifiers have no structural lowering
//! the prover can reason about, so they must be claimed by a trigger.

use gcl_ast::{ArithOp, BoolOp, CompOp, Expr, IntExpr, Names, Predicate, Quantified, Variable};
use tracing::warn;

use crate::axioms::array_indexed_by;
use crate::error::LowerError;

/// Recognizes one quantified idiom and rewrites it into a prover function
/// term backed by an axiom definition.
///
/// Each hook returns `None` when the node is not claimed. Sub-terms of a
/// claimed node are lowered through `cx`, so they still see every trigger.
pub trait AxiomTrigger: Send + Sync {
    fn name(&self) -> &str;

    fn on_predicate(
        &self,
        _predicate: &Predicate,
        _cx: &Lowering<'_>,
    ) -> Option<Result<String, LowerError>> {
        None
    }

    fn on_int_expr(&self, _expr: &IntExpr, _cx: &Lowering<'_>) -> Option<Result<String, LowerError>> {
        None
    }

    fn on_variable(
        &self,
        _variable: &Variable,
        _cx: &Lowering<'_>,
    ) -> Option<Result<String, LowerError>> {
        None
    }
}

/// Lowering context: the triggers enabled for one verification request.
#[derive(Clone, Default)]
pub struct Lowering<'a> {
    triggers: Vec<&'a dyn AxiomTrigger>,
}

impl<'a> Lowering<'a> {
    pub fn new(triggers: Vec<&'a dyn AxiomTrigger>) -> Self {
        Self { triggers }
    }

    fn claim<F>(&self, node_kind: &'static str, ask: F) -> Result<Option<String>, LowerError>
    where
        F: Fn(&dyn AxiomTrigger) -> Option<Result<String, LowerError>>,
    {
        let mut claims = Vec::new();
        for trigger in &self.triggers {
            if let Some(result) = ask(*trigger) {
                claims.push((trigger.name(), result));
            }
        }
        if claims.len() > 1 {
            let axioms = claims
                .iter()
                .map(|(name, _)| *name)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(LowerError::AmbiguousTrigger { node_kind, axioms });
        }
        claims.pop().map(|(_, result)| result).transpose()
    }

    pub fn predicate(&self, predicate: &Predicate) -> Result<String, LowerError> {
        if let Some(term) = self.claim("predicate", |t| t.on_predicate(predicate, self))? {
            return Ok(term);
        }

        Ok(match predicate {
            Predicate::Const { value: true } => "TRUE".to_string(),
            Predicate::Const { value: false } => "FALSE".to_string(),
            Predicate::Not { inner } => format!("(NOT {})", self.predicate(inner)?),
            Predicate::Binary { op, left, right } => format!(
                "({} {} {})",
                bool_op(*op),
                self.predicate(left)?,
                self.predicate(right)?
            ),
            Predicate::Comp { op, left, right } => format!(
                "({} {} {})",
                comp_op(*op),
                self.int_expr(left)?,
                self.int_expr(right)?
            ),
            Predicate::Call { name, args } => self.call(name, args)?,
            Predicate::Perm { .. } => {
                return Err(LowerError::NoAxiomFor {
                    quantifier: predicate.to_string(),
                });
            }
            Predicate::Forall(q) => {
                let condition = self.predicate(&q.condition)?;
                let inner = self.predicate(&q.inner)?;
                match find_select_pred(&q.inner, &q.bound_var) {
                    Some(hint) => format!(
                        "(FORALL ({}) (PATS {}) (IMPLIES {condition} {inner}))",
                        q.bound_var,
                        self.variable(hint)?
                    ),
                    None => {
                        warn!(quantifier = %predicate, "no instantiation pattern for quantifier");
                        format!("(FORALL ({}) (IMPLIES {condition} {inner}))", q.bound_var)
                    }
                }
            }
            Predicate::Exists(q) => {
                if is_membership(q) {
                    return Err(LowerError::NoAxiomFor {
                        quantifier: predicate.to_string(),
                    });
                }
                format!(
                    "(EXISTS ({}) (AND {} {}))",
                    q.bound_var,
                    self.predicate(&q.condition)?,
                    self.predicate(&q.inner)?
                )
            }
        })
    }

    pub fn int_expr(&self, expr: &IntExpr) -> Result<String, LowerError> {
        if let Some(term) = self.claim("integer expression", |t| t.on_int_expr(expr, self))? {
            return Ok(term);
        }

        Ok(match expr {
            IntExpr::Const { value } if *value < 0 => format!("(- 0 {})", value.unsigned_abs()),
            IntExpr::Const { value } => value.to_string(),
            IntExpr::Var { var } => self.variable(var)?,
            IntExpr::Negate { inner } => format!("(- 0 {})", self.int_expr(inner)?),
            IntExpr::Binary { op, left, right } => format!(
                "({} {} {})",
                arith_op(*op),
                self.int_expr(left)?,
                self.int_expr(right)?
            ),
            IntExpr::Call { name, args } => self.call(name, args)?,
            IntExpr::Sum(_) | IntExpr::Prod(_) | IntExpr::Count(_) => {
                return Err(LowerError::NoAxiomFor {
                    quantifier: expr.to_string(),
                });
            }
        })
    }

    pub fn variable(&self, variable: &Variable) -> Result<String, LowerError> {
        if let Some(term) = self.claim("variable", |t| t.on_variable(variable, self))? {
            return Ok(term);
        }

        Ok(match variable {
            Variable::Name { name } => name.clone(),
            Variable::Select { base, selector } => {
                format!("(select {} {})", self.variable(base)?, self.int_expr(selector)?)
            }
            Variable::Store {
                base,
                selector,
                value,
            } => format!(
                "(store {} {} {})",
                self.variable(base)?,
                self.int_expr(selector)?,
                self.expr(value)?
            ),
        })
    }

    pub fn expr(&self, expr: &Expr) -> Result<String, LowerError> {
        match expr {
            Expr::Map(v) => self.variable(v),
            Expr::Int(e) => self.int_expr(e),
        }
    }

    fn call(&self, name: &str, args: &[Expr]) -> Result<String, LowerError> {
        let mut out = format!("({name}");
        for arg in args {
            out.push(' ');
            out.push_str(&self.expr(arg)?);
        }
        out.push(')');
        Ok(out)
    }
}

fn bool_op(op: BoolOp) -> &'static str {
    match op {
        BoolOp::And => "AND",
        BoolOp::Or => "OR",
        BoolOp::Implies => "IMPLIES",
        BoolOp::Iff => "IFF",
    }
}

fn comp_op(op: CompOp) -> &'static str {
    match op {
        CompOp::Lt => "<",
        CompOp::Gt => ">",
        CompOp::Le => "<=",
        CompOp::Ge => ">=",
        CompOp::Eq => "EQ",
        CompOp::Ne => "NEQ",
    }
}

fn arith_op(op: ArithOp) -> &'static str {
    match op {
        ArithOp::Plus => "+",
        ArithOp::Minus => "-",
        ArithOp::Mult => "*",
    }
}

/// `(E k : ... : a[k] = m)` with `m` free of `k`: the prover's array theory
/// cannot discharge these without the containment axiom.
fn is_membership(q: &Quantified<Predicate>) -> bool {
    let Predicate::Comp {
        op: CompOp::Eq,
        left,
        right,
    } = &*q.inner
    else {
        return false;
    };
    let k = q.bound_var.as_str();
    let value = if array_indexed_by(left, k).is_some() {
        right
    } else if array_indexed_by(right, k).is_some() {
        left
    } else {
        return false;
    };
    !value.free_names().contains(k)
}

// Instantiation hints: the first `Select` whose selector is exactly `k`.
// Binders that rebind `k` hide it.

fn find_select_pred<'p>(predicate: &'p Predicate, k: &str) -> Option<&'p Variable> {
    match predicate {
        Predicate::Const { .. } => None,
        Predicate::Not { inner } => find_select_pred(inner, k),
        Predicate::Binary { left, right, .. } => {
            find_select_pred(left, k).or_else(|| find_select_pred(right, k))
        }
        Predicate::Comp { left, right, .. } => {
            find_select_int(left, k).or_else(|| find_select_int(right, k))
        }
        Predicate::Call { args, .. } => args.iter().find_map(|a| find_select_expr(a, k)),
        Predicate::Perm { arr1, arr2, n } => find_select_var(arr1, k)
            .or_else(|| find_select_var(arr2, k))
            .or_else(|| find_select_int(n, k)),
        Predicate::Forall(q) | Predicate::Exists(q) => find_select_binder(q, k, find_select_pred),
    }
}

fn find_select_int<'p>(expr: &'p IntExpr, k: &str) -> Option<&'p Variable> {
    match expr {
        IntExpr::Const { .. } => None,
        IntExpr::Var { var } => find_select_var(var, k),
        IntExpr::Negate { inner } => find_select_int(inner, k),
        IntExpr::Binary { left, right, .. } => {
            find_select_int(left, k).or_else(|| find_select_int(right, k))
        }
        IntExpr::Call { args, .. } => args.iter().find_map(|a| find_select_expr(a, k)),
        IntExpr::Sum(q) | IntExpr::Prod(q) => find_select_binder(q, k, find_select_int),
        IntExpr::Count(q) => find_select_binder(q, k, find_select_pred),
    }
}

fn find_select_binder<'p, B>(
    q: &'p Quantified<B>,
    k: &str,
    inner: fn(&'p B, &str) -> Option<&'p Variable>,
) -> Option<&'p Variable> {
    if q.bound_var == k {
        return None;
    }
    find_select_pred(&q.condition, k).or_else(|| inner(&q.inner, k))
}

fn find_select_var<'p>(variable: &'p Variable, k: &str) -> Option<&'p Variable> {
    match variable {
        Variable::Name { .. } => None,
        Variable::Select { base, selector } => {
            if selector.is_name(k) {
                Some(variable)
            } else {
                find_select_var(base, k).or_else(|| find_select_int(selector, k))
            }
        }
        Variable::Store {
            base,
            selector,
            value,
        } => find_select_var(base, k)
            .or_else(|| find_select_int(selector, k))
            .or_else(|| find_select_expr(value, k)),
    }
}

fn find_select_expr<'p>(expr: &'p Expr, k: &str) -> Option<&'p Variable> {
    match expr {
        Expr::Map(v) => find_select_var(v, k),
        Expr::Int(e) => find_select_int(e, k),
    }
}
