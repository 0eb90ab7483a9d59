//! Capture-avoiding substitution of expressions for free names.
//!
//! Substitution is typed: a map can only land where a map is expected and an
//! integer only where an integer is expected. Mismatches surface as
//! [`SubstError`] instead of producing malformed trees.

use std::collections::BTreeSet;

use gcl_ast::{Expr, IntExpr, Names, Predicate, Quantified, Variable};

use crate::error::SubstError;

const FRESH_STEM: &str = "uniqueName";

/// Supplies bound-variable names that cannot collide with any name seen by
/// the substitution that created it.
///
/// The stem is padded with `A`s until it is at least as long as the longest
/// known name; a counter suffix then makes it strictly longer.
#[derive(Clone, Debug)]
pub struct FreshNames {
    stem: String,
    used: usize,
}

impl FreshNames {
    pub fn avoiding<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let longest = names.into_iter().map(str::len).max().unwrap_or(0);
        let mut stem = FRESH_STEM.to_string();
        stem.push_str(&"A".repeat(longest.saturating_sub(FRESH_STEM.len())));
        Self { stem, used: 0 }
    }

    pub fn next_name(&mut self) -> String {
        let name = format!("{}{}", self.stem, self.used);
        self.used += 1;
        name
    }
}

/// An ordered list of `name -> replacement` pairs applied simultaneously.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Substitution {
    pairs: Vec<(String, Expr)>,
}

impl Substitution {
    /// Pairs `names[i]` with `exprs[i]`; every name must be a plain `Name`.
    pub fn new(names: &[Variable], exprs: &[Expr]) -> Result<Self, SubstError> {
        if names.len() != exprs.len() {
            return Err(SubstError::LengthMismatch {
                names: names.len(),
                exprs: exprs.len(),
            });
        }
        let pairs = names
            .iter()
            .zip(exprs)
            .map(|(name, expr)| match name.as_name() {
                Some(n) => Ok((n.to_string(), expr.clone())),
                None => Err(SubstError::NotAName {
                    found: name.to_string(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { pairs })
    }

    pub fn single(name: impl Into<String>, expr: impl Into<Expr>) -> Self {
        Self {
            pairs: vec![(name.into(), expr.into())],
        }
    }

    /// Applies the substitution to `node`.
    pub fn apply<T: Substitutable>(&self, node: &T) -> Result<T::Output, SubstError> {
        let mut known = BTreeSet::new();
        known.extend(node.all_names());
        for (name, expr) in &self.pairs {
            known.insert(name.clone());
            known.extend(expr.all_names());
        }
        let mut fresh = FreshNames::avoiding(known.iter().map(String::as_str));
        node.subst_in(&self.pairs, &mut fresh)
    }
}

/// `node[names := exprs]`.
pub fn substitute<T: Substitutable>(
    node: &T,
    names: &[Variable],
    exprs: &[Expr],
) -> Result<T::Output, SubstError> {
    Substitution::new(names, exprs)?.apply(node)
}

/// Nodes that can have expressions substituted for their free names.
pub trait Substitutable: Names {
    type Output;

    fn subst_in(
        &self,
        pairs: &[(String, Expr)],
        fresh: &mut FreshNames,
    ) -> Result<Self::Output, SubstError>;
}

fn lookup<'p>(pairs: &'p [(String, Expr)], name: &str) -> Option<&'p Expr> {
    pairs.iter().find(|(n, _)| n == name).map(|(_, e)| e)
}

fn subst_binder<B>(
    q: &Quantified<B>,
    pairs: &[(String, Expr)],
    fresh: &mut FreshNames,
) -> Result<Quantified<B>, SubstError>
where
    B: Substitutable<Output = B> + Clone,
{
    // The binder shadows any outer rule for its own name.
    let mut inner: Vec<(String, Expr)> = pairs
        .iter()
        .filter(|(name, _)| *name != q.bound_var)
        .cloned()
        .collect();
    if inner.is_empty() {
        return Ok(q.clone());
    }

    let captures = inner
        .iter()
        .any(|(_, expr)| expr.free_names().contains(&q.bound_var));
    let bound_var = if captures {
        let renamed = fresh.next_name();
        inner.push((q.bound_var.clone(), Expr::name(renamed.clone())));
        renamed
    } else {
        q.bound_var.clone()
    };

    Ok(Quantified {
        bound_var,
        condition: Box::new(q.condition.subst_in(&inner, fresh)?),
        inner: Box::new(q.inner.subst_in(&inner, fresh)?),
    })
}

fn subst_args(
    args: &[Expr],
    pairs: &[(String, Expr)],
    fresh: &mut FreshNames,
) -> Result<Vec<Expr>, SubstError> {
    args.iter().map(|a| a.subst_in(pairs, fresh)).collect()
}

/// Substitutes into a position that must hold a map.
fn subst_map(
    var: &Variable,
    pairs: &[(String, Expr)],
    fresh: &mut FreshNames,
) -> Result<Variable, SubstError> {
    let replaced = var.subst_in(pairs, fresh)?;
    match replaced.as_variable() {
        Some(v) => Ok(v.clone()),
        None => Err(SubstError::ScalarForMap {
            found: replaced.to_string(),
        }),
    }
}

impl Substitutable for Predicate {
    type Output = Predicate;

    fn subst_in(
        &self,
        pairs: &[(String, Expr)],
        fresh: &mut FreshNames,
    ) -> Result<Predicate, SubstError> {
        Ok(match self {
            Predicate::Const { .. } => self.clone(),
            Predicate::Not { inner } => Predicate::not(inner.subst_in(pairs, fresh)?),
            Predicate::Binary { op, left, right } => Predicate::binary(
                *op,
                left.subst_in(pairs, fresh)?,
                right.subst_in(pairs, fresh)?,
            ),
            Predicate::Comp { op, left, right } => Predicate::comp(
                *op,
                left.subst_in(pairs, fresh)?,
                right.subst_in(pairs, fresh)?,
            ),
            Predicate::Call { name, args } => Predicate::Call {
                name: name.clone(),
                args: subst_args(args, pairs, fresh)?,
            },
            Predicate::Perm { arr1, arr2, n } => Predicate::Perm {
                arr1: subst_map(arr1, pairs, fresh)?,
                arr2: subst_map(arr2, pairs, fresh)?,
                n: Box::new(n.subst_in(pairs, fresh)?),
            },
            Predicate::Forall(q) => Predicate::Forall(subst_binder(q, pairs, fresh)?),
            Predicate::Exists(q) => Predicate::Exists(subst_binder(q, pairs, fresh)?),
        })
    }
}

impl Substitutable for IntExpr {
    type Output = IntExpr;

    fn subst_in(
        &self,
        pairs: &[(String, Expr)],
        fresh: &mut FreshNames,
    ) -> Result<IntExpr, SubstError> {
        Ok(match self {
            IntExpr::Const { .. } => self.clone(),
            IntExpr::Var { var } => match var.subst_in(pairs, fresh)? {
                Expr::Int(e) => e,
                Expr::Map(v @ (Variable::Name { .. } | Variable::Select { .. })) => IntExpr::var(v),
                Expr::Map(store @ Variable::Store { .. }) => {
                    return Err(SubstError::MapForScalar {
                        found: store.to_string(),
                    });
                }
            },
            IntExpr::Negate { inner } => IntExpr::negate(inner.subst_in(pairs, fresh)?),
            IntExpr::Binary { op, left, right } => IntExpr::binary(
                *op,
                left.subst_in(pairs, fresh)?,
                right.subst_in(pairs, fresh)?,
            ),
            IntExpr::Call { name, args } => IntExpr::Call {
                name: name.clone(),
                args: subst_args(args, pairs, fresh)?,
            },
            IntExpr::Sum(q) => IntExpr::Sum(subst_binder(q, pairs, fresh)?),
            IntExpr::Prod(q) => IntExpr::Prod(subst_binder(q, pairs, fresh)?),
            IntExpr::Count(q) => IntExpr::Count(subst_binder(q, pairs, fresh)?),
        })
    }
}

impl Substitutable for Variable {
    /// A name may be replaced by an integer or by a map, so the result is an [`Expr`].
    type Output = Expr;

    fn subst_in(
        &self,
        pairs: &[(String, Expr)],
        fresh: &mut FreshNames,
    ) -> Result<Expr, SubstError> {
        match self {
            Variable::Name { name } => Ok(match lookup(pairs, name) {
                Some(expr) => expr.clone(),
                None => Expr::Map(self.clone()),
            }),
            Variable::Select { base, selector } => Ok(Expr::Map(Variable::select(
                subst_map(base, pairs, fresh)?,
                selector.subst_in(pairs, fresh)?,
            ))),
            Variable::Store {
                base,
                selector,
                value,
            } => Ok(Expr::Map(Variable::store(
                subst_map(base, pairs, fresh)?,
                selector.subst_in(pairs, fresh)?,
                value.subst_in(pairs, fresh)?,
            ))),
        }
    }
}

impl Substitutable for Expr {
    type Output = Expr;

    /// Argument and store-value positions accept either kind, so a bare name
    /// may turn into a map here without error.
    fn subst_in(
        &self,
        pairs: &[(String, Expr)],
        fresh: &mut FreshNames,
    ) -> Result<Expr, SubstError> {
        match self {
            Expr::Map(v) => v.subst_in(pairs, fresh),
            Expr::Int(IntExpr::Var { var: var @ Variable::Name { .. } }) => {
                Ok(match var.subst_in(pairs, fresh)? {
                    Expr::Map(v @ (Variable::Name { .. } | Variable::Select { .. })) => {
                        Expr::Int(IntExpr::var(v))
                    }
                    other => other,
                })
            }
            Expr::Int(e) => Ok(Expr::Int(e.subst_in(pairs, fresh)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcl_ast::CompOp;

    fn forall_k(cond: Predicate, inner: Predicate) -> Predicate {
        Predicate::Forall(Quantified::new("k", cond, inner))
    }

    fn k_in_range() -> Predicate {
        Predicate::and(
            Predicate::comp(CompOp::Le, IntExpr::constant(0), IntExpr::name("k")),
            Predicate::comp(CompOp::Lt, IntExpr::name("k"), IntExpr::name("n")),
        )
    }

    #[test]
    fn fresh_names_are_longer_than_every_known_name() {
        let mut fresh = FreshNames::avoiding(["x", "aVeryLongVariableName"]);
        let name = fresh.next_name();
        assert!(name.starts_with("uniqueNameAAAAAAAAAAA"));
        assert!(name.len() > "aVeryLongVariableName".len());
        assert_ne!(name, fresh.next_name());
    }

    #[test]
    fn replaces_free_names_simultaneously() {
        let p = Predicate::eq(IntExpr::name("x"), IntExpr::name("y"));
        let out = substitute(
            &p,
            &[Variable::name("x"), Variable::name("y")],
            &[Expr::name("y"), Expr::name("x")],
        )
        .expect("substitute");
        assert_eq!(out, Predicate::eq(IntExpr::name("y"), IntExpr::name("x")));
    }

    #[test]
    fn bound_variable_is_not_substituted() {
        let p = forall_k(k_in_range(), Predicate::eq(IntExpr::name("k"), IntExpr::name("x")));
        let out = substitute(&p, &[Variable::name("k")], &[IntExpr::constant(5).into()])
            .expect("substitute");
        assert_eq!(out, p);
    }

    #[test]
    fn renames_the_bound_variable_when_it_would_capture() {
        let p = forall_k(k_in_range(), Predicate::eq(IntExpr::name("k"), IntExpr::name("x")));
        let out = substitute(
            &p,
            &[Variable::name("x")],
            &[IntExpr::plus(IntExpr::name("k"), IntExpr::constant(1)).into()],
        )
        .expect("substitute");

        let Predicate::Forall(q) = &out else {
            panic!("expected a quantifier, got {out}");
        };
        assert_ne!(q.bound_var, "k");
        assert!(out.free_names().contains("k"), "substituted k must stay free: {out}");
        assert!(!out.free_names().contains(&q.bound_var));
    }

    #[test]
    fn select_base_accepts_maps_and_rejects_scalars() {
        let read = IntExpr::select(Variable::name("a"), IntExpr::name("i"));
        let store = Variable::store(Variable::name("a"), IntExpr::name("i"), IntExpr::constant(0).into());
        let out = substitute(&read, &[Variable::name("a")], &[Expr::Map(store.clone())])
            .expect("map for map");
        assert_eq!(out, IntExpr::select(store, IntExpr::name("i")));

        let err = substitute(&read, &[Variable::name("a")], &[IntExpr::constant(3).into()])
            .expect_err("scalar for map");
        assert!(matches!(err, SubstError::ScalarForMap { .. }));
    }

    #[test]
    fn map_cannot_replace_an_integer_variable() {
        let x = IntExpr::name("a");
        let store = Variable::store(Variable::name("a"), IntExpr::name("i"), IntExpr::constant(0).into());
        let err = substitute(&x, &[Variable::name("a")], &[Expr::Map(store)]).expect_err("map");
        assert!(matches!(err, SubstError::MapForScalar { .. }));
    }

    #[test]
    fn call_arguments_may_become_maps() {
        let call = Predicate::Call {
            name: "sorted".to_string(),
            args: vec![Expr::name("a"), Expr::name("n")],
        };
        let store = Variable::store(Variable::name("b"), IntExpr::name("i"), IntExpr::constant(0).into());
        let out = substitute(&call, &[Variable::name("a")], &[Expr::Map(store.clone())])
            .expect("substitute");
        assert_eq!(
            out,
            Predicate::Call {
                name: "sorted".to_string(),
                args: vec![Expr::Map(store), Expr::name("n")],
            }
        );
    }

    #[test]
    fn rejects_non_name_targets() {
        let err = Substitution::new(
            &[Variable::select(Variable::name("a"), IntExpr::constant(0))],
            &[IntExpr::constant(1).into()],
        )
        .expect_err("select target");
        assert!(matches!(err, SubstError::NotAName { .. }));
    }
}
