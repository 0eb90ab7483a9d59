use std::collections::BTreeSet;

use crate::{Expr, IntExpr, Predicate, Quantified, Variable};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NameOptions {
    /// Keep names bound by quantifiers and aggregates.
    pub include_bound_vars: bool,
    /// Report the names of shorthand calls as well as their arguments.
    pub include_shorthand_names: bool,
}

/// Name collection over every node category.
pub trait Names {
    fn collect_names(&self, opts: NameOptions, out: &mut BTreeSet<String>);

    /// Names occurring free in the node.
    fn free_names(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_names(NameOptions::default(), &mut out);
        out
    }

    /// Every name in the node, bound variables included.
    fn all_names(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        let opts = NameOptions {
            include_bound_vars: true,
            include_shorthand_names: false,
        };
        self.collect_names(opts, &mut out);
        out
    }
}

fn collect_binder<B: Names>(q: &Quantified<B>, opts: NameOptions, out: &mut BTreeSet<String>) {
    let mut local = BTreeSet::new();
    q.condition.collect_names(opts, &mut local);
    q.inner.collect_names(opts, &mut local);
    if opts.include_bound_vars {
        local.insert(q.bound_var.clone());
    } else {
        local.remove(&q.bound_var);
    }
    out.extend(local);
}

fn collect_call(name: &str, args: &[Expr], opts: NameOptions, out: &mut BTreeSet<String>) {
    for arg in args {
        arg.collect_names(opts, out);
    }
    if opts.include_shorthand_names {
        out.insert(name.to_string());
    }
}

impl Names for Predicate {
    fn collect_names(&self, opts: NameOptions, out: &mut BTreeSet<String>) {
        match self {
            Predicate::Const { .. } => {}
            Predicate::Not { inner } => inner.collect_names(opts, out),
            Predicate::Binary { left, right, .. } => {
                left.collect_names(opts, out);
                right.collect_names(opts, out);
            }
            Predicate::Comp { left, right, .. } => {
                left.collect_names(opts, out);
                right.collect_names(opts, out);
            }
            Predicate::Call { name, args } => collect_call(name, args, opts, out),
            Predicate::Perm { arr1, arr2, n } => {
                arr1.collect_names(opts, out);
                arr2.collect_names(opts, out);
                n.collect_names(opts, out);
            }
            Predicate::Forall(q) | Predicate::Exists(q) => collect_binder(q, opts, out),
        }
    }
}

impl Names for IntExpr {
    fn collect_names(&self, opts: NameOptions, out: &mut BTreeSet<String>) {
        match self {
            IntExpr::Const { .. } => {}
            IntExpr::Var { var } => var.collect_names(opts, out),
            IntExpr::Negate { inner } => inner.collect_names(opts, out),
            IntExpr::Binary { left, right, .. } => {
                left.collect_names(opts, out);
                right.collect_names(opts, out);
            }
            IntExpr::Call { name, args } => collect_call(name, args, opts, out),
            IntExpr::Sum(q) | IntExpr::Prod(q) => collect_binder(q, opts, out),
            IntExpr::Count(q) => collect_binder(q, opts, out),
        }
    }
}

impl Names for Variable {
    fn collect_names(&self, opts: NameOptions, out: &mut BTreeSet<String>) {
        match self {
            Variable::Name { name } => {
                out.insert(name.clone());
            }
            Variable::Select { base, selector } => {
                base.collect_names(opts, out);
                selector.collect_names(opts, out);
            }
            Variable::Store {
                base,
                selector,
                value,
            } => {
                base.collect_names(opts, out);
                selector.collect_names(opts, out);
                value.collect_names(opts, out);
            }
        }
    }
}

impl Names for Expr {
    fn collect_names(&self, opts: NameOptions, out: &mut BTreeSet<String>) {
        match self {
            Expr::Map(v) => v.collect_names(opts, out),
            Expr::Int(e) => e.collect_names(opts, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CompOp;

    fn forall_k_a_k_gt_x() -> Predicate {
        Predicate::Forall(Quantified::new(
            "k",
            Predicate::comp(CompOp::Le, IntExpr::constant(0), IntExpr::name("k")),
            Predicate::comp(
                CompOp::Gt,
                IntExpr::select(Variable::name("a"), IntExpr::name("k")),
                IntExpr::name("x"),
            ),
        ))
    }

    #[test]
    fn free_names_drop_the_bound_variable() {
        let names = forall_k_a_k_gt_x().free_names();
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["a", "x"]);
    }

    #[test]
    fn all_names_keep_the_bound_variable() {
        let names = forall_k_a_k_gt_x().all_names();
        assert!(names.contains("k"));
        assert!(names.contains("a"));
    }

    #[test]
    fn bound_name_free_elsewhere_is_still_reported() {
        let pred = Predicate::and(forall_k_a_k_gt_x(), Predicate::eq(IntExpr::name("k"), IntExpr::constant(2)));
        assert!(pred.free_names().contains("k"));
    }

    #[test]
    fn shorthand_names_are_opt_in() {
        let call = Predicate::Call {
            name: "sorted".to_string(),
            args: vec![Expr::name("a"), Expr::name("n")],
        };
        assert!(!call.free_names().contains("sorted"));
        let mut out = BTreeSet::new();
        call.collect_names(
            NameOptions {
                include_bound_vars: false,
                include_shorthand_names: true,
            },
            &mut out,
        );
        assert!(out.contains("sorted"));
    }
}
