use std::collections::BTreeSet;

use gcl_ast::{ArithOp, BoolOp, CompOp, Expr, IntExpr, Names, Predicate, Quantified, Variable};
use gcl_verify::Substitution;
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config, TestCaseError, TestRunner};

// `x` is the substituted name and only ever occurs in scalar positions;
// `k` and `y` double as bound variables.
const SCALARS: &[&str] = &["x", "y", "k", "n"];
const MAPS: &[&str] = &["a", "b"];
const BINDERS: &[&str] = &["k", "y"];
const FUNCTIONS: &[&str] = &["f", "g"];

/// Strategies for every node kind, built bottom-up to a fixed depth.
#[derive(Clone)]
struct Trees {
    int: BoxedStrategy<IntExpr>,
    pred: BoxedStrategy<Predicate>,
    map: BoxedStrategy<Variable>,
}

fn scalar() -> BoxedStrategy<IntExpr> {
    prop_oneof![
        (-3i64..4).prop_map(IntExpr::constant),
        prop::sample::select(SCALARS).prop_map(IntExpr::name),
    ]
    .boxed()
}

fn map_name() -> BoxedStrategy<Variable> {
    prop::sample::select(MAPS).prop_map(Variable::name).boxed()
}

fn binder() -> impl Strategy<Value = &'static str> {
    prop::sample::select(BINDERS)
}

fn function() -> impl Strategy<Value = String> {
    prop::sample::select(FUNCTIONS).prop_map(str::to_string)
}

impl Trees {
    fn leaves() -> Self {
        Trees {
            int: scalar(),
            pred: prop_oneof![Just(Predicate::TRUE), Just(Predicate::FALSE)].boxed(),
            map: map_name(),
        }
    }

    fn deeper(&self) -> Self {
        let Trees { int, pred, map } = self.clone();
        let args = prop::collection::vec(
            prop_oneof![int.clone().prop_map(Expr::Int), map.clone().prop_map(Expr::Map)],
            0..3,
        )
        .boxed();

        let next_int = prop_oneof![
            scalar(),
            (map.clone(), int.clone()).prop_map(|(m, i)| IntExpr::select(m, i)),
            int.clone().prop_map(IntExpr::negate),
            (
                prop::sample::select(vec![ArithOp::Plus, ArithOp::Minus, ArithOp::Mult]),
                int.clone(),
                int.clone(),
            )
                .prop_map(|(op, l, r)| IntExpr::binary(op, l, r)),
            (function(), args.clone()).prop_map(|(name, args)| IntExpr::Call { name, args }),
            (binder(), pred.clone(), int.clone())
                .prop_map(|(k, c, i)| IntExpr::Sum(Quantified::new(k, c, i))),
            (binder(), pred.clone(), int.clone())
                .prop_map(|(k, c, i)| IntExpr::Prod(Quantified::new(k, c, i))),
            (binder(), pred.clone(), pred.clone())
                .prop_map(|(k, c, i)| IntExpr::Count(Quantified::new(k, c, i))),
        ]
        .boxed();

        let next_pred = prop_oneof![
            (
                prop::sample::select(vec![CompOp::Lt, CompOp::Eq, CompOp::Ge]),
                int.clone(),
                int.clone(),
            )
                .prop_map(|(op, l, r)| Predicate::comp(op, l, r)),
            pred.clone().prop_map(Predicate::not),
            (
                prop::sample::select(vec![BoolOp::And, BoolOp::Or, BoolOp::Implies, BoolOp::Iff]),
                pred.clone(),
                pred.clone(),
            )
                .prop_map(|(op, l, r)| Predicate::binary(op, l, r)),
            (function(), args).prop_map(|(name, args)| Predicate::Call { name, args }),
            (map.clone(), map.clone(), int.clone()).prop_map(|(arr1, arr2, n)| Predicate::Perm {
                arr1,
                arr2,
                n: Box::new(n),
            }),
            (binder(), pred.clone(), pred.clone())
                .prop_map(|(k, c, i)| Predicate::Forall(Quantified::new(k, c, i))),
            (binder(), pred.clone(), pred.clone())
                .prop_map(|(k, c, i)| Predicate::Exists(Quantified::new(k, c, i))),
        ]
        .boxed();

        let next_map = prop_oneof![
            map_name(),
            (map, int.clone(), int).prop_map(|(m, i, v)| Variable::store(m, i, v.into())),
        ]
        .boxed();

        Trees {
            int: next_int,
            pred: next_pred,
            map: next_map,
        }
    }
}

fn trees() -> Trees {
    (0..3).fold(Trees::leaves(), |t, _| t.deeper())
}

fn predicate() -> BoxedStrategy<Predicate> {
    trees().pred
}

fn int_expr() -> BoxedStrategy<IntExpr> {
    trees().int
}

fn runner() -> TestRunner {
    TestRunner::new(Config {
        cases: 128,
        ..Config::default()
    })
}

#[test]
fn empty_substitution_changes_nothing() {
    runner()
        .run(&predicate(), |p| {
            let out = Substitution::new(&[], &[])
                .and_then(|s| s.apply(&p))
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(out, p);
            Ok(())
        })
        .expect("empty substitution");
}

#[test]
fn empty_substitution_changes_no_integer_expression() {
    runner()
        .run(&int_expr(), |e| {
            let out = Substitution::new(&[], &[])
                .and_then(|s| s.apply(&e))
                .map_err(|err| TestCaseError::fail(err.to_string()))?;
            prop_assert_eq!(out, e);
            Ok(())
        })
        .expect("empty substitution over integers");
}

#[test]
fn bound_variable_is_not_substitutable() {
    let trees = trees();
    runner()
        .run(&(trees.pred.clone(), trees.pred), |(c, i)| {
            let q = Predicate::Forall(Quantified::new("k", c, i));
            let out = Substitution::single("k", IntExpr::plus(IntExpr::name("x"), IntExpr::constant(1)))
                .apply(&q)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(out, q);
            Ok(())
        })
        .expect("shadowed substitution");
}

#[test]
fn substituting_a_name_for_itself_changes_nothing() {
    runner()
        .run(&predicate(), |p| {
            let out = Substitution::single("x", IntExpr::name("x"))
                .apply(&p)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(out, p);
            Ok(())
        })
        .expect("identity substitution");
}

#[test]
fn substituting_a_name_for_itself_changes_no_integer_expression() {
    runner()
        .run(&int_expr(), |e| {
            let out = Substitution::single("x", IntExpr::name("x"))
                .apply(&e)
                .map_err(|err| TestCaseError::fail(err.to_string()))?;
            prop_assert_eq!(out, e);
            Ok(())
        })
        .expect("identity substitution over integers");
}

fn expected_free_names(before: BTreeSet<String>) -> BTreeSet<String> {
    let mut expected = before;
    if expected.remove("x") {
        expected.extend(["k".to_string(), "y".to_string()]);
    }
    expected
}

#[test]
fn substituted_names_are_never_captured() {
    // x := k + y, where k and y are also used as bound variables.
    let replacement = IntExpr::plus(IntExpr::name("k"), IntExpr::name("y"));
    runner()
        .run(&predicate(), |p| {
            let out = Substitution::single("x", replacement.clone())
                .apply(&p)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            let got: BTreeSet<String> = out.free_names();
            prop_assert_eq!(got, expected_free_names(p.free_names()), "{} became {}", p, out);
            Ok(())
        })
        .expect("capture-free substitution");
}

#[test]
fn substituted_names_are_never_captured_by_aggregates() {
    let replacement = IntExpr::plus(IntExpr::name("k"), IntExpr::name("y"));
    runner()
        .run(&int_expr(), |e| {
            let out = Substitution::single("x", replacement.clone())
                .apply(&e)
                .map_err(|err| TestCaseError::fail(err.to_string()))?;
            let got: BTreeSet<String> = out.free_names();
            prop_assert_eq!(got, expected_free_names(e.free_names()), "{} became {}", e, out);
            Ok(())
        })
        .expect("capture-free substitution over integers");
}
