use gcl_ast::{CompOp, IntExpr, Predicate, Quantified, Variable};
use gcl_verify::{Axiom, AxiomRegistry, AxiomTrigger, LowerError, Lowering};

/// Claims every aggregate, whatever its shape.
struct AnySum;

impl AxiomTrigger for AnySum {
    fn name(&self) -> &str {
        "ANY_SUM"
    }

    fn on_int_expr(&self, expr: &IntExpr, _cx: &Lowering<'_>) -> Option<Result<String, LowerError>> {
        matches!(expr, IntExpr::Sum(_)).then(|| Ok("(anysum)".to_string()))
    }
}

fn sum_of_a() -> IntExpr {
    let k = || IntExpr::name("k");
    IntExpr::Sum(Quantified::new(
        "k",
        Predicate::and(
            Predicate::comp(CompOp::Le, IntExpr::constant(0), k()),
            Predicate::comp(CompOp::Lt, k(), IntExpr::name("n")),
        ),
        IntExpr::select(Variable::name("a"), k()),
    ))
}

fn registry() -> AxiomRegistry {
    let mut registry = AxiomRegistry::builtin();
    registry.register(Axiom::new("ANY_SUM", "(BG_PUSH TRUE)").with_trigger(AnySum));
    registry
}

#[test]
fn builtin_sum_lowers_to_its_function() {
    let registry = registry();
    let enabled = registry.enable(&["ARRAY_SUM"]).expect("enable");
    let s = Predicate::eq(IntExpr::name("s"), sum_of_a());
    assert_eq!(
        enabled.lowering().predicate(&s).expect("lower"),
        "(EQ s (sum 0 (- n 1) a))"
    );
}

#[test]
fn two_triggers_on_one_node_are_rejected() {
    let registry = registry();
    let enabled = registry.enable(&["ARRAY_SUM", "ANY_SUM"]).expect("enable");
    let err = enabled
        .lowering()
        .int_expr(&sum_of_a())
        .expect_err("ambiguous");
    match err {
        LowerError::AmbiguousTrigger { axioms, .. } => {
            assert!(axioms.contains("ARRAY_SUM") && axioms.contains("ANY_SUM"), "{axioms}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn custom_trigger_alone_claims_the_node() {
    let registry = registry();
    let enabled = registry.enable(&["ANY_SUM"]).expect("enable");
    assert_eq!(enabled.lowering().int_expr(&sum_of_a()).expect("lower"), "(anysum)");
    assert_eq!(enabled.definitions().collect::<Vec<_>>(), vec!["(BG_PUSH TRUE)"]);
}

#[test]
fn aggregate_without_axiom_is_an_error() {
    let registry = registry();
    let enabled = registry.enable::<&str>(&[]).expect("enable");
    assert!(matches!(
        enabled.lowering().int_expr(&sum_of_a()),
        Err(LowerError::NoAxiomFor { .. })
    ));
}

#[test]
fn unknown_axiom_names_are_rejected() {
    let err = registry().enable(&["NO_SUCH_AXIOM"]).expect_err("unknown");
    assert_eq!(err, LowerError::UnknownAxiom("NO_SUCH_AXIOM".to_string()));
}
