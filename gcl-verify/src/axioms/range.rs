//! Shape matchers shared by the built-in triggers.

use gcl_ast::{CompOp, IntExpr, Predicate, Variable};

/// Inclusive bounds `lo <= k <= hi` of a bound variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub lo: IntExpr,
    pub hi: IntExpr,
}

struct Half {
    lo: Option<IntExpr>,
    hi: Option<IntExpr>,
}

/// Reads `condition` as a two-sided range over `k`.
///
/// The condition must be a conjunction of two comparisons, each with `k`
/// on exactly one side. Strict comparisons are turned into inclusive ones
/// by adding or subtracting one, so `0 <= k < n` yields `lo = 0, hi = n - 1`.
pub fn parse_range(condition: &Predicate, k: &str) -> Option<Bounds> {
    let Predicate::Binary {
        op: gcl_ast::BoolOp::And,
        left,
        right,
    } = condition
    else {
        return None;
    };
    let left = half_range(left, k)?;
    let right = half_range(right, k)?;
    Some(Bounds {
        lo: left.lo.or(right.lo)?,
        hi: left.hi.or(right.hi)?,
    })
}

fn half_range(comparison: &Predicate, k: &str) -> Option<Half> {
    let Predicate::Comp { op, left, right } = comparison else {
        return None;
    };
    let (k_on_left, other) = match (left.is_name(k), right.is_name(k)) {
        (true, false) => (true, (**right).clone()),
        (false, true) => (false, (**left).clone()),
        _ => return None,
    };
    let plus_one = || IntExpr::plus(other.clone(), IntExpr::constant(1));
    let minus_one = || IntExpr::minus(other.clone(), IntExpr::constant(1));

    let half = match (op, k_on_left) {
        // k < e
        (CompOp::Lt, true) => Half { lo: None, hi: Some(minus_one()) },
        // e < k
        (CompOp::Lt, false) => Half { lo: Some(plus_one()), hi: None },
        (CompOp::Le, true) => Half { lo: None, hi: Some(other) },
        (CompOp::Le, false) => Half { lo: Some(other), hi: None },
        (CompOp::Gt, true) => Half { lo: Some(plus_one()), hi: None },
        (CompOp::Gt, false) => Half { lo: None, hi: Some(minus_one()) },
        (CompOp::Ge, true) => Half { lo: Some(other), hi: None },
        (CompOp::Ge, false) => Half { lo: None, hi: Some(other) },
        (CompOp::Eq | CompOp::Ne, _) => return None,
    };
    Some(half)
}

/// `a[k]` with a bare `k`: returns `a`.
pub fn array_indexed_by<'e>(expr: &'e IntExpr, k: &str) -> Option<&'e Variable> {
    match expr {
        IntExpr::Var {
            var: Variable::Select { base, selector },
        } if selector.is_name(k) => Some(&**base),
        _ => None,
    }
}

/// `x[j]` where `x` is not itself a selection: returns `(x, j)`.
pub fn single_select(expr: &IntExpr) -> Option<(&Variable, &IntExpr)> {
    match expr {
        IntExpr::Var {
            var: Variable::Select { base, selector },
        } if !matches!(&**base, Variable::Select { .. }) => Some((&**base, &**selector)),
        _ => None,
    }
}

/// `m[row][col]`: returns `(m, row, col)`.
pub fn double_select(expr: &IntExpr) -> Option<(&Variable, &IntExpr, &IntExpr)> {
    let IntExpr::Var {
        var: Variable::Select { base, selector: col },
    } = expr
    else {
        return None;
    };
    let Variable::Select { base: m, selector: row } = &**base else {
        return None;
    };
    Some((&**m, &**row, &**col))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k() -> IntExpr {
        IntExpr::name("k")
    }

    fn cmp(op: CompOp, l: IntExpr, r: IntExpr) -> Predicate {
        Predicate::comp(op, l, r)
    }

    #[test]
    fn inclusive_range() {
        let c = Predicate::and(
            cmp(CompOp::Le, IntExpr::constant(0), k()),
            cmp(CompOp::Le, k(), IntExpr::name("n")),
        );
        assert_eq!(
            parse_range(&c, "k"),
            Some(Bounds {
                lo: IntExpr::constant(0),
                hi: IntExpr::name("n")
            })
        );
    }

    #[test]
    fn strict_comparisons_are_corrected_by_one() {
        // k < n && k > i, written in the other order on purpose
        let c = Predicate::and(
            cmp(CompOp::Lt, k(), IntExpr::name("n")),
            cmp(CompOp::Gt, k(), IntExpr::name("i")),
        );
        assert_eq!(
            parse_range(&c, "k"),
            Some(Bounds {
                lo: IntExpr::plus(IntExpr::name("i"), IntExpr::constant(1)),
                hi: IntExpr::minus(IntExpr::name("n"), IntExpr::constant(1)),
            })
        );

        let c = Predicate::and(
            cmp(CompOp::Gt, IntExpr::name("n"), k()),
            cmp(CompOp::Ge, k(), IntExpr::constant(1)),
        );
        assert_eq!(
            parse_range(&c, "k"),
            Some(Bounds {
                lo: IntExpr::constant(1),
                hi: IntExpr::minus(IntExpr::name("n"), IntExpr::constant(1)),
            })
        );
    }

    #[test]
    fn rejects_one_sided_and_other_shapes() {
        let one_sided = Predicate::and(
            cmp(CompOp::Le, IntExpr::constant(0), k()),
            cmp(CompOp::Lt, IntExpr::constant(1), k()),
        );
        assert_eq!(parse_range(&one_sided, "k"), None);

        let equality = Predicate::and(
            cmp(CompOp::Eq, IntExpr::constant(0), k()),
            cmp(CompOp::Lt, k(), IntExpr::name("n")),
        );
        assert_eq!(parse_range(&equality, "k"), None);

        assert_eq!(parse_range(&cmp(CompOp::Lt, k(), IntExpr::name("n")), "k"), None);
    }

    #[test]
    fn select_shapes() {
        let m = Variable::name("m");
        let cell = IntExpr::select(
            Variable::select(m.clone(), IntExpr::name("i")),
            IntExpr::name("j"),
        );
        let (arr, row, col) = double_select(&cell).expect("m[i][j]");
        assert_eq!(arr, &m);
        assert!(row.is_name("i") && col.is_name("j"));
        assert!(single_select(&cell).is_none());

        let elem = IntExpr::select(Variable::name("x"), IntExpr::name("k"));
        assert!(single_select(&elem).is_some());
        assert!(double_select(&elem).is_none());
        assert_eq!(array_indexed_by(&elem, "k"), Some(&Variable::name("x")));
        assert_eq!(array_indexed_by(&elem, "j"), None);
    }
}
