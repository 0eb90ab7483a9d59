use gcl_ast::{ArithOp, CompOp, IntExpr, Names, Predicate, Quantified};

use super::range::{array_indexed_by, double_select, parse_range, single_select};
use super::Axiom;
use crate::error::LowerError;
use crate::lower::{AxiomTrigger, Lowering};

type Claim = Option<Result<String, LowerError>>;

pub(super) fn all() -> Vec<Axiom> {
    vec![
        Axiom::new("ARRAY_SUM", include_str!("../../axioms/array-sum.ax")).with_trigger(ArraySum),
        Axiom::new("ARRAY_PROD", include_str!("../../axioms/array-prod.ax")).with_trigger(ArrayProd),
        Axiom::new("ARRAY_CONTAINS", include_str!("../../axioms/array-contains.ax"))
            .with_trigger(ArrayContains),
        Axiom::new("ARRAY_PERM", include_str!("../../axioms/array-perm.ax")).with_trigger(ArrayPerm),
        Axiom::new("MATRIX_SUM", include_str!("../../axioms/matrix-sum.ax")).with_trigger(MatrixSum),
        Axiom::new(
            "ROW_ON_COL_DOTPROD",
            include_str!("../../axioms/row-on-col-dotprod.ax"),
        )
        .with_trigger(RowOnColDotprod),
        Axiom::new(
            "ROW_ON_VEC_DOTPROD",
            include_str!("../../axioms/row-on-vec-dotprod.ax"),
        )
        .with_trigger(RowOnVecDotprod),
    ]
}

/// Renders `(head t1 t2 ...)` once every part has been lowered.
fn term(head: &str, parts: Vec<Result<String, LowerError>>) -> Result<String, LowerError> {
    let mut out = format!("({head}");
    for part in parts {
        out.push(' ');
        out.push_str(&part?);
    }
    out.push(')');
    Ok(out)
}

/// `(SUM k : lo <= k <= hi : a[k])` or the same with `PROD`.
fn fold_over_array(head: &str, q: &Quantified<IntExpr>, cx: &Lowering<'_>) -> Claim {
    let array = array_indexed_by(&q.inner, &q.bound_var)?;
    let bounds = parse_range(&q.condition, &q.bound_var)?;
    Some(term(
        head,
        vec![
            cx.int_expr(&bounds.lo),
            cx.int_expr(&bounds.hi),
            cx.variable(array),
        ],
    ))
}

/// `(SUM k : lo <= k <= hi : a[k])` → `(sum lo hi a)`
pub struct ArraySum;

impl AxiomTrigger for ArraySum {
    fn name(&self) -> &str {
        "ARRAY_SUM"
    }

    fn on_int_expr(&self, expr: &IntExpr, cx: &Lowering<'_>) -> Claim {
        match expr {
            IntExpr::Sum(q) => fold_over_array("sum", q, cx),
            _ => None,
        }
    }
}

/// `(PROD k : lo <= k <= hi : a[k])` → `(prod lo hi a)`
pub struct ArrayProd;

impl AxiomTrigger for ArrayProd {
    fn name(&self) -> &str {
        "ARRAY_PROD"
    }

    fn on_int_expr(&self, expr: &IntExpr, cx: &Lowering<'_>) -> Claim {
        match expr {
            IntExpr::Prod(q) => fold_over_array("prod", q, cx),
            _ => None,
        }
    }
}

/// `(E k : lo <= k <= hi : a[k] = m)` → `(contains lo hi a m)`
pub struct ArrayContains;

impl AxiomTrigger for ArrayContains {
    fn name(&self) -> &str {
        "ARRAY_CONTAINS"
    }

    fn on_predicate(&self, predicate: &Predicate, cx: &Lowering<'_>) -> Claim {
        let Predicate::Exists(q) = predicate else {
            return None;
        };
        let Predicate::Comp {
            op: CompOp::Eq,
            left,
            right,
        } = &*q.inner
        else {
            return None;
        };
        let k = q.bound_var.as_str();
        let (array, value) = match array_indexed_by(left, k) {
            Some(array) => (array, &**right),
            None => (array_indexed_by(right, k)?, &**left),
        };
        if value.free_names().contains(k) {
            return None;
        }
        let bounds = parse_range(&q.condition, k)?;
        Some(term(
            "contains",
            vec![
                cx.int_expr(&bounds.lo),
                cx.int_expr(&bounds.hi),
                cx.variable(array),
                cx.int_expr(value),
            ],
        ))
    }
}

/// `perm(a, b, n)` → `(perm a b n)`
pub struct ArrayPerm;

impl AxiomTrigger for ArrayPerm {
    fn name(&self) -> &str {
        "ARRAY_PERM"
    }

    fn on_predicate(&self, predicate: &Predicate, cx: &Lowering<'_>) -> Claim {
        let Predicate::Perm { arr1, arr2, n } = predicate else {
            return None;
        };
        Some(term(
            "perm",
            vec![cx.variable(arr1), cx.variable(arr2), cx.int_expr(n)],
        ))
    }
}

/// `(SUM i : ... : (SUM j : ... : m[i][j]))` → `(msum ilo ihi jlo jhi m)`
pub struct MatrixSum;

impl AxiomTrigger for MatrixSum {
    fn name(&self) -> &str {
        "MATRIX_SUM"
    }

    fn on_int_expr(&self, expr: &IntExpr, cx: &Lowering<'_>) -> Claim {
        let IntExpr::Sum(outer) = expr else {
            return None;
        };
        let IntExpr::Sum(inner) = &*outer.inner else {
            return None;
        };
        let rows = parse_range(&outer.condition, &outer.bound_var)?;
        let cols = parse_range(&inner.condition, &inner.bound_var)?;
        let (matrix, row, col) = double_select(&inner.inner)?;
        if !row.is_name(&outer.bound_var) || !col.is_name(&inner.bound_var) {
            return None;
        }
        Some(term(
            "msum",
            vec![
                cx.int_expr(&rows.lo),
                cx.int_expr(&rows.hi),
                cx.int_expr(&cols.lo),
                cx.int_expr(&cols.hi),
                cx.variable(matrix),
            ],
        ))
    }
}

fn product(expr: &IntExpr) -> Option<(&IntExpr, &IntExpr)> {
    match expr {
        IntExpr::Binary {
            op: ArithOp::Mult,
            left,
            right,
        } => Some((&**left, &**right)),
        _ => None,
    }
}

/// `(SUM k : ... : a[r][k] * b[k][c])` → `(rowcolprod lo hi r c a b)`.
/// The factors may come in either order.
pub struct RowOnColDotprod;

impl AxiomTrigger for RowOnColDotprod {
    fn name(&self) -> &str {
        "ROW_ON_COL_DOTPROD"
    }

    fn on_int_expr(&self, expr: &IntExpr, cx: &Lowering<'_>) -> Claim {
        let IntExpr::Sum(q) = expr else {
            return None;
        };
        let k = q.bound_var.as_str();
        let (left, right) = product(&q.inner)?;
        let (a1, r1, c1) = double_select(left)?;
        let (a2, r2, c2) = double_select(right)?;
        let (row, col, a, b) = if c1.is_name(k) && r2.is_name(k) {
            (r1, c2, a1, a2)
        } else if r1.is_name(k) && c2.is_name(k) {
            (r2, c1, a2, a1)
        } else {
            return None;
        };
        let bounds = parse_range(&q.condition, k)?;
        Some(term(
            "rowcolprod",
            vec![
                cx.int_expr(&bounds.lo),
                cx.int_expr(&bounds.hi),
                cx.int_expr(row),
                cx.int_expr(col),
                cx.variable(a),
                cx.variable(b),
            ],
        ))
    }
}

/// `(SUM k : ... : a[i][k] * x[k])` → `(rowvecprod lo hi i a x)`.
/// The factors may come in either order.
pub struct RowOnVecDotprod;

impl AxiomTrigger for RowOnVecDotprod {
    fn name(&self) -> &str {
        "ROW_ON_VEC_DOTPROD"
    }

    fn on_int_expr(&self, expr: &IntExpr, cx: &Lowering<'_>) -> Claim {
        let IntExpr::Sum(q) = expr else {
            return None;
        };
        let k = q.bound_var.as_str();
        let (left, right) = product(&q.inner)?;
        let (vector, matrix) = if single_select(left).is_some() {
            (left, right)
        } else {
            (right, left)
        };
        let (x, j) = single_select(vector)?;
        let (a, i, jj) = double_select(matrix)?;
        if !j.is_name(k) || !jj.is_name(k) {
            return None;
        }
        let bounds = parse_range(&q.condition, k)?;
        Some(term(
            "rowvecprod",
            vec![
                cx.int_expr(&bounds.lo),
                cx.int_expr(&bounds.hi),
                cx.int_expr(i),
                cx.variable(a),
                cx.variable(x),
            ],
        ))
    }
}
