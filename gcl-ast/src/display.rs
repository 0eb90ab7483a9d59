use std::fmt::{self, Display, Formatter, Write};

use crate::{
    ArithOp, BoolOp, Expr, GuardedCommands, IntExpr, Predicate, Program, Quantified, Statement,
    Variable,
};

const INDENT: &str = "  ";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Prec {
    Lowest,
    Iff,
    Implies,
    Or,
    And,
    Cmp,
    Add,
    Mul,
    Unary,
    Primary,
}

fn bool_prec(op: BoolOp) -> Prec {
    match op {
        BoolOp::Iff => Prec::Iff,
        BoolOp::Implies => Prec::Implies,
        BoolOp::Or => Prec::Or,
        BoolOp::And => Prec::And,
    }
}

fn arith_prec(op: ArithOp) -> Prec {
    match op {
        ArithOp::Plus | ArithOp::Minus => Prec::Add,
        ArithOp::Mult => Prec::Mul,
    }
}

fn fmt_pred(out: &mut String, pred: &Predicate, parent: Prec) {
    match pred {
        Predicate::Const { value } => out.push(if *value { 'T' } else { 'F' }),
        Predicate::Not { inner } => {
            out.push('~');
            fmt_pred(out, inner, Prec::Unary);
        }
        Predicate::Binary { op, left, right } => {
            let my = bool_prec(*op);
            let parens = my < parent || (my == parent && my != Prec::And && my != Prec::Or);
            if parens {
                out.push('(');
            }
            fmt_pred(out, left, my);
            out.push_str(match op {
                BoolOp::And => " && ",
                BoolOp::Or => " || ",
                BoolOp::Implies => " => ",
                BoolOp::Iff => " <=> ",
            });
            // Implication and equivalence associate to the right.
            let right_prec = match op {
                BoolOp::Implies => Prec::Iff,
                BoolOp::Iff => Prec::Lowest,
                _ => my,
            };
            fmt_pred(out, right, right_prec);
            if parens {
                out.push(')');
            }
        }
        Predicate::Comp { op, left, right } => {
            let parens = Prec::Cmp < parent;
            if parens {
                out.push('(');
            }
            fmt_int(out, left, Prec::Cmp);
            let _ = write!(out, " {} ", op.symbol());
            fmt_int(out, right, Prec::Cmp);
            if parens {
                out.push(')');
            }
        }
        Predicate::Call { name, args } => fmt_call(out, name, args),
        Predicate::Perm { arr1, arr2, n } => {
            out.push_str("perm(");
            fmt_var(out, arr1);
            out.push_str(", ");
            fmt_var(out, arr2);
            out.push_str(", ");
            fmt_int(out, n, Prec::Lowest);
            out.push(')');
        }
        Predicate::Forall(q) => fmt_binder(out, "A", q, fmt_pred),
        Predicate::Exists(q) => fmt_binder(out, "E", q, fmt_pred),
    }
}

fn fmt_int(out: &mut String, expr: &IntExpr, parent: Prec) {
    match expr {
        IntExpr::Const { value } => {
            if *value < 0 && parent > Prec::Add {
                let _ = write!(out, "({value})");
            } else {
                let _ = write!(out, "{value}");
            }
        }
        IntExpr::Var { var } => fmt_var(out, var),
        IntExpr::Negate { inner } => {
            out.push('-');
            fmt_int(out, inner, Prec::Unary);
        }
        IntExpr::Binary { op, left, right } => {
            let my = arith_prec(*op);
            let parens = my < parent;
            if parens {
                out.push('(');
            }
            fmt_int(out, left, my);
            out.push_str(match op {
                ArithOp::Plus => " + ",
                ArithOp::Minus => " - ",
                ArithOp::Mult => " * ",
            });
            // `a - (b - c)` keeps its parentheses.
            let right_prec = if *op == ArithOp::Plus { my } else { Prec::Unary };
            fmt_int(out, right, right_prec);
            if parens {
                out.push(')');
            }
        }
        IntExpr::Call { name, args } => fmt_call(out, name, args),
        IntExpr::Sum(q) => fmt_binder(out, "SUM", q, fmt_int),
        IntExpr::Prod(q) => fmt_binder(out, "PROD", q, fmt_int),
        IntExpr::Count(q) => fmt_binder(out, "N", q, fmt_pred),
    }
}

fn fmt_var(out: &mut String, var: &Variable) {
    match var {
        Variable::Name { name } => out.push_str(name),
        Variable::Select { base, selector } => {
            fmt_var(out, base);
            out.push('[');
            fmt_int(out, selector, Prec::Lowest);
            out.push(']');
        }
        Variable::Store {
            base,
            selector,
            value,
        } => {
            out.push('(');
            fmt_var(out, base);
            out.push_str("; ");
            fmt_int(out, selector, Prec::Primary);
            out.push(':');
            fmt_expr(out, value, Prec::Primary);
            out.push(')');
        }
    }
}

fn fmt_expr(out: &mut String, expr: &Expr, parent: Prec) {
    match expr {
        Expr::Map(v) => fmt_var(out, v),
        Expr::Int(e) => fmt_int(out, e, parent),
    }
}

fn fmt_call(out: &mut String, name: &str, args: &[Expr]) {
    out.push_str(name);
    out.push('(');
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        fmt_expr(out, arg, Prec::Lowest);
    }
    out.push(')');
}

fn fmt_binder<B>(
    out: &mut String,
    keyword: &str,
    q: &Quantified<B>,
    fmt_inner: fn(&mut String, &B, Prec),
) {
    let _ = write!(out, "({keyword} {} : ", q.bound_var);
    fmt_pred(out, &q.condition, Prec::Lowest);
    out.push_str(" : ");
    fmt_inner(out, &q.inner, Prec::Lowest);
    out.push(')');
}

fn fmt_statements(out: &mut String, indent: usize, statements: &[Statement]) {
    for (i, stmt) in statements.iter().enumerate() {
        if i > 0 {
            out.push_str(";\n");
        }
        fmt_statement(out, indent, stmt);
    }
}

fn fmt_statement(out: &mut String, indent: usize, stmt: &Statement) {
    let pad = INDENT.repeat(indent);
    match stmt {
        Statement::Abort { .. } => {
            let _ = write!(out, "{pad}abort");
        }
        Statement::Skip { .. } => {
            let _ = write!(out, "{pad}skip");
        }
        Statement::Assign(a) => {
            out.push_str(&pad);
            for (i, lv) in a.lvalues.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                fmt_var(out, lv);
            }
            out.push_str(" := ");
            for (i, rv) in a.rvalues.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                fmt_expr(out, rv, Prec::Lowest);
            }
        }
        Statement::If(g) => fmt_guarded(out, indent, "if", "fi", g),
        Statement::Do(g) => fmt_guarded(out, indent, "do", "od", g),
    }
}

fn fmt_guarded(out: &mut String, indent: usize, open: &str, close: &str, g: &GuardedCommands) {
    let pad = INDENT.repeat(indent);
    let _ = writeln!(out, "{pad}{open}");
    for (i, (guard, body)) in g.branches().enumerate() {
        let bar = if i == 0 { ' ' } else { '|' };
        let _ = write!(out, "{pad}{bar} ");
        fmt_pred(out, guard, Prec::Lowest);
        out.push_str(" ->\n");
        fmt_statements(out, indent + 2, body);
        out.push('\n');
    }
    let _ = write!(out, "{pad}{close}");
}

macro_rules! display_via {
    ($ty:ty, |$out:ident, $node:ident| $body:expr) => {
        impl Display for $ty {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                let mut $out = String::new();
                let $node = self;
                $body;
                f.write_str(&$out)
            }
        }
    };
}

display_via!(Predicate, |out, p| fmt_pred(&mut out, p, Prec::Lowest));
display_via!(IntExpr, |out, e| fmt_int(&mut out, e, Prec::Lowest));
display_via!(Variable, |out, v| fmt_var(&mut out, v));
display_via!(Expr, |out, e| fmt_expr(&mut out, e, Prec::Lowest));
display_via!(Statement, |out, s| fmt_statement(&mut out, 0, s));
display_via!(Program, |out, p| fmt_statements(&mut out, 0, &p.statements));
