//! JSON interchange for expression trees.
//!
//! Every operator carries its own `type` tag (`"and"`, `"plus"`, ...) and a
//! binder is written as `"boundVar": {"type": "name", "name": "k"}`, the
//! shape grammar front ends emit. A bare string is also accepted for
//! `boundVar`. Reading goes through owned mirror enums, writing through
//! borrowed ones so no subtree is cloned.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{ArithOp, BoolOp, CompOp, Expr, IntExpr, Predicate, Quantified, Variable};

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum NameIn {
    Name { name: String },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoundVarIn {
    Node(NameIn),
    Bare(String),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum NameOut<'a> {
    Name { name: &'a str },
}

#[derive(Deserialize)]
struct QuantifiedIn<B> {
    #[serde(rename = "boundVar")]
    bound_var: BoundVarIn,
    condition: Box<Predicate>,
    inner: Box<B>,
}

#[derive(Serialize)]
struct QuantifiedOut<'a, B> {
    #[serde(rename = "boundVar")]
    bound_var: NameOut<'a>,
    condition: &'a Predicate,
    inner: &'a B,
}

impl<'de, B: Deserialize<'de>> Deserialize<'de> for Quantified<B> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let q = QuantifiedIn::<B>::deserialize(deserializer)?;
        let bound_var = match q.bound_var {
            BoundVarIn::Node(NameIn::Name { name }) | BoundVarIn::Bare(name) => name,
        };
        Ok(Quantified {
            bound_var,
            condition: q.condition,
            inner: q.inner,
        })
    }
}

impl<B: Serialize> Serialize for Quantified<B> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        QuantifiedOut {
            bound_var: NameOut::Name {
                name: &self.bound_var,
            },
            condition: &self.condition,
            inner: &*self.inner,
        }
        .serialize(serializer)
    }
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum IntExprIn {
    Const {
        #[serde(rename = "const")]
        value: i64,
    },
    Var {
        var: Variable,
    },
    Negate {
        inner: Box<IntExpr>,
    },
    Plus {
        left: Box<IntExpr>,
        right: Box<IntExpr>,
    },
    Minus {
        left: Box<IntExpr>,
        right: Box<IntExpr>,
    },
    Mult {
        left: Box<IntExpr>,
        right: Box<IntExpr>,
    },
    Call {
        name: String,
        #[serde(default)]
        args: Vec<Expr>,
    },
    Sum(Quantified<IntExpr>),
    Prod(Quantified<IntExpr>),
    Count(Quantified<Predicate>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum IntExprOut<'a> {
    Const {
        #[serde(rename = "const")]
        value: i64,
    },
    Var {
        var: &'a Variable,
    },
    Negate {
        inner: &'a IntExpr,
    },
    Plus {
        left: &'a IntExpr,
        right: &'a IntExpr,
    },
    Minus {
        left: &'a IntExpr,
        right: &'a IntExpr,
    },
    Mult {
        left: &'a IntExpr,
        right: &'a IntExpr,
    },
    Call {
        name: &'a str,
        args: &'a [Expr],
    },
    Sum(&'a Quantified<IntExpr>),
    Prod(&'a Quantified<IntExpr>),
    Count(&'a Quantified<Predicate>),
}

impl From<IntExprIn> for IntExpr {
    fn from(e: IntExprIn) -> Self {
        let binary = |op, left, right| IntExpr::Binary { op, left, right };
        match e {
            IntExprIn::Const { value } => IntExpr::Const { value },
            IntExprIn::Var { var } => IntExpr::Var { var },
            IntExprIn::Negate { inner } => IntExpr::Negate { inner },
            IntExprIn::Plus { left, right } => binary(ArithOp::Plus, left, right),
            IntExprIn::Minus { left, right } => binary(ArithOp::Minus, left, right),
            IntExprIn::Mult { left, right } => binary(ArithOp::Mult, left, right),
            IntExprIn::Call { name, args } => IntExpr::Call { name, args },
            IntExprIn::Sum(q) => IntExpr::Sum(q),
            IntExprIn::Prod(q) => IntExpr::Prod(q),
            IntExprIn::Count(q) => IntExpr::Count(q),
        }
    }
}

impl<'a> From<&'a IntExpr> for IntExprOut<'a> {
    fn from(e: &'a IntExpr) -> Self {
        match e {
            IntExpr::Const { value } => IntExprOut::Const { value: *value },
            IntExpr::Var { var } => IntExprOut::Var { var },
            IntExpr::Negate { inner } => IntExprOut::Negate { inner },
            IntExpr::Binary { op, left, right } => match op {
                ArithOp::Plus => IntExprOut::Plus { left, right },
                ArithOp::Minus => IntExprOut::Minus { left, right },
                ArithOp::Mult => IntExprOut::Mult { left, right },
            },
            IntExpr::Call { name, args } => IntExprOut::Call { name, args },
            IntExpr::Sum(q) => IntExprOut::Sum(q),
            IntExpr::Prod(q) => IntExprOut::Prod(q),
            IntExpr::Count(q) => IntExprOut::Count(q),
        }
    }
}

impl<'de> Deserialize<'de> for IntExpr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        IntExprIn::deserialize(deserializer).map(IntExpr::from)
    }
}

impl Serialize for IntExpr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        IntExprOut::from(self).serialize(serializer)
    }
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum PredicateIn {
    Const {
        #[serde(rename = "const")]
        value: bool,
    },
    Not {
        inner: Box<Predicate>,
    },
    And {
        left: Box<Predicate>,
        right: Box<Predicate>,
    },
    Or {
        left: Box<Predicate>,
        right: Box<Predicate>,
    },
    Implies {
        left: Box<Predicate>,
        right: Box<Predicate>,
    },
    Iff {
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
        #[serde(default)]
        args: Vec<Expr>,
    },
    Perm {
        arr1: Variable,
        arr2: Variable,
        n: Box<IntExpr>,
    },
    Forall(Quantified<Predicate>),
    Exists(Quantified<Predicate>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum PredicateOut<'a> {
    Const {
        #[serde(rename = "const")]
        value: bool,
    },
    Not {
        inner: &'a Predicate,
    },
    And {
        left: &'a Predicate,
        right: &'a Predicate,
    },
    Or {
        left: &'a Predicate,
        right: &'a Predicate,
    },
    Implies {
        left: &'a Predicate,
        right: &'a Predicate,
    },
    Iff {
        left: &'a Predicate,
        right: &'a Predicate,
    },
    Comp {
        op: CompOp,
        left: &'a IntExpr,
        right: &'a IntExpr,
    },
    Call {
        name: &'a str,
        args: &'a [Expr],
    },
    Perm {
        arr1: &'a Variable,
        arr2: &'a Variable,
        n: &'a IntExpr,
    },
    Forall(&'a Quantified<Predicate>),
    Exists(&'a Quantified<Predicate>),
}

impl From<PredicateIn> for Predicate {
    fn from(p: PredicateIn) -> Self {
        let binary = |op, left, right| Predicate::Binary { op, left, right };
        match p {
            PredicateIn::Const { value } => Predicate::Const { value },
            PredicateIn::Not { inner } => Predicate::Not { inner },
            PredicateIn::And { left, right } => binary(BoolOp::And, left, right),
            PredicateIn::Or { left, right } => binary(BoolOp::Or, left, right),
            PredicateIn::Implies { left, right } => binary(BoolOp::Implies, left, right),
            PredicateIn::Iff { left, right } => binary(BoolOp::Iff, left, right),
            PredicateIn::Comp { op, left, right } => Predicate::Comp { op, left, right },
            PredicateIn::Call { name, args } => Predicate::Call { name, args },
            PredicateIn::Perm { arr1, arr2, n } => Predicate::Perm { arr1, arr2, n },
            PredicateIn::Forall(q) => Predicate::Forall(q),
            PredicateIn::Exists(q) => Predicate::Exists(q),
        }
    }
}

impl<'a> From<&'a Predicate> for PredicateOut<'a> {
    fn from(p: &'a Predicate) -> Self {
        match p {
            Predicate::Const { value } => PredicateOut::Const { value: *value },
            Predicate::Not { inner } => PredicateOut::Not { inner },
            Predicate::Binary { op, left, right } => match op {
                BoolOp::And => PredicateOut::And { left, right },
                BoolOp::Or => PredicateOut::Or { left, right },
                BoolOp::Implies => PredicateOut::Implies { left, right },
                BoolOp::Iff => PredicateOut::Iff { left, right },
            },
            Predicate::Comp { op, left, right } => PredicateOut::Comp {
                op: *op,
                left,
                right,
            },
            Predicate::Call { name, args } => PredicateOut::Call { name, args },
            Predicate::Perm { arr1, arr2, n } => PredicateOut::Perm { arr1, arr2, n },
            Predicate::Forall(q) => PredicateOut::Forall(q),
            Predicate::Exists(q) => PredicateOut::Exists(q),
        }
    }
}

impl<'de> Deserialize<'de> for Predicate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        PredicateIn::deserialize(deserializer).map(Predicate::from)
    }
}

impl Serialize for Predicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        PredicateOut::from(self).serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operators_carry_their_own_tags() {
        let p = Predicate::and(
            Predicate::TRUE,
            Predicate::eq(
                IntExpr::mult(IntExpr::name("x"), IntExpr::constant(2)),
                IntExpr::constant(4),
            ),
        );
        let json = serde_json::to_value(&p).expect("serialize");
        assert_eq!(json["type"], "and");
        assert_eq!(json["right"]["left"]["type"], "mult");
        assert!(json.get("op").is_none());

        let back: Predicate = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, p);
    }

    #[test]
    fn bound_var_is_a_name_node() {
        let q = Predicate::Forall(Quantified::new("k", Predicate::TRUE, Predicate::FALSE));
        let json = serde_json::to_value(&q).expect("serialize");
        assert_eq!(json["type"], "forall");
        assert_eq!(json["boundVar"]["type"], "name");
        assert_eq!(json["boundVar"]["name"], "k");
    }

    #[test]
    fn bare_bound_var_is_accepted() {
        let json = r#"{"type": "sum", "boundVar": "k",
            "condition": {"type": "const", "const": true},
            "inner": {"type": "var", "var": {"type": "name", "name": "k"}}}"#;
        let e: IntExpr = serde_json::from_str(json).expect("deserialize");
        assert_eq!(
            e,
            IntExpr::Sum(Quantified::new("k", Predicate::TRUE, IntExpr::name("k")))
        );
    }

    #[test]
    fn shared_binary_tag_is_rejected() {
        let json = r#"{"type": "binary", "op": "+",
            "left": {"type": "const", "const": 1}, "right": {"type": "const", "const": 2}}"#;
        assert!(serde_json::from_str::<IntExpr>(json).is_err());
    }
}
