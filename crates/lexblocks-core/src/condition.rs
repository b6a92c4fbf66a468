//! Condition evaluation: one predicate against a context.
//!
//! Evaluation is fail-closed. A missing field, an operator this build does not
//! know, or an ordering between incompatible value shapes all evaluate to
//! `false`. [`try_evaluate`] exposes the reason; [`evaluate`] collapses it.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::value::{Context, Value};

/// Comparison operator of a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not_in")]
    NotIn,
    #[serde(rename = "contains")]
    Contains,
    /// Any operator string not listed above. Always evaluates to `false`.
    #[serde(other)]
    Unsupported,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Contains => "contains",
            Self::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single predicate over one context field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}

/// Why a condition did not hold for a reason other than a plain mismatch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConditionError {
    #[error("context has no value for field `{0}`")]
    MissingField(String),

    #[error("unsupported operator on field `{0}`")]
    UnsupportedOperator(String),

    #[error("cannot order {left} against {right} for field `{field}`")]
    Incomparable {
        field: String,
        left: &'static str,
        right: &'static str,
    },
}

/// Evaluate `condition` against `context`, failing closed.
///
/// Never mutates the context and never panics.
pub fn evaluate(condition: &Condition, context: &Context) -> bool {
    match try_evaluate(condition, context) {
        Ok(matched) => matched,
        Err(e) => {
            debug!(field = %condition.field, operator = %condition.operator, reason = %e, "condition failed closed");
            false
        }
    }
}

/// Evaluate `condition`, reporting why evaluation could not proceed.
///
/// A `null` context value counts as missing.
pub fn try_evaluate(condition: &Condition, context: &Context) -> Result<bool, ConditionError> {
    let actual = match context.get(&condition.field) {
        Some(v) if !v.is_null() => v,
        _ => return Err(ConditionError::MissingField(condition.field.clone())),
    };
    let expected = &condition.value;

    let matched = match condition.operator {
        Operator::Eq => actual == expected,
        Operator::Ne => actual != expected,
        Operator::Gt => order(condition, actual, expected)? == Ordering::Greater,
        Operator::Ge => order(condition, actual, expected)? != Ordering::Less,
        Operator::Lt => order(condition, actual, expected)? == Ordering::Less,
        Operator::Le => order(condition, actual, expected)? != Ordering::Greater,
        Operator::In => is_member(actual, expected),
        Operator::NotIn => match expected {
            Value::List(_) | Value::Text(_) => !is_member(actual, expected),
            _ => false,
        },
        Operator::Contains => contains(actual, expected),
        Operator::Unsupported => {
            return Err(ConditionError::UnsupportedOperator(condition.field.clone()));
        }
    };
    Ok(matched)
}

fn order(condition: &Condition, actual: &Value, expected: &Value) -> Result<Ordering, ConditionError> {
    actual
        .partial_order(expected)
        .ok_or_else(|| ConditionError::Incomparable {
            field: condition.field.clone(),
            left: actual.kind(),
            right: expected.kind(),
        })
}

/// `actual` is an element of the list `expected`, or a substring of the text `expected`.
fn is_member(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Text(needle), Value::List(items)) => items.iter().any(|item| item == needle),
        (Value::Text(needle), Value::Text(haystack)) => haystack.contains(needle.as_str()),
        _ => false,
    }
}

/// `expected` is an element of the list `actual`, or a substring of the text `actual`.
fn contains(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::List(items), Value::Text(needle)) => items.iter().any(|item| item == needle),
        (Value::Text(haystack), Value::Text(needle)) => haystack.contains(needle.as_str()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ctx(pairs: &[(&str, Value)]) -> Context {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn equals_and_not_equals() {
        let c = ctx(&[("disability_type", "physical".into())]);
        assert!(evaluate(&Condition::new("disability_type", Operator::Eq, "physical"), &c));
        assert!(!evaluate(&Condition::new("disability_type", Operator::Eq, "mental"), &c));
        assert!(evaluate(&Condition::new("disability_type", Operator::Ne, "mental"), &c));
        // Structural equality: shapes must match.
        assert!(!evaluate(&Condition::new("disability_type", Operator::Eq, 1i64), &c));
    }

    #[test]
    fn numeric_ordering() {
        let c = ctx(&[("disability_degree", 60i64.into())]);
        assert!(evaluate(&Condition::new("disability_degree", Operator::Gt, 50i64), &c));
        assert!(!evaluate(&Condition::new("disability_degree", Operator::Gt, 60i64), &c));
        assert!(evaluate(&Condition::new("disability_degree", Operator::Ge, 60i64), &c));
        assert!(evaluate(&Condition::new("disability_degree", Operator::Lt, 70i64), &c));
        assert!(evaluate(&Condition::new("disability_degree", Operator::Le, 60i64), &c));
        assert!(!evaluate(&Condition::new("disability_degree", Operator::Le, 59.5), &c));
    }

    #[test]
    fn ordering_incompatible_shapes_fails_closed() {
        let c = ctx(&[("degree", "sixty".into())]);
        let cond = Condition::new("degree", Operator::Gt, 50i64);
        assert!(!evaluate(&cond, &c));
        assert_eq!(
            try_evaluate(&cond, &c),
            Err(ConditionError::Incomparable {
                field: "degree".into(),
                left: "text",
                right: "number",
            })
        );
        // Negated operators fail closed too rather than flipping to true.
        assert!(!evaluate(&Condition::new("degree", Operator::Le, 50i64), &c));
    }

    #[test]
    fn in_and_not_in() {
        let c = ctx(&[("state", "bayern".into())]);
        let list = Value::from(vec!["bayern", "hessen"]);
        assert!(evaluate(&Condition::new("state", Operator::In, list.clone()), &c));
        assert!(!evaluate(&Condition::new("state", Operator::NotIn, list), &c));

        let other = Value::from(vec!["berlin"]);
        assert!(!evaluate(&Condition::new("state", Operator::In, other.clone()), &c));
        assert!(evaluate(&Condition::new("state", Operator::NotIn, other), &c));

        // Text comparison value means substring membership.
        assert!(evaluate(&Condition::new("state", Operator::In, "freistaat bayern"), &c));
        // Non-collection comparison value never matches either way.
        assert!(!evaluate(&Condition::new("state", Operator::In, 5i64), &c));
        assert!(!evaluate(&Condition::new("state", Operator::NotIn, 5i64), &c));
    }

    #[test]
    fn contains_list_and_text() {
        let c = ctx(&[
            ("leistungen", vec!["assistenz", "mobilitaet"].into()),
            ("begruendung", "Antrag auf persönliches Budget".into()),
            ("degree", 60i64.into()),
        ]);
        assert!(evaluate(&Condition::new("leistungen", Operator::Contains, "assistenz"), &c));
        assert!(!evaluate(&Condition::new("leistungen", Operator::Contains, "pflege"), &c));
        assert!(evaluate(&Condition::new("begruendung", Operator::Contains, "Budget"), &c));
        assert!(!evaluate(&Condition::new("begruendung", Operator::Contains, "budget"), &c));
        assert!(!evaluate(&Condition::new("degree", Operator::Contains, "6"), &c));
    }

    #[test]
    fn missing_or_null_field_is_false() {
        let c = ctx(&[("notiz", Value::Null)]);
        for op in [Operator::Eq, Operator::Ne, Operator::NotIn, Operator::Lt] {
            assert!(!evaluate(&Condition::new("absent", op, 1i64), &c));
            assert!(!evaluate(&Condition::new("notiz", op, Value::List(vec![])), &c));
        }
        assert_eq!(
            try_evaluate(&Condition::new("absent", Operator::Eq, 1i64), &c),
            Err(ConditionError::MissingField("absent".into()))
        );
    }

    #[test]
    fn unknown_operator_deserializes_and_fails_closed() {
        let json = r#"{"field": "flag", "operator": "matches", "value": true}"#;
        let cond: Condition = serde_json::from_str(json).unwrap();
        assert_eq!(cond.operator, Operator::Unsupported);
        let c = ctx(&[("flag", true.into())]);
        assert!(!evaluate(&cond, &c));
    }

    #[test]
    fn operator_wire_names() {
        let json = r#"[">=", "not_in", "contains", "=="]"#;
        let ops: Vec<Operator> = serde_json::from_str(json).unwrap();
        assert_eq!(ops, [Operator::Ge, Operator::NotIn, Operator::Contains, Operator::Eq]);
    }

    proptest! {
        #[test]
        fn empty_context_never_matches(field in "[a-z_]{1,12}", n in any::<i32>(), idx in 0usize..9) {
            let ops = [
                Operator::Eq, Operator::Ne, Operator::Gt, Operator::Ge, Operator::Lt,
                Operator::Le, Operator::In, Operator::NotIn, Operator::Contains,
            ];
            let cond = Condition::new(field, ops[idx], n as i64);
            prop_assert!(!evaluate(&cond, &Context::new()));
        }

        #[test]
        fn evaluation_leaves_context_untouched(n in any::<i32>(), threshold in any::<i32>()) {
            let c = ctx(&[("degree", (n as i64).into())]);
            let before = c.clone();
            let _ = evaluate(&Condition::new("degree", Operator::Gt, threshold as i64), &c);
            prop_assert_eq!(c, before);
        }
    }
}
