//! Predicate compilation: generic filter terms into executable queries.
//!
//! A predicate arrives as an ordered list of [`PredicateTerm`]s and is folded
//! left-to-right onto a base scan of the class, mirroring a fluent
//! query-builder rather than an expression tree. A grouping term changes how
//! the *next* comparison combines with everything compiled so far, then the
//! connector reverts to AND. Order is part of the semantics:
//! `[equalTo(a,1), or, equalTo(b,2)]` matches `a=1 OR b=2`, while
//! `[equalTo(a,1), equalTo(b,2)]` matches only `a=1 AND b=2`. Do not reorder
//! terms on behalf of the caller.

use crate::engine::{NativeRecord, NativeValue};
use crate::error::{AdapterError, Result};
use crate::types::Value;
use serde::{Deserialize, Serialize};

/// Boolean connector between a comparison and the query compiled so far.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupOp {
    And,
    Or,
}

/// One unit of a linear filter expression.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PredicateTerm {
    /// Narrow the query by `field <operator> operand`.
    Compare {
        operator: String,
        field: String,
        operand: Value,
    },
    /// Change how the next comparison combines with prior ones.
    Group(GroupOp),
}

impl PredicateTerm {
    pub fn compare(
        operator: impl Into<String>,
        field: impl Into<String>,
        operand: Value,
    ) -> Self {
        PredicateTerm::Compare {
            operator: operator.into(),
            field: field.into(),
            operand,
        }
    }

    pub fn and() -> Self {
        PredicateTerm::Group(GroupOp::And)
    }

    pub fn or() -> Self {
        PredicateTerm::Group(GroupOp::Or)
    }
}

/// Comparison operators supported by the compiler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,
    EqualTo,
    NotEqualTo,
    Contains,
    In,
}

impl Operator {
    fn parse(name: &str) -> Result<Self> {
        match name {
            "greaterThan" => Ok(Operator::GreaterThan),
            "greaterThanOrEqualTo" => Ok(Operator::GreaterThanOrEqualTo),
            "lessThan" => Ok(Operator::LessThan),
            "lessThanOrEqualTo" => Ok(Operator::LessThanOrEqualTo),
            "equalTo" => Ok(Operator::EqualTo),
            "notEqualTo" => Ok(Operator::NotEqualTo),
            "contains" => Ok(Operator::Contains),
            "in" => Ok(Operator::In),
            _ => Err(AdapterError::UnknownOperator(name.to_string())),
        }
    }
}

/// A type-checked operand, ready for execution.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Int(i64),
    String(String),
    StringList(Vec<String>),
}

/// Check the operand against the operator's accepted types.
fn validate_operand(operator: Operator, name: &str, operand: &Value) -> Result<Operand> {
    let unsupported = || AdapterError::UnsupportedPredicateType {
        operator: name.to_string(),
    };

    match operator {
        Operator::GreaterThan
        | Operator::GreaterThanOrEqualTo
        | Operator::LessThan
        | Operator::LessThanOrEqualTo => match operand {
            Value::Int(n) => Ok(Operand::Int(*n)),
            _ => Err(unsupported()),
        },
        Operator::EqualTo | Operator::NotEqualTo => match operand {
            Value::Int(n) => Ok(Operand::Int(*n)),
            Value::String(s) => Ok(Operand::String(s.clone())),
            _ => Err(unsupported()),
        },
        Operator::Contains => match operand {
            Value::String(s) => Ok(Operand::String(s.clone())),
            _ => Err(unsupported()),
        },
        Operator::In => match operand {
            Value::List(items) => {
                let mut strings = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) => strings.push(s.clone()),
                        _ => return Err(unsupported()),
                    }
                }
                Ok(Operand::StringList(strings))
            }
            _ => Err(unsupported()),
        },
    }
}

/// One compiled comparison clause.
#[derive(Clone, Debug)]
pub struct Comparison {
    pub operator: Operator,
    pub field: String,
    pub operand: Operand,
}

impl Comparison {
    /// Evaluate this comparison against one record.
    ///
    /// Absent (null) fields never match, including `notEqualTo`.
    fn matches(&self, record: &NativeRecord) -> bool {
        let Some(value) = record.get(&self.field) else {
            return false;
        };

        match (&self.operand, value) {
            (Operand::Int(n), NativeValue::Int(v)) => match self.operator {
                Operator::GreaterThan => v > n,
                Operator::GreaterThanOrEqualTo => v >= n,
                Operator::LessThan => v < n,
                Operator::LessThanOrEqualTo => v <= n,
                Operator::EqualTo => v == n,
                Operator::NotEqualTo => v != n,
                _ => false,
            },
            (Operand::String(s), NativeValue::String(v)) => match self.operator {
                Operator::EqualTo => v == s,
                Operator::NotEqualTo => v != s,
                Operator::Contains => v.contains(s.as_str()),
                _ => false,
            },
            (Operand::StringList(set), NativeValue::String(v)) => {
                self.operator == Operator::In && set.iter().any(|s| s == v)
            }
            _ => false,
        }
    }
}

/// An executable, store-scoped query: a base class scan plus an ordered
/// chain of `(connector, comparison)` clauses.
///
/// Evaluation folds the chain left-to-right: the first clause's result seeds
/// the accumulator, each later clause combines with it through its connector.
/// An empty chain matches every record of the class.
#[derive(Clone, Debug)]
pub struct CompiledQuery {
    class_name: String,
    clauses: Vec<(GroupOp, Comparison)>,
}

impl CompiledQuery {
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Evaluate the folded clause chain against one record.
    pub fn matches(&self, record: &NativeRecord) -> bool {
        let mut clauses = self.clauses.iter();
        let Some((_, first)) = clauses.next() else {
            return true;
        };

        let mut acc = first.matches(record);
        for (connector, comparison) in clauses {
            acc = match connector {
                GroupOp::And => acc && comparison.matches(record),
                GroupOp::Or => acc || comparison.matches(record),
            };
        }
        acc
    }
}

/// Compile an ordered predicate onto a base scan of `class_name`.
///
/// Terms are folded in submission order. Operand types are checked here,
/// before any transaction or scan happens.
pub fn compile(class_name: &str, terms: &[PredicateTerm]) -> Result<CompiledQuery> {
    let mut clauses = Vec::new();
    let mut pending = GroupOp::And;

    for term in terms {
        match term {
            PredicateTerm::Group(op) => pending = *op,
            PredicateTerm::Compare {
                operator,
                field,
                operand,
            } => {
                let op = Operator::parse(operator)?;
                let operand = validate_operand(op, operator, operand)?;
                clauses.push((
                    pending,
                    Comparison {
                        operator: op,
                        field: field.clone(),
                        operand,
                    },
                ));
                pending = GroupOp::And;
            }
        }
    }

    Ok(CompiledQuery {
        class_name: class_name.to_string(),
        clauses,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NativeRecord;

    fn record(fields: &[(&str, NativeValue)]) -> NativeRecord {
        let mut r = NativeRecord::new("Recording", "r1");
        for (name, value) in fields {
            r.set(name, value.clone());
        }
        r
    }

    #[test]
    fn test_unknown_operator() {
        let terms = [PredicateTerm::compare("between", "a", Value::Int(1))];
        let err = compile("Recording", &terms).unwrap_err();
        assert!(matches!(err, AdapterError::UnknownOperator(ref name) if name == "between"));
    }

    #[test]
    fn test_operand_type_checking() {
        // Ordering comparisons reject strings.
        let terms = [PredicateTerm::compare("greaterThan", "a", Value::from("x"))];
        let err = compile("Recording", &terms).unwrap_err();
        assert!(
            matches!(err, AdapterError::UnsupportedPredicateType { ref operator } if operator == "greaterThan")
        );

        // contains rejects integers.
        let terms = [PredicateTerm::compare("contains", "a", Value::Int(1))];
        assert!(compile("Recording", &terms).is_err());

        // in requires a list of strings only.
        let terms = [PredicateTerm::compare(
            "in",
            "a",
            Value::List(vec![Value::from("x"), Value::Int(1)]),
        )];
        assert!(compile("Recording", &terms).is_err());
    }

    #[test]
    fn test_empty_predicate_matches_all() {
        let query = compile("Recording", &[]).unwrap();
        assert!(query.matches(&record(&[])));
    }

    #[test]
    fn test_implicit_and_chain() {
        let terms = [
            PredicateTerm::compare("equalTo", "a", Value::Int(1)),
            PredicateTerm::compare("equalTo", "b", Value::Int(2)),
        ];
        let query = compile("Recording", &terms).unwrap();

        assert!(query.matches(&record(&[
            ("a", NativeValue::Int(1)),
            ("b", NativeValue::Int(2)),
        ])));
        assert!(!query.matches(&record(&[
            ("a", NativeValue::Int(1)),
            ("b", NativeValue::Int(3)),
        ])));
    }

    #[test]
    fn test_or_grouping_changes_next_connector_only() {
        // a=1 OR b=2, then implicitly AND c=3.
        let terms = [
            PredicateTerm::compare("equalTo", "a", Value::Int(1)),
            PredicateTerm::or(),
            PredicateTerm::compare("equalTo", "b", Value::Int(2)),
            PredicateTerm::compare("equalTo", "c", Value::Int(3)),
        ];
        let query = compile("Recording", &terms).unwrap();

        // (false OR true) AND true
        assert!(query.matches(&record(&[
            ("a", NativeValue::Int(9)),
            ("b", NativeValue::Int(2)),
            ("c", NativeValue::Int(3)),
        ])));
        // (false OR true) AND false
        assert!(!query.matches(&record(&[
            ("a", NativeValue::Int(9)),
            ("b", NativeValue::Int(2)),
            ("c", NativeValue::Int(9)),
        ])));
    }

    #[test]
    fn test_order_sensitivity_of_fold() {
        // The fold is a linear chain, not a tree: [a, or, b, and, c] means
        // ((a OR b) AND c), never (a OR (b AND c)).
        let terms = [
            PredicateTerm::compare("equalTo", "a", Value::Int(1)),
            PredicateTerm::or(),
            PredicateTerm::compare("equalTo", "b", Value::Int(2)),
            PredicateTerm::and(),
            PredicateTerm::compare("equalTo", "c", Value::Int(3)),
        ];
        let query = compile("Recording", &terms).unwrap();

        // a matches, c does not: a OR (b AND c) would accept, (a OR b) AND c must not.
        assert!(!query.matches(&record(&[
            ("a", NativeValue::Int(1)),
            ("b", NativeValue::Int(9)),
            ("c", NativeValue::Int(9)),
        ])));
    }

    #[test]
    fn test_contains_substring() {
        let terms = [PredicateTerm::compare("contains", "title", Value::from("morn"))];
        let query = compile("Recording", &terms).unwrap();

        assert!(query.matches(&record(&[(
            "title",
            NativeValue::String("good morning".into())
        )])));
        assert!(!query.matches(&record(&[(
            "title",
            NativeValue::String("good evening".into())
        )])));
    }

    #[test]
    fn test_in_membership() {
        let terms = [PredicateTerm::compare(
            "in",
            "scheduleId",
            Value::List(vec![Value::from("x"), Value::from("y")]),
        )];
        let query = compile("Recording", &terms).unwrap();

        assert!(query.matches(&record(&[("scheduleId", NativeValue::String("x".into()))])));
        assert!(query.matches(&record(&[("scheduleId", NativeValue::String("y".into()))])));
        assert!(!query.matches(&record(&[("scheduleId", NativeValue::String("z".into()))])));
    }

    #[test]
    fn test_absent_field_never_matches() {
        let terms = [PredicateTerm::compare("notEqualTo", "a", Value::Int(1))];
        let query = compile("Recording", &terms).unwrap();
        assert!(!query.matches(&record(&[])));
    }
}
