//! FILENAME: core/xbrl-model/src/expression.rs
//! Expression evaluation contract.
//!
//! Table definitions may compute aspect values and cardinalities from
//! expressions. The expression language itself lives outside this workspace;
//! the engine only passes the expression text and the in-scope variable
//! bindings to an `ExpressionEvaluator` and interprets the resulting `Value`.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::aspect::{Aspect, AspectValue, Period};
use crate::qname::QName;

/// Expression source text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Expression(pub String);

impl Expression {
    pub fn new(text: impl Into<String>) -> Self {
        Expression(text.into())
    }

    pub fn text(&self) -> &str {
        &self.0
    }
}

/// Result of an evaluation, or a bound variable value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    Empty,
    Boolean(bool),
    Integer(i64),
    String(String),
    QName(QName),
    Date(NaiveDate),
    Aspect(AspectValue),
    Sequence(Vec<Value>),
}

impl Value {
    /// Flattens nested sequences; `Empty` contributes no items.
    pub fn items(&self) -> Vec<&Value> {
        match self {
            Value::Empty => Vec::new(),
            Value::Sequence(values) => values.iter().flat_map(Value::items).collect(),
            other => vec![other],
        }
    }

    /// Interprets each item as a value of `aspect`.
    pub fn to_aspect_values(&self, aspect: &Aspect) -> Result<Vec<AspectValue>, EvaluationError> {
        self.items()
            .into_iter()
            .map(|item| item.to_aspect_value(aspect))
            .collect()
    }

    fn to_aspect_value(&self, aspect: &Aspect) -> Result<AspectValue, EvaluationError> {
        let converted = match (aspect, self) {
            (_, Value::Aspect(value)) if value.fits(aspect) => Some(value.clone()),
            (Aspect::Concept, Value::QName(q)) => Some(AspectValue::Concept(q.clone())),
            (Aspect::Dimension(_), Value::QName(q)) => Some(AspectValue::Member(q.clone())),
            (Aspect::Dimension(_), Value::String(s)) => Some(AspectValue::Typed(s.clone())),
            (Aspect::Dimension(_), Value::Integer(i)) => Some(AspectValue::Typed(i.to_string())),
            (Aspect::Period, Value::Date(d)) => Some(AspectValue::Period(Period::Instant(*d))),
            _ => None,
        };
        converted.ok_or_else(|| EvaluationError::TypeMismatch {
            expected: aspect.to_string(),
            found: format!("{:?}", self),
        })
    }

    /// Interprets the value as a non-negative count.
    pub fn to_count(&self) -> Result<usize, EvaluationError> {
        match self {
            Value::Integer(n) if *n >= 0 => Ok(*n as usize),
            other => Err(EvaluationError::TypeMismatch {
                expected: "non-negative integer".to_string(),
                found: format!("{:?}", other),
            }),
        }
    }
}

/// In-scope variable bindings, ordered by name.
pub type Scope = BTreeMap<String, Value>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("variable ${0} is not in scope")]
    UnknownVariable(String),

    #[error("expression cannot be evaluated: {0}")]
    UnknownExpression(String),

    #[error("expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("evaluation failed: {0}")]
    Failed(String),
}

/// Evaluates expressions against in-scope bindings.
pub trait ExpressionEvaluator {
    fn evaluate(&self, expression: &Expression, scope: &Scope) -> Result<Value, EvaluationError>;
}

/// Minimal evaluator: `$name` reads a variable, anything else is looked up in
/// a table of precomputed results.
#[derive(Debug, Clone, Default)]
pub struct ScopeEvaluator {
    results: FxHashMap<String, Value>,
}

impl ScopeEvaluator {
    pub fn new() -> Self {
        ScopeEvaluator::default()
    }

    pub fn with_result(mut self, expression: impl Into<String>, value: Value) -> Self {
        self.results.insert(expression.into(), value);
        self
    }
}

impl ExpressionEvaluator for ScopeEvaluator {
    fn evaluate(&self, expression: &Expression, scope: &Scope) -> Result<Value, EvaluationError> {
        let text = expression.text().trim();
        if let Some(name) = text.strip_prefix('$') {
            return scope
                .get(name)
                .cloned()
                .ok_or_else(|| EvaluationError::UnknownVariable(name.to_string()));
        }
        self.results
            .get(text)
            .cloned()
            .ok_or_else(|| EvaluationError::UnknownExpression(text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(name: &str) -> QName {
        QName::new("http://example.com", name)
    }

    #[test]
    fn test_scope_evaluator() {
        let evaluator = ScopeEvaluator::new().with_result("count(x)", Value::Integer(2));
        let mut scope = Scope::new();
        scope.insert("c".to_string(), Value::QName(q("Assets")));

        assert_eq!(
            evaluator.evaluate(&Expression::new("$c"), &scope),
            Ok(Value::QName(q("Assets")))
        );
        assert_eq!(evaluator.evaluate(&Expression::new("count(x)"), &scope), Ok(Value::Integer(2)));
        assert_eq!(
            evaluator.evaluate(&Expression::new("$missing"), &scope),
            Err(EvaluationError::UnknownVariable("missing".to_string()))
        );
    }

    #[test]
    fn test_aspect_value_conversion() {
        let seq = Value::Sequence(vec![
            Value::QName(q("Assets")),
            Value::Empty,
            Value::Sequence(vec![Value::QName(q("Liabilities"))]),
        ]);
        let values = seq.to_aspect_values(&Aspect::Concept).unwrap();
        assert_eq!(
            values,
            vec![AspectValue::Concept(q("Assets")), AspectValue::Concept(q("Liabilities"))]
        );

        let err = Value::Boolean(true).to_aspect_values(&Aspect::Period);
        assert!(matches!(err, Err(EvaluationError::TypeMismatch { .. })));

        assert_eq!(Value::Integer(3).to_count(), Ok(3));
        assert!(Value::Integer(-1).to_count().is_err());
    }
}
