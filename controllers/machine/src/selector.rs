//! Label selector matching for host selection.
//!
//! A machine's host selector is compiled into a conjunction of requirements:
//! exact-match pairs become `=` requirements, expression-form entries carry
//! their own operator. Compilation fails closed: one malformed requirement
//! aborts host selection entirely rather than being skipped, since a
//! selector that silently drops a requirement would admit everything.

use crds::{HostSelector, HostSelectorRequirement};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Errors raised while compiling selector requirements.
#[derive(Debug, Error)]
pub enum SelectorError {
    /// The operator string is not one of the recognized operators
    #[error("unrecognized selector operator {operator:?} for key {key:?}")]
    UnknownOperator {
        /// Label key the requirement applies to
        key: String,
        /// The unrecognized operator string
        operator: String,
    },

    /// The number of operand values does not fit the operator
    #[error("operator {operator:?} for key {key:?} expects {expected}, got {got} value(s)")]
    InvalidValueCount {
        /// Label key the requirement applies to
        key: String,
        /// The operator in question
        operator: Operator,
        /// Human-readable expected cardinality
        expected: &'static str,
        /// Number of values supplied
        got: usize,
    },

    /// Gt/Lt operands must be integers
    #[error("operator {operator:?} for key {key:?} requires an integer value, got {value:?}")]
    NonIntegerValue {
        /// Label key the requirement applies to
        key: String,
        /// The operator in question
        operator: Operator,
        /// The offending operand
        value: String,
    },
}

/// Recognized selector operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Label value equals the single operand
    Equals,
    /// Label absent, or value differs from the single operand
    NotEquals,
    /// Label value is one of the operands
    In,
    /// Label absent, or value is none of the operands
    NotIn,
    /// Label key is present
    Exists,
    /// Label key is absent
    DoesNotExist,
    /// Label value, as an integer, is greater than the operand
    GreaterThan,
    /// Label value, as an integer, is less than the operand
    LessThan,
}

impl Operator {
    /// Parses an operator string, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "=" | "==" => Some(Self::Equals),
            "!=" => Some(Self::NotEquals),
            "in" => Some(Self::In),
            "notin" => Some(Self::NotIn),
            "exists" => Some(Self::Exists),
            "doesnotexist" => Some(Self::DoesNotExist),
            "gt" => Some(Self::GreaterThan),
            "lt" => Some(Self::LessThan),
            _ => None,
        }
    }
}

/// A single validated requirement.
#[derive(Debug, Clone)]
pub struct Requirement {
    key: String,
    operator: Operator,
    values: Vec<String>,
}

impl Requirement {
    /// Builds a requirement, validating operand cardinality for the operator.
    pub fn new(key: &str, operator: Operator, values: Vec<String>) -> Result<Self, SelectorError> {
        let expected = match operator {
            Operator::Exists | Operator::DoesNotExist if !values.is_empty() => Some("no values"),
            Operator::Equals | Operator::NotEquals if values.len() != 1 => Some("exactly one value"),
            Operator::In | Operator::NotIn if values.is_empty() => Some("at least one value"),
            Operator::GreaterThan | Operator::LessThan if values.len() != 1 => {
                Some("exactly one value")
            }
            _ => None,
        };
        if let Some(expected) = expected {
            return Err(SelectorError::InvalidValueCount {
                key: key.to_string(),
                operator,
                expected,
                got: values.len(),
            });
        }
        if matches!(operator, Operator::GreaterThan | Operator::LessThan) {
            for value in &values {
                if value.parse::<i64>().is_err() {
                    return Err(SelectorError::NonIntegerValue {
                        key: key.to_string(),
                        operator,
                        value: value.clone(),
                    });
                }
            }
        }
        Ok(Self {
            key: key.to_string(),
            operator,
            values,
        })
    }

    /// Evaluates the requirement against a label set.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self.operator {
            Operator::Equals | Operator::In => labels
                .get(&self.key)
                .is_some_and(|v| self.values.contains(v)),
            Operator::NotEquals | Operator::NotIn => labels
                .get(&self.key)
                .is_none_or(|v| !self.values.contains(v)),
            Operator::Exists => labels.contains_key(&self.key),
            Operator::DoesNotExist => !labels.contains_key(&self.key),
            Operator::GreaterThan | Operator::LessThan => {
                let Some(observed) = labels.get(&self.key).and_then(|v| v.parse::<i64>().ok())
                else {
                    return false;
                };
                // Cardinality is validated in new(); values holds one integer
                self.values.iter().all(|v| {
                    v.parse::<i64>().is_ok_and(|operand| match self.operator {
                        Operator::GreaterThan => observed > operand,
                        _ => observed < operand,
                    })
                })
            }
        }
    }
}

/// Compiles a machine's host selector into a requirement conjunction.
pub fn build_requirements(selector: &HostSelector) -> Result<Vec<Requirement>, SelectorError> {
    let mut requirements = Vec::new();

    for (key, value) in &selector.match_labels {
        debug!("Adding requirement to match label: '{}' == '{}'", key, value);
        requirements.push(Requirement::new(key, Operator::Equals, vec![value.clone()])?);
    }

    for expr in &selector.match_expressions {
        debug!(
            "Adding requirement to match label: '{}' {} {:?}",
            expr.key, expr.operator, expr.values
        );
        let operator = parse_expression_operator(expr)?;
        requirements.push(Requirement::new(&expr.key, operator, expr.values.clone())?);
    }

    Ok(requirements)
}

fn parse_expression_operator(expr: &HostSelectorRequirement) -> Result<Operator, SelectorError> {
    Operator::parse(&expr.operator).ok_or_else(|| SelectorError::UnknownOperator {
        key: expr.key.clone(),
        operator: expr.operator.clone(),
    })
}

/// Evaluates a requirement conjunction against a candidate's labels.
/// Requirements are ANDed and order-independent.
pub fn matches(requirements: &[Requirement], labels: &BTreeMap<String, String>) -> bool {
    requirements.iter().all(|r| r.matches(labels))
}
