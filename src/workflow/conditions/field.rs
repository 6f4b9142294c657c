use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    AgentflowError, Payload, Result,
    workflow::conditions::{
        Condition,
        models::{Comparison, ComparisonOperator, ConditionValue, LogicalOperator},
    },
};

/// A declarative condition: comparisons joined by a logical operator.
///
/// ```rust,ignore
/// let is_canada = FieldCondition::new(LogicalOperator::And)
///     .with("country", ComparisonOperator::Is, "Canada")
///     .with("population", ComparisonOperator::Gt, "1000000");
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct FieldCondition {
    #[serde(default)]
    pub logical_operator: LogicalOperator,
    pub conditions: Vec<Comparison>,
}

impl FieldCondition {
    pub fn new(logical_operator: LogicalOperator) -> Self {
        Self {
            logical_operator,
            conditions: Vec::new(),
        }
    }

    pub fn with(
        mut self,
        selector: impl Into<String>,
        comparison_operator: ComparisonOperator,
        value: impl Into<ConditionValue>,
    ) -> Self {
        self.conditions.push(Comparison {
            selector: selector.into(),
            comparison_operator,
            value: Some(value.into()),
        });
        self
    }

    /// Adds a comparison that takes no value (`empty`, `null`, ...).
    pub fn check(
        mut self,
        selector: impl Into<String>,
        comparison_operator: ComparisonOperator,
    ) -> Self {
        self.conditions.push(Comparison {
            selector: selector.into(),
            comparison_operator,
            value: None,
        });
        self
    }

    /// Rejects comparisons that could never match: missing values and
    /// invalid regular expressions.
    pub fn validate(&self) -> Result<()> {
        for comparison in &self.conditions {
            let op = comparison.comparison_operator;
            match (&comparison.value, op) {
                (None, op) if !op.is_unary() => {
                    return Err(AgentflowError::Config(format!("comparison '{}' on '{}' requires a value", op.as_ref(), comparison.selector)));
                }
                (Some(ConditionValue::Str(pattern)), ComparisonOperator::Regex) => {
                    Regex::new(pattern).map_err(|e| AgentflowError::Config(format!("invalid regex '{}': {}", pattern, e)))?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn process_conditions(
        &self,
        output: &Payload,
    ) -> bool {
        let document = output.structured();
        let mut results = self.conditions.iter().map(|condition| {
            let actual = select(output, document.as_ref(), &condition.selector);
            evaluate_comparison(actual.as_ref(), condition.comparison_operator, &condition.value)
        });

        match self.logical_operator {
            LogicalOperator::And => results.all(|r| r),
            LogicalOperator::Or => results.any(|r| r),
        }
    }
}

impl Condition for FieldCondition {
    fn evaluate(
        &self,
        output: &Payload,
    ) -> bool {
        !self.conditions.is_empty() && self.process_conditions(output)
    }
}

/// Resolves a dotted selector. Text that is not JSON can only be selected
/// as a whole.
fn select(
    output: &Payload,
    document: Option<&Value>,
    selector: &str,
) -> Option<Value> {
    let selector = selector.trim();
    let path = selector.strip_prefix("$.").unwrap_or(selector);
    if path.is_empty() || path == "$" {
        return Some(document.cloned().unwrap_or_else(|| output.value().clone()));
    }

    let mut current = document?;
    for key in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(key)?,
            Value::Array(arr) => arr.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current.clone())
}

fn evaluate_comparison(
    actual: Option<&Value>,
    operator: ComparisonOperator,
    expected: &Option<ConditionValue>,
) -> bool {
    match operator {
        ComparisonOperator::Null => matches!(actual, None | Some(Value::Null)),
        ComparisonOperator::NotNull => !matches!(actual, None | Some(Value::Null)),
        ComparisonOperator::Empty => match actual {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(Value::Array(arr)) => arr.is_empty(),
            Some(Value::Object(obj)) => obj.is_empty(),
            _ => false,
        },
        ComparisonOperator::NotEmpty => !evaluate_comparison(actual, ComparisonOperator::Empty, expected),
        _ => {
            let (Some(actual), Some(expected)) = (actual, expected) else {
                return false;
            };
            evaluate_with_value(actual, operator, expected)
        }
    }
}

fn evaluate_with_value(
    actual: &Value,
    operator: ComparisonOperator,
    expected: &ConditionValue,
) -> bool {
    match operator {
        ComparisonOperator::Contains => eval_contains(actual, expected),
        ComparisonOperator::NotContains => !eval_contains(actual, expected),
        ComparisonOperator::StartWith => eval_str(actual, expected, |s, e| s.starts_with(e)),
        ComparisonOperator::EndWith => eval_str(actual, expected, |s, e| s.ends_with(e)),
        ComparisonOperator::Is => eval_is(actual, expected),
        ComparisonOperator::IsNot => !eval_is(actual, expected),
        ComparisonOperator::In => eval_in(actual, expected),
        ComparisonOperator::NotIn => !eval_in(actual, expected),
        ComparisonOperator::AllOf => eval_all_of(actual, expected),
        ComparisonOperator::Regex => eval_str(actual, expected, |s, pattern| Regex::new(pattern).map(|re| re.is_match(s)).unwrap_or(false)),
        ComparisonOperator::Eq => eval_eq(actual, expected),
        ComparisonOperator::Ne => !eval_eq(actual, expected),
        ComparisonOperator::Gt => eval_cmp(actual, expected, |a, b| a > b),
        ComparisonOperator::Lt => eval_cmp(actual, expected, |a, b| a < b),
        ComparisonOperator::Ge => eval_cmp(actual, expected, |a, b| a >= b),
        ComparisonOperator::Le => eval_cmp(actual, expected, |a, b| a <= b),
        ComparisonOperator::Empty | ComparisonOperator::NotEmpty | ComparisonOperator::Null | ComparisonOperator::NotNull => false,
    }
}

fn eval_contains(
    actual: &Value,
    expected: &ConditionValue,
) -> bool {
    match (actual, expected) {
        (Value::String(s), ConditionValue::Str(e)) => s.contains(e.as_str()),
        (Value::Array(arr), ConditionValue::Str(e)) => arr.iter().any(|v| v.as_str() == Some(e.as_str())),
        _ => false,
    }
}

fn eval_str(
    actual: &Value,
    expected: &ConditionValue,
    op: impl Fn(&str, &str) -> bool,
) -> bool {
    match (actual, expected) {
        (Value::String(s), ConditionValue::Str(e)) => op(s, e),
        _ => false,
    }
}

fn eval_is(
    actual: &Value,
    expected: &ConditionValue,
) -> bool {
    match (actual, expected) {
        (Value::String(s), ConditionValue::Str(e)) => s == e,
        (Value::Bool(b), ConditionValue::Str(e)) => (*b && e == "true") || (!*b && e == "false"),
        _ => false,
    }
}

fn eval_in(
    actual: &Value,
    expected: &ConditionValue,
) -> bool {
    match (actual, expected) {
        (Value::String(s), ConditionValue::List(list)) => list.contains(s),
        (Value::Number(n), ConditionValue::List(list)) => list.contains(&n.to_string()),
        (Value::String(a), ConditionValue::Str(s)) => s.contains(a.as_str()),
        _ => false,
    }
}

fn eval_all_of(
    actual: &Value,
    expected: &ConditionValue,
) -> bool {
    match (actual, expected) {
        (Value::Array(arr), ConditionValue::List(list)) => list.iter().all(|e| arr.iter().any(|v| v.as_str() == Some(e.as_str()))),
        _ => false,
    }
}

fn eval_eq(
    actual: &Value,
    expected: &ConditionValue,
) -> bool {
    match (actual, expected) {
        (Value::Number(n), ConditionValue::Str(s)) => s.parse::<f64>().ok().is_some_and(|e| n.as_f64() == Some(e)),
        (Value::String(a), ConditionValue::Str(e)) => a == e,
        _ => false,
    }
}

fn eval_cmp(
    actual: &Value,
    expected: &ConditionValue,
    cmp: impl Fn(f64, f64) -> bool,
) -> bool {
    match (actual, expected) {
        (Value::Number(n), ConditionValue::Str(s)) => match (n.as_f64(), s.parse::<f64>()) {
            (Some(a), Ok(e)) => cmp(a, e),
            _ => false,
        },
        _ => false,
    }
}
