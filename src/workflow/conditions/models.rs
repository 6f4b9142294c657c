use serde::{Deserialize, Serialize};

/// Logical operator
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

/// Comparison operator
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ComparisonOperator {
    // string or array
    Contains,
    NotContains,
    StartWith,
    EndWith,
    Is,
    IsNot,
    Empty,
    NotEmpty,
    In,
    NotIn,
    AllOf,
    Regex,
    // number
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    // presence
    Null,
    NotNull,
}

impl ComparisonOperator {
    /// Operators that only look at the selected value.
    pub fn is_unary(&self) -> bool {
        matches!(self, Self::Empty | Self::NotEmpty | Self::Null | Self::NotNull)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Str(String),
    List(Vec<String>),
}

impl From<&str> for ConditionValue {
    fn from(s: &str) -> Self {
        ConditionValue::Str(s.to_string())
    }
}

impl From<String> for ConditionValue {
    fn from(s: String) -> Self {
        ConditionValue::Str(s)
    }
}

impl From<Vec<&str>> for ConditionValue {
    fn from(list: Vec<&str>) -> Self {
        ConditionValue::List(list.into_iter().map(str::to_string).collect())
    }
}

/// One comparison against a value selected from the output.
///
/// `selector` is a dotted path into the structured output (`city.country`,
/// `items.0`). An empty selector or `$` selects the whole output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    #[serde(default)]
    pub selector: String,
    pub comparison_operator: ComparisonOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ConditionValue>,
}
