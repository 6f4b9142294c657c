use serde::{Deserialize, Serialize};

use crate::workflow::conditions::FieldCondition;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeModel {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwitchModel {
    pub source: String,
    #[serde(default)]
    pub cases: Vec<CaseModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseModel {
    pub target: String,
    pub condition: FieldCondition,
}
