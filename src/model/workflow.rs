use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    AgentflowError, Result,
    model::{EdgeModel, ExecutorModel, SwitchModel},
    workflow::{ExecutorRegistry, Workflow, WorkflowBuilder},
};

/// Declarative form of a workflow, resolved against an
/// [`ExecutorRegistry`] to obtain a runnable [`Workflow`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowModel {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub start: String,
    pub executors: Vec<ExecutorModel>,
    #[serde(default)]
    pub edges: Vec<EdgeModel>,
    #[serde(default)]
    pub switches: Vec<SwitchModel>,
}

impl WorkflowModel {
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str::<WorkflowModel>(s).map_err(|e| AgentflowError::Convert(format!("invalid workflow model: {}", e)))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn build(
        &self,
        registry: &ExecutorRegistry,
    ) -> Result<Workflow> {
        Ok(WorkflowBuilder::from_model(self, registry)?.build()?)
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::{BuildError, Payload, workflow::Next, workflow::executors::executor_fn};

    const MODEL: &str = r#"{
        "id": "triage",
        "name": "Ticket triage",
        "start": "classify",
        "executors": [
            { "id": "classify", "uses": "echo" },
            { "id": "billing", "uses": "echo", "timeout": 500 },
            { "id": "general", "uses": "echo" }
        ],
        "switches": [
            {
                "source": "classify",
                "cases": [
                    {
                        "target": "billing",
                        "condition": {
                            "logical_operator": "and",
                            "conditions": [{ "selector": "topic", "comparison_operator": "is", "value": "billing" }]
                        }
                    }
                ],
                "default": "general"
            }
        ]
    }"#;

    fn registry() -> ExecutorRegistry {
        ExecutorRegistry::new().register("echo", executor_fn(|_, input| async move { Ok(input) }))
    }

    #[test]
    fn test_model_builds_workflow() {
        let model = WorkflowModel::from_json(MODEL).unwrap();
        let workflow = model.build(&registry()).unwrap();

        assert_eq!(workflow.name(), "Ticket triage");
        assert_eq!(workflow.get_node("billing").unwrap().timeout.map(|t| t.as_millis()), Some(500));
        assert_eq!(workflow.next("classify", &Payload::from(json!({"topic": "billing"}))), Next::Executor("billing"));
        assert_eq!(workflow.next("classify", &Payload::text("hello")), Next::Executor("general"));
    }

    #[test]
    fn test_unknown_uses() {
        let model = WorkflowModel::from_json(MODEL).unwrap();
        let err = model.build(&ExecutorRegistry::new()).err();
        assert_eq!(err, Some(AgentflowError::Build(BuildError::UnknownUses("echo".to_string()))));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(WorkflowModel::from_json("{"), Err(AgentflowError::Convert(_))));
    }
}
