use jsonschema::Validator;
use serde_json::Value;

use crate::{Payload, Result, workflow::conditions::Condition};

/// Matches outputs that validate against a JSON schema.
pub struct SchemaCondition {
    validator: Validator,
}

impl SchemaCondition {
    pub fn new(schema: &Value) -> Result<Self> {
        let validator = jsonschema::validator_for(schema)?;
        Ok(Self {
            validator,
        })
    }
}

impl Condition for SchemaCondition {
    fn evaluate(
        &self,
        output: &Payload,
    ) -> bool {
        output.structured().is_some_and(|document| self.validator.is_valid(&document))
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_schema_condition() {
        let condition = SchemaCondition::new(&json!({
            "type": "object",
            "properties": {
                "approved": { "const": true }
            },
            "required": ["approved"]
        }))
        .unwrap();

        assert!(condition.evaluate(&Payload::text(r#"{"approved": true}"#)));
        assert!(condition.evaluate(&Payload::from(json!({"approved": true, "note": "ok"}))));
        assert!(!condition.evaluate(&Payload::text(r#"{"approved": false}"#)));
        assert!(!condition.evaluate(&Payload::text("approved")));
    }

    #[test]
    fn test_invalid_schema() {
        assert!(SchemaCondition::new(&json!({"type": 12})).is_err());
    }
}
