//! Incremental content produced by an executor while it runs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils;

/// One piece of streamed executor output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdateContent {
    /// A chunk of generated text.
    Text {
        text: String,
    },
    /// The executor decided to call a tool.
    FunctionCall(FunctionCall),
    /// A tool call finished.
    FunctionResult(FunctionResult),
    /// The executor needs a human decision before it can call a tool.
    /// Relaying this update suspends the run until the request is answered.
    ApprovalRequest(ApprovalRequest),
}

impl UpdateContent {
    pub fn text(text: impl Into<String>) -> Self {
        UpdateContent::Text {
            text: text.into(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            UpdateContent::Text {
                text,
            } => Some(text),
            _ => None,
        }
    }

    pub fn str(&self) -> &str {
        match self {
            UpdateContent::Text {
                ..
            } => "Text",
            UpdateContent::FunctionCall(_) => "FunctionCall",
            UpdateContent::FunctionResult(_) => "FunctionResult",
            UpdateContent::ApprovalRequest(_) => "ApprovalRequest",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub call_id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl FunctionCall {
    pub fn new(
        call_id: impl Into<String>,
        name: impl Into<String>,
        arguments: Value,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResult {
    pub call_id: String,
    #[serde(default)]
    pub result: Value,
}

/// A pending request for a human decision.
///
/// `id` is the token the caller must echo back when answering. `state` is
/// opaque to the engine; executors use it to carry whatever they need to
/// continue after the decision arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: String,
    pub function_call: FunctionCall,
    #[serde(default)]
    pub state: Value,
}

impl ApprovalRequest {
    pub fn new(function_call: FunctionCall) -> Self {
        Self {
            id: utils::longid(),
            function_call,
            state: Value::Null,
        }
    }

    pub fn with_state(
        mut self,
        state: Value,
    ) -> Self {
        self.state = state;
        self
    }

    pub fn respond(
        &self,
        approved: bool,
    ) -> ApprovalResponse {
        ApprovalResponse {
            request: self.clone(),
            approved,
        }
    }
}

/// The caller's answer to an [`ApprovalRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalResponse {
    pub request: ApprovalRequest,
    pub approved: bool,
}

impl ApprovalResponse {
    pub fn token(&self) -> &str {
        &self.request.id
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_update_content_tagging() {
        let content = UpdateContent::text("hello");
        let value = serde_json::to_value(&content).unwrap();
        assert_eq!(value, json!({"type": "text", "text": "hello"}));

        let call: UpdateContent = serde_json::from_value(json!({
            "type": "function_call",
            "call_id": "c1",
            "name": "get_weather",
            "arguments": {"location": "Toronto"}
        }))
        .unwrap();
        assert_eq!(call.str(), "FunctionCall");
        assert!(call.as_text().is_none());
    }

    #[test]
    fn test_approval_response_keeps_token() {
        let request = ApprovalRequest::new(FunctionCall::new("c1", "get_weather", json!({})));
        let response = request.respond(true);
        assert_eq!(response.token(), request.id);
        assert!(response.approved);
    }
}
