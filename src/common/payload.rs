//! The value passed between executors.
//!
//! A payload is either free text (typical for agent responses) or an
//! arbitrary JSON document. The engine never looks inside a payload; only
//! conditions and executors interpret it.

use std::fmt;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{AgentflowError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Value);

impl Payload {
    pub fn null() -> Self {
        Self(Value::Null)
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self(Value::String(s.into()))
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    /// Returns the text if the payload is a plain string.
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_str()
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Interprets the payload as a JSON document.
    ///
    /// String payloads are parsed as JSON text, which is how structured agent
    /// responses arrive. Returns `None` when the text is not valid JSON.
    pub fn structured(&self) -> Option<Value> {
        match &self.0 {
            Value::String(s) => serde_json::from_str(s.trim()).ok(),
            v => Some(v.clone()),
        }
    }

    /// Deserializes the payload into `T`, accepting either a JSON value or
    /// JSON text.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        match &self.0 {
            Value::String(s) => serde_json::from_str(s.trim()).map_err(AgentflowError::from),
            v => serde_json::from_value(v.clone()).map_err(AgentflowError::from),
        }
    }

    /// Builds a payload from any serializable value.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self(serde_json::to_value(value)?))
    }
}

impl fmt::Display for Payload {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match &self.0 {
            Value::String(s) => write!(f, "{}", s),
            v => write!(f, "{}", v),
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<Payload> for Value {
    fn from(payload: Payload) -> Self {
        payload.0
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Self::text(s)
    }
}

#[cfg(test)]
mod test {
    use serde::Deserialize;
    use serde_json::json;

    use super::Payload;

    #[derive(Debug, Deserialize, PartialEq)]
    struct CityInfo {
        name: Option<String>,
        country: Option<String>,
    }

    #[test]
    fn test_parse_from_json_text() {
        let payload = Payload::text(r#" {"name": "Paris", "country": "France"} "#);
        let info: CityInfo = payload.parse().unwrap();
        assert_eq!(info.country.as_deref(), Some("France"));
    }

    #[test]
    fn test_parse_from_value() {
        let payload = Payload::from(json!({"name": "Toronto"}));
        let info: CityInfo = payload.parse().unwrap();
        assert_eq!(
            info,
            CityInfo {
                name: Some("Toronto".to_string()),
                country: None
            }
        );
    }

    #[test]
    fn test_structured_rejects_prose() {
        assert!(Payload::text("It is sunny today.").structured().is_none());
        assert!(Payload::text("not json").parse::<CityInfo>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Payload::text("done-A").to_string(), "done-A");
        assert_eq!(Payload::from(json!({"a": 1})).to_string(), r#"{"a":1}"#);
    }
}
