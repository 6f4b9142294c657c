use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use crate::{Payload, workflow::conditions::Condition};

/// Parses the output into `T` and applies a predicate to it.
///
/// Output that does not parse as `T` does not match.
pub struct StructuredCondition<T, F> {
    predicate: F,
    _marker: PhantomData<fn() -> T>,
}

impl<T, F> StructuredCondition<T, F>
where
    T: DeserializeOwned,
    F: Fn(&T) -> bool + Send + Sync,
{
    pub fn new(predicate: F) -> Self {
        Self {
            predicate,
            _marker: PhantomData,
        }
    }
}

impl<T, F> Condition for StructuredCondition<T, F>
where
    T: DeserializeOwned,
    F: Fn(&T) -> bool + Send + Sync,
{
    fn evaluate(
        &self,
        output: &Payload,
    ) -> bool {
        output.parse::<T>().map(|value| (self.predicate)(&value)).unwrap_or(false)
    }
}

#[cfg(test)]
mod test {
    use serde::Deserialize;

    use super::*;

    #[derive(Deserialize)]
    struct CityInfo {
        country: Option<String>,
    }

    #[test]
    fn test_structured_condition() {
        let is_canada = StructuredCondition::new(|info: &CityInfo| info.country.as_deref() == Some("Canada"));
        assert!(is_canada.evaluate(&Payload::text(r#"{"name":"Vancouver","country":"Canada"}"#)));
        assert!(!is_canada.evaluate(&Payload::text(r#"{"country":"Japan"}"#)));
        assert!(!is_canada.evaluate(&Payload::text("not json at all")));
        assert!(!is_canada.evaluate(&Payload::text("[1, 2]")));
    }
}
