use std::{collections::HashMap, sync::Arc};

use serde_json::Value;

use crate::{BuildError, Result, workflow::executors::Executor};

type Factory = Arc<dyn Fn(&Value) -> Result<Arc<dyn Executor>> + Send + Sync>;

/// Executors available to declarative workflow models, keyed by the name
/// models refer to in `uses`.
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
    factories: HashMap<String, Factory>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one shared executor instance. Model params are ignored.
    pub fn register(
        self,
        name: impl Into<String>,
        executor: impl Executor + 'static,
    ) -> Self {
        let executor: Arc<dyn Executor> = Arc::new(executor);
        self.register_factory(name, move |_| Ok(executor.clone()))
    }

    /// Registers a factory creating one executor per model entry from its
    /// params.
    pub fn register_factory<F>(
        mut self,
        name: impl Into<String>,
        factory: F,
    ) -> Self
    where
        F: Fn(&Value) -> Result<Arc<dyn Executor>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn contains(
        &self,
        name: &str,
    ) -> bool {
        self.factories.contains_key(name)
    }

    pub fn create(
        &self,
        name: &str,
        params: &Value,
    ) -> Result<Arc<dyn Executor>> {
        let factory = self.factories.get(name).ok_or_else(|| BuildError::UnknownUses(name.to_string()))?;
        factory(params)
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::{AgentflowError, Payload, workflow::executors::executor_fn};

    #[test]
    fn test_factory_receives_params() {
        let registry = ExecutorRegistry::new().register_factory("greet", |params| {
            let greeting = params.get("greeting").and_then(Value::as_str).unwrap_or("hello").to_string();
            let executor: Arc<dyn Executor> = Arc::new(executor_fn(move |_, input: Payload| {
                let text = format!("{} {}", greeting, input);
                async move { Ok(Payload::text(text)) }
            }));
            Ok(executor)
        });

        assert!(registry.contains("greet"));
        assert!(registry.create("greet", &json!({"greeting": "bonjour"})).is_ok());
        assert!(matches!(registry.create("missing", &Value::Null), Err(AgentflowError::Build(BuildError::UnknownUses(_)))));
    }
}
