use std::{sync::Arc, time::Duration};

use tokio::runtime::{Builder, Handle, Runtime};

use crate::{AgentflowError, Config, Engine, Result};

/// Configures and creates an [`Engine`].
///
/// Without an explicit runtime the engine owns a multi-threaded tokio
/// runtime sized by `async_worker_thread_number`. Use [`EngineBuilder::handle`]
/// to run on a runtime that already exists, such as inside `#[tokio::main]`.
#[derive(Default)]
pub struct EngineBuilder {
    config: Config,
    rt: Option<Arc<Runtime>>,
    handle: Option<Handle>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn async_worker_thread_number(
        mut self,
        n: u16,
    ) -> Self {
        self.config.async_worker_thread_number = n;
        self
    }

    pub fn run_cache_size(
        mut self,
        n: usize,
    ) -> Self {
        self.config.run_cache_size = n;
        self
    }

    pub fn event_queue_size(
        mut self,
        n: usize,
    ) -> Self {
        self.config.channel.event_queue_size = n;
        self
    }

    pub fn max_steps(
        mut self,
        n: u64,
    ) -> Self {
        self.config.run.max_steps = Some(n);
        self
    }

    pub fn executor_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.config.run.executor_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn event_buffer(
        mut self,
        n: usize,
    ) -> Self {
        self.config.run.event_buffer = n;
        self
    }

    /// Runs the engine on an owned runtime created by the caller.
    pub fn runtime(
        mut self,
        runtime: Arc<Runtime>,
    ) -> Self {
        self.rt = Some(runtime);
        self
    }

    /// Runs the engine on an existing runtime it does not own.
    pub fn handle(
        mut self,
        handle: Handle,
    ) -> Self {
        self.handle = Some(handle);
        self
    }

    pub fn build(&self) -> Result<Engine> {
        self.config.validate()?;

        let (runtime, handle) = match (&self.rt, &self.handle) {
            (Some(rt), _) => (Some(rt.clone()), rt.handle().clone()),
            (None, Some(handle)) => (None, handle.clone()),
            (None, None) => {
                let rt = Builder::new_multi_thread()
                    .worker_threads(self.config.async_worker_thread_number.into())
                    .enable_all()
                    .build()
                    .map_err(|e| AgentflowError::Engine(format!("failed to create runtime: {}", e)))?;
                let handle = rt.handle().clone();
                (Some(Arc::new(rt)), handle)
            }
        };

        Ok(Engine::new(self.config.clone(), runtime, handle))
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::EngineBuilder;
    use crate::Config;

    #[test]
    fn test_builder_rejects_invalid_config() {
        assert!(EngineBuilder::new().async_worker_thread_number(0).build().is_err());
        assert!(EngineBuilder::new().event_buffer(0).build().is_err());
        assert!(EngineBuilder::new().event_queue_size(0).build().is_err());
    }

    #[test]
    fn test_builder_applies_run_options() {
        let config = Config::load_from_str("async_worker_thread_number = 2").unwrap();
        let engine = EngineBuilder::from_config(config).max_steps(7).executor_timeout(Duration::from_millis(250)).build().unwrap();
        assert_eq!(engine.run_options().max_steps, Some(7));
        assert_eq!(engine.run_options().executor_timeout(), Some(Duration::from_millis(250)));
    }
}
