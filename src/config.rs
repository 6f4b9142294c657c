use std::{fs, path::Path, time::Duration};

use serde::Deserialize;

use crate::{AgentflowError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// number of async worker threads, range [1, 32768), defaults to 16
    pub async_worker_thread_number: u16,
    /// maximum number of live runs tracked by the engine
    pub run_cache_size: usize,
    /// defaults applied to every run started by the engine
    pub run: RunOptions,
    /// engine-wide event channel
    pub channel: ChannelConfig,
}

/// Per-run limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Upper bound on executor invocations per run. Disabled when unset,
    /// in which case a cycle that never exits runs forever.
    pub max_steps: Option<u64>,
    /// Timeout in milliseconds for executors that do not declare their own.
    pub executor_timeout_ms: Option<u64>,
    /// Capacity of the run's event stream. The scheduler waits when the
    /// consumer falls this far behind.
    pub event_buffer: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// capacity of the broadcast queue; lagging subscribers lose older events
    pub event_queue_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            async_worker_thread_number: 16,
            run_cache_size: 2048,
            run: RunOptions::default(),
            channel: ChannelConfig::default(),
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_steps: None,
            executor_timeout_ms: None,
            event_buffer: 64,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            event_queue_size: 2048,
        }
    }
}

impl RunOptions {
    pub fn with_max_steps(
        mut self,
        max_steps: u64,
    ) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn with_executor_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.executor_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn with_event_buffer(
        mut self,
        event_buffer: usize,
    ) -> Self {
        self.event_buffer = event_buffer;
        self
    }

    pub fn executor_timeout(&self) -> Option<Duration> {
        self.executor_timeout_ms.map(Duration::from_millis)
    }
}

impl Config {
    pub fn create<T: AsRef<Path>>(path: T) -> Result<Self> {
        let data = fs::read_to_string(path.as_ref())
            .map_err(|e| AgentflowError::Config(format!("failed to load config file {:?}: {}", path.as_ref(), e)))?;

        Self::load_from_str(data.as_str())
    }

    pub fn load_from_str(toml_str: &str) -> Result<Self> {
        let config = toml::from_str::<Config>(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.async_worker_thread_number == 0 || self.async_worker_thread_number >= 32768 {
            return Err(AgentflowError::Config(format!(
                "async_worker_thread_number must be in [1, 32768), got {}",
                self.async_worker_thread_number
            )));
        }
        if self.run.event_buffer == 0 {
            return Err(AgentflowError::Config("run.event_buffer must be positive".to_string()));
        }
        if self.channel.event_queue_size == 0 {
            return Err(AgentflowError::Config("channel.event_queue_size must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use crate::{Config, RunOptions};

    #[test]
    fn test_config_deserialize() {
        let toml_str = r#"
        async_worker_thread_number = 10
        [run]
        max_steps = 50
        executor_timeout_ms = 30000

        [channel]
        event_queue_size = 128
        "#;
        let config = Config::load_from_str(toml_str).unwrap();
        assert_eq!(config.async_worker_thread_number, 10);
        assert_eq!(config.run.max_steps, Some(50));
        assert_eq!(config.run.executor_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.run.event_buffer, 64);
        assert_eq!(config.channel.event_queue_size, 128);
        assert_eq!(config.run_cache_size, 2048);
    }

    #[test]
    fn test_config_defaults_from_empty() {
        let config = Config::load_from_str("").unwrap();
        assert_eq!(config.async_worker_thread_number, 16);
        assert_eq!(config.run.max_steps, None);
    }

    #[test]
    fn test_executor_timeout_saturates() {
        let options = RunOptions::default().with_executor_timeout(Duration::MAX);
        assert_eq!(options.executor_timeout_ms, Some(u64::MAX));
    }

    #[test]
    fn test_config_rejects_invalid() {
        assert!(Config::load_from_str("async_worker_thread_number = 0").is_err());
        assert!(Config::load_from_str("[run]\nevent_buffer = 0").is_err());
        assert!(Config::load_from_str("[channel]\nevent_queue_size = 0").is_err());
        assert!(Config::load_from_str("async_worker_thread_number = \"many\"").is_err());
    }
}
