//! Error types for Agentflow.
//!
//! Runtime failures are represented by the `AgentflowError` enum. Problems
//! found while assembling a workflow graph are reported as `BuildError`,
//! which is raised before any executor runs.

use std::{io::ErrorKind, string::FromUtf8Error};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all Agentflow operations.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq)]
pub enum AgentflowError {
    /// Engine-level errors (startup, shutdown, unknown workflows).
    #[error("{0}")]
    Engine(String),

    /// Configuration parsing or validation errors.
    #[error("{0}")]
    Config(String),

    /// Data conversion errors (JSON, TOML).
    #[error("{0}")]
    Convert(String),

    /// Graph construction errors.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Scheduler errors that are not caused by an executor.
    #[error("{0}")]
    Runtime(String),

    /// Run lifecycle errors (unknown run, run already started).
    #[error("{0}")]
    Run(String),

    /// An executor invocation failed.
    #[error("{0}")]
    Executor(String),

    /// An executor invocation exceeded its timeout.
    #[error("executor {0} timed out")]
    Timeout(String),

    /// The run was cancelled by its caller.
    #[error("{0}")]
    Cancelled(String),

    /// The run exceeded its configured step limit.
    #[error("step limit of {0} exceeded")]
    StepLimit(u64),

    /// Message queue errors.
    #[error("{0}")]
    Queue(String),

    /// I/O operation errors.
    #[error("{0}")]
    IoError(String),
}

/// Errors raised while building a workflow graph.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("no start executor was set")]
    MissingStart,

    #[error("start executor {0} is not registered")]
    UnknownStart(String),

    #[error("executor {0} is registered more than once")]
    DuplicateExecutor(String),

    #[error("edge references unknown executor: from={from}, to={to}")]
    UnknownExecutor {
        from: String,
        to: String,
    },

    #[error("switch group from {0} has more than one default")]
    DuplicateDefault(String),

    #[error("executor {0} has more than one switch group")]
    DuplicateSwitch(String),

    #[error("executor {from} has more than one unconditional edge")]
    AmbiguousEdge {
        from: String,
    },

    #[error("executors are unreachable from the start executor: {}", .0.join(", "))]
    Unreachable(Vec<String>),

    #[error("no executor registered for uses '{0}'")]
    UnknownUses(String),
}

impl AgentflowError {
    /// Returns true if this error represents a caller-initiated cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AgentflowError::Cancelled(_))
    }
}

impl From<AgentflowError> for String {
    fn from(val: AgentflowError) -> Self {
        val.to_string()
    }
}

impl From<std::io::Error> for AgentflowError {
    fn from(error: std::io::Error) -> Self {
        AgentflowError::IoError(error.to_string())
    }
}

impl From<AgentflowError> for std::io::Error {
    fn from(val: AgentflowError) -> Self {
        #[allow(clippy::io_other_error)]
        std::io::Error::new(ErrorKind::Other, val.to_string())
    }
}

impl From<FromUtf8Error> for AgentflowError {
    fn from(_: FromUtf8Error) -> Self {
        AgentflowError::Convert("Error with utf-8 string convert".to_string())
    }
}

impl From<serde_json::Error> for AgentflowError {
    fn from(error: serde_json::Error) -> Self {
        AgentflowError::Convert(error.to_string())
    }
}

impl From<toml::de::Error> for AgentflowError {
    fn from(error: toml::de::Error) -> Self {
        AgentflowError::Config(error.to_string())
    }
}

impl From<jsonschema::ValidationError<'_>> for AgentflowError {
    fn from(error: jsonschema::ValidationError<'_>) -> Self {
        AgentflowError::Convert(error.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_build_error_converts() {
        let err: AgentflowError = BuildError::DuplicateDefault("router".to_string()).into();
        assert_eq!(err.to_string(), "switch group from router has more than one default");
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_unreachable_lists_ids() {
        let err = BuildError::Unreachable(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(err.to_string(), "executors are unreachable from the start executor: a, b");
    }
}
