use std::fmt;

/// Lifecycle of a single executor invocation within a run.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    Running(i64),
    Succeeded(i64),
    Error(ErrorReason),
}

impl NodeEvent {
    pub fn str(&self) -> &str {
        match self {
            NodeEvent::Running(_) => "Running",
            NodeEvent::Succeeded(_) => "Succeeded",
            NodeEvent::Error(_) => "Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorReason {
    Timeout,
    Failed(String),
}

impl fmt::Display for ErrorReason {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            ErrorReason::Timeout => write!(f, "Timeout"),
            ErrorReason::Failed(msg) => write!(f, "Failed: {}", msg),
        }
    }
}
