use crate::{ApprovalRequest, Payload, RunStatus, workflow::node::ExecutorId};

/// Run-level notices that do not end the run.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    Start(WorkflowStartEvent),
    AwaitingApproval(ApprovalRequest),
    Resumed(String),
}

impl WorkflowEvent {
    pub fn str(&self) -> &str {
        match self {
            WorkflowEvent::Start(_) => "Running",
            WorkflowEvent::AwaitingApproval(_) => "AwaitingApproval",
            WorkflowEvent::Resumed(_) => "Resumed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowStartEvent {
    /// Id of the workflow being run.
    pub wid: String,
    /// The executor the run begins with.
    pub start: ExecutorId,
}

/// The single terminal notice of a run. Always the last event on a run's
/// stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEvent {
    pub status: RunStatus,
    /// Final output for `Completed`, the last retained output for `Halted`.
    pub output: Option<Payload>,
    pub error: Option<String>,
}

impl StatusEvent {
    pub fn completed(output: Payload) -> Self {
        Self {
            status: RunStatus::Completed,
            output: Some(output),
            error: None,
        }
    }

    pub fn halted(output: Option<Payload>) -> Self {
        Self {
            status: RunStatus::Halted,
            output,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Failed,
            output: None,
            error: Some(error.into()),
        }
    }

    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Cancelled,
            output: None,
            error: Some(reason.into()),
        }
    }
}
