use serde::{Deserialize, Serialize};

use crate::{ApprovalRequest, Payload, workflow::node::ExecutorId};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Pending,
    Running,
    /// Suspended until the caller answers the pending approval request.
    AwaitingApproval,
    /// The last invoked executor had no outgoing route.
    Completed,
    /// A switch group matched no case and had no default.
    Halted,
    Failed,
    /// The caller aborted the run.
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Halted | RunStatus::Failed | RunStatus::Cancelled)
    }
}

/// Mutable state of one run. Readable through snapshots while the run
/// progresses and after it ends.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    pub status: RunStatus,
    /// The executor being invoked, or the last one invoked once terminal.
    pub current_id: Option<ExecutorId>,
    /// Output of every completed invocation, in order.
    pub history: Vec<(ExecutorId, Payload)>,
    /// Executor invocations started so far.
    pub steps: u64,
    /// Set while `status` is `AwaitingApproval`.
    pub pending: Option<ApprovalRequest>,
    /// Failure or cancellation detail once terminal.
    pub error: Option<String>,
}

impl RunState {
    /// The output of the most recent completed invocation.
    pub fn last_output(&self) -> Option<&Payload> {
        self.history.last().map(|(_, output)| output)
    }
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(!RunStatus::Pending.is_terminal());
        assert!(!RunStatus::AwaitingApproval.is_terminal());
        assert!(RunStatus::Halted.is_terminal());
        assert!(RunStatus::Cancelled.is_terminal());
        assert_eq!(RunStatus::AwaitingApproval.as_ref(), "awaiting_approval");
        assert_eq!(RunStatus::from_str("completed").unwrap(), RunStatus::Completed);
    }
}
