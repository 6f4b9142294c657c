//! Events emitted while a run executes.
//!
//! Every event of a run is wrapped in a [`RunEvent`] carrying the run id,
//! the emitting executor and a sequence number that increases by one per
//! event within the run. The same events are delivered on the run's own
//! stream and on the engine-wide channel.

mod collector;
mod node;
mod update;
mod workflow;

pub use collector::ResponseCollector;
pub use node::*;
pub use update::*;
pub use workflow::*;

use crate::{runtime::RunId, workflow::node::ExecutorId};

#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    /// Run-level notices (start, approval wait, resume).
    Workflow(WorkflowEvent),
    /// Executor lifecycle (running, succeeded, error).
    Node(NodeEvent),
    /// Incremental executor output, relayed in production order.
    Update(UpdateContent),
    /// Terminal status. Exactly one per run, always last.
    Status(StatusEvent),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunEvent {
    /// Run that generated this event.
    pub rid: RunId,
    /// Executor that generated this event (empty for run-level events).
    pub nid: ExecutorId,
    /// Position of this event within the run, starting at 0.
    pub sequence: u64,
    pub event: GraphEvent,
}

impl RunEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self.event, GraphEvent::Status(_))
    }

    pub fn is_complete(&self) -> bool {
        matches!(&self.event, GraphEvent::Status(s) if s.status == crate::RunStatus::Completed)
    }

    pub fn is_error(&self) -> bool {
        matches!(&self.event, GraphEvent::Status(s) if s.status == crate::RunStatus::Failed)
    }

    pub fn as_update(&self) -> Option<&UpdateContent> {
        match &self.event {
            GraphEvent::Update(content) => Some(content),
            _ => None,
        }
    }

    pub fn as_status(&self) -> Option<&StatusEvent> {
        match &self.event {
            GraphEvent::Status(status) => Some(status),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        match &self.event {
            GraphEvent::Workflow(e) => e.str(),
            GraphEvent::Node(e) => e.str(),
            GraphEvent::Update(u) => u.str(),
            GraphEvent::Status(s) => s.status.as_ref(),
        }
    }
}
