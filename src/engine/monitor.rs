use std::sync::Arc;

use tokio::{runtime::Handle, sync::broadcast::error::RecvError};
use tracing::{debug, error, info, warn};

use crate::{
    common::Shutdown,
    events::{GraphEvent, NodeEvent, WorkflowEvent},
    runtime::{Channel, RunStatus},
};

/// Logs every event published on the engine channel.
pub struct Monitor {
    channel: Arc<Channel>,

    runtime: Handle,
    shutdown: Arc<Shutdown>,
}

impl Monitor {
    pub fn new(
        channel: Arc<Channel>,
        runtime: Handle,
        shutdown: Arc<Shutdown>,
    ) -> Self {
        Self {
            channel,
            runtime,
            shutdown,
        }
    }

    pub fn monitor(&self) {
        let mut event_queue = self.channel.event_queue().subscribe();
        let shutdown = self.shutdown.wait();

        self.runtime.spawn(async move {
            tokio::pin!(shutdown);
            loop {
                let event = tokio::select! {
                    _ = &mut shutdown => break,
                    received = event_queue.recv() => match received {
                        Ok(event) => event,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "monitor lagged behind the channel");
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    },
                };

                let (rid, nid, seq) = (event.rid.as_str(), event.nid.as_str(), event.sequence);
                match &event.event {
                    GraphEvent::Workflow(WorkflowEvent::Start(start)) => {
                        info!(rid, seq, wid = %start.wid, start = %start.start, "run started");
                    }
                    GraphEvent::Workflow(WorkflowEvent::AwaitingApproval(request)) => {
                        info!(rid, nid, seq, token = %request.id, function = %request.function_call.name, "run awaiting approval");
                    }
                    GraphEvent::Workflow(WorkflowEvent::Resumed(token)) => {
                        info!(rid, nid, seq, token = %token, "run resumed");
                    }
                    GraphEvent::Node(NodeEvent::Error(reason)) => {
                        error!(rid, nid, seq, reason = %reason, "executor error");
                    }
                    GraphEvent::Node(node) => {
                        debug!(rid, nid, seq, state = node.str(), "executor");
                    }
                    GraphEvent::Update(content) => {
                        debug!(rid, nid, seq, kind = content.str(), "update");
                    }
                    GraphEvent::Status(status) => match status.status {
                        RunStatus::Failed => error!(rid, seq, error = status.error.as_deref().unwrap_or_default(), "run failed"),
                        s => info!(rid, seq, status = s.as_ref(), "run finished"),
                    },
                }
            }
        });
    }
}
