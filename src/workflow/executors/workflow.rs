//! A workflow exposed as an executor.
//!
//! The inner workflow runs as its own run. Its updates are relayed as
//! updates of the wrapping executor and its final output becomes the
//! executor's output. Approval requests raised inside are forwarded and the
//! suspended inner run is parked until the outer run resumes it.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use futures::{StreamExt, stream};
use tracing::debug;

use crate::{
    AgentflowError, ApprovalResponse, Payload, Result, RunOptions, StatusEvent,
    events::{GraphEvent, UpdateContent, WorkflowEvent},
    runtime::{Context, RunHandle, RunStatus},
    workflow::{
        Workflow,
        executors::{Executor, ExecutorEvent, ExecutorStream},
    },
};

type Parked = Arc<Mutex<HashMap<String, RunHandle>>>;

pub struct WorkflowExecutor {
    workflow: Arc<Workflow>,
    options: RunOptions,
    parked: Parked,
}

impl WorkflowExecutor {
    pub fn new(workflow: Arc<Workflow>) -> Self {
        Self::with_options(workflow, RunOptions::default())
    }

    /// Options applied to every inner run.
    pub fn with_options(
        workflow: Arc<Workflow>,
        options: RunOptions,
    ) -> Self {
        Self {
            workflow,
            options,
            parked: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn workflow(&self) -> &Arc<Workflow> {
        &self.workflow
    }

    fn relay(
        &self,
        ctx: Arc<Context>,
        handle: RunHandle,
    ) -> ExecutorStream {
        let parked = self.parked.clone();
        let wid = self.workflow.id().to_string();

        stream::unfold(Some(handle), move |state| {
            let parked = parked.clone();
            let ctx = ctx.clone();
            let wid = wid.clone();
            async move {
                let mut handle = state?;
                while let Some(event) = handle.next().await {
                    match event.event {
                        // the inner run has recorded the pending request once this is seen
                        GraphEvent::Workflow(WorkflowEvent::AwaitingApproval(request)) => {
                            park(&parked, &ctx, request.id.clone(), handle);
                            return Some((Ok(ExecutorEvent::Update(UpdateContent::ApprovalRequest(request))), None));
                        }
                        GraphEvent::Update(UpdateContent::ApprovalRequest(_)) => {}
                        GraphEvent::Update(content) => return Some((Ok(ExecutorEvent::Update(content)), Some(handle))),
                        GraphEvent::Status(status) => return Some((into_output(&wid, status), None)),
                        _ => {}
                    }
                }
                None
            }
        })
        .boxed()
    }
}

/// Keeps the suspended inner run alive until it is resumed or the outer run
/// ends. Dropping a parked handle cancels the inner run.
fn park(
    parked: &Parked,
    ctx: &Context,
    token: String,
    handle: RunHandle,
) {
    debug!(rid = ctx.rid(), nid = ctx.nid(), inner = handle.id(), token = %token, "parking nested run");
    lock(parked).insert(token.clone(), handle);

    let parked = parked.clone();
    let shutdown = ctx.wait_shutdown();
    tokio::spawn(async move {
        shutdown.await;
        lock(&parked).remove(&token);
    });
}

fn lock(parked: &Parked) -> std::sync::MutexGuard<'_, HashMap<String, RunHandle>> {
    parked.lock().unwrap_or_else(|e| e.into_inner())
}

fn into_output(
    wid: &str,
    status: StatusEvent,
) -> Result<ExecutorEvent> {
    match status.status {
        RunStatus::Completed | RunStatus::Halted => Ok(ExecutorEvent::Completed(status.output.unwrap_or_default())),
        RunStatus::Cancelled => Err(AgentflowError::Cancelled(format!("nested workflow {} was cancelled", wid))),
        _ => Err(AgentflowError::Executor(format!("nested workflow {} failed: {}", wid, status.error.unwrap_or_default()))),
    }
}

#[async_trait]
impl Executor for WorkflowExecutor {
    async fn invoke(
        &self,
        ctx: Arc<Context>,
        input: Payload,
    ) -> Result<ExecutorStream> {
        let handle = self.workflow.run_stream_with(input, self.options.clone())?;
        debug!(rid = ctx.rid(), nid = ctx.nid(), inner = handle.id(), wid = self.workflow.id(), "nested run started");
        Ok(self.relay(ctx, handle))
    }

    async fn resume(
        &self,
        ctx: Arc<Context>,
        response: ApprovalResponse,
    ) -> Result<ExecutorStream> {
        let handle = lock(&self.parked)
            .remove(response.token())
            .ok_or_else(|| AgentflowError::Executor(format!("no nested run is waiting for approval {}", response.token())))?;
        handle.approve(response.token(), response.approved)?;
        Ok(self.relay(ctx, handle))
    }
}
