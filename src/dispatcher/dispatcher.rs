//! Run scheduler.
//!
//! The dispatcher walks a workflow one executor at a time:
//! - Invokes the current executor and relays its updates in order
//! - Suspends on approval requests until the caller answers
//! - Resolves the next executor from the output via edges or switch groups
//! - Emits exactly one terminal status when the walk ends

use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};

use futures::{FutureExt, StreamExt};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::{
    AgentflowError, ApprovalRequest, ApprovalResponse, Payload, Result, RunOptions, ShareLock, StatusEvent,
    common::Queue,
    events::{ErrorReason, GraphEvent, NodeEvent, UpdateContent, WorkflowEvent, WorkflowStartEvent},
    runtime::{Context, EventBus, RunState, RunStatus, WorkflowCommand, write_state},
    utils,
    workflow::{
        Next, Workflow,
        executors::{ExecutorEvent, ExecutorStream},
        node::Node,
    },
};

const CANCELLED_BY_CALLER: &str = "cancelled by caller";

/// Drives a single run from its start executor to a terminal status.
pub(crate) struct Dispatcher {
    /// Run context shared with every executor invocation.
    ctx: Arc<Context>,
    /// The immutable graph being walked.
    workflow: Arc<Workflow>,
    /// Approval decisions sent by the caller.
    command_queue: Arc<Queue<WorkflowCommand>>,
    /// Ordered event output of the run.
    bus: EventBus,
    /// State visible to the caller through the run.
    state: ShareLock<RunState>,
    options: RunOptions,
}

impl Dispatcher {
    pub(crate) fn new(
        ctx: Arc<Context>,
        workflow: Arc<Workflow>,
        command_queue: Arc<Queue<WorkflowCommand>>,
        bus: EventBus,
        state: ShareLock<RunState>,
        options: RunOptions,
    ) -> Self {
        Self {
            ctx,
            workflow,
            command_queue,
            bus,
            state,
            options,
        }
    }

    /// Runs to completion. Panics inside executors fail the run instead of
    /// leaving the stream without a status.
    pub(crate) async fn run(
        self,
        input: Payload,
    ) {
        let status = match AssertUnwindSafe(self.drive(input)).catch_unwind().await {
            Ok(Ok(status)) => status,
            Ok(Err(AgentflowError::Cancelled(reason))) => StatusEvent::cancelled(reason),
            Ok(Err(err)) => StatusEvent::failed(err.to_string()),
            Err(_) => StatusEvent::failed("executor panicked"),
        };
        self.finish(status).await;
    }

    async fn drive(
        &self,
        input: Payload,
    ) -> Result<StatusEvent> {
        let mut current = self.workflow.start().to_string();
        write_state(&self.state).status = RunStatus::Running;

        info!(rid = self.ctx.rid(), wid = self.workflow.id(), start = %current, "run started");
        self.emit(
            "",
            GraphEvent::Workflow(WorkflowEvent::Start(WorkflowStartEvent {
                wid: self.workflow.id().to_string(),
                start: current.clone(),
            })),
        )
        .await?;

        let mut input = input;
        let mut steps: u64 = 0;
        loop {
            if self.ctx.is_cancelled() {
                return Err(AgentflowError::Cancelled(CANCELLED_BY_CALLER.to_string()));
            }
            if let Some(max_steps) = self.options.max_steps {
                if steps >= max_steps {
                    return Err(AgentflowError::StepLimit(max_steps));
                }
            }
            steps += 1;

            // the builder rejects dangling targets, but a run must not trust that
            let Some(node) = self.workflow.get_node(&current) else {
                return Err(AgentflowError::Runtime(format!("executor {} not found", current)));
            };

            {
                let mut state = write_state(&self.state);
                state.current_id = Some(current.clone());
                state.steps = steps;
            }
            self.emit(&current, GraphEvent::Node(NodeEvent::Running(utils::time::time_millis()))).await?;

            let output = match self.invoke(node, input).await {
                Ok(output) => output,
                Err(err) => {
                    if !err.is_cancelled() {
                        error!(rid = self.ctx.rid(), nid = %current, error = %err, "executor failed");
                        let reason = match &err {
                            AgentflowError::Timeout(_) => ErrorReason::Timeout,
                            e => ErrorReason::Failed(e.to_string()),
                        };
                        self.emit(&current, GraphEvent::Node(NodeEvent::Error(reason))).await?;
                    }
                    return Err(err);
                }
            };

            write_state(&self.state).history.push((current.clone(), output.clone()));
            self.emit(&current, GraphEvent::Node(NodeEvent::Succeeded(utils::time::time_millis()))).await?;

            match self.workflow.next(&current, &output) {
                Next::Executor(next) => {
                    debug!(rid = self.ctx.rid(), from = %current, to = %next, "advancing");
                    current = next.to_string();
                    input = output;
                }
                Next::End => return Ok(StatusEvent::completed(output)),
                Next::Exhausted => {
                    info!(rid = self.ctx.rid(), nid = %current, "no switch case matched, halting");
                    return Ok(StatusEvent::halted(Some(output)));
                }
                Next::Unrouted(route) => {
                    return Err(AgentflowError::Runtime(format!("executor {} has no edge for {}", current, route)));
                }
            }
        }
    }

    /// Invokes one executor and drains its stream, returning its output.
    async fn invoke(
        &self,
        node: &Node,
        input: Payload,
    ) -> Result<Payload> {
        let ctx = Arc::new(self.ctx.for_executor(&node.id));
        let timeout = node.timeout.or(self.options.executor_timeout());

        let mut deadline = deadline_after(timeout);
        let mut stream: ExecutorStream = self.guard(&node.id, deadline, node.executor.invoke(ctx.clone(), input)).await??;
        let mut output: Option<Payload> = None;

        loop {
            let item = self.guard(&node.id, deadline, stream.next()).await?;
            if output.is_some() && item.is_some() {
                return Err(AgentflowError::Executor(format!("executor {} produced events after its output", node.id)));
            }

            match item {
                Some(Ok(ExecutorEvent::Update(UpdateContent::ApprovalRequest(request)))) => {
                    let response = self.await_approval(&node.id, request).await?;

                    // the decision may take arbitrarily long, so the timeout restarts
                    deadline = deadline_after(timeout);
                    stream = self.guard(&node.id, deadline, node.executor.resume(ctx.clone(), response)).await??;
                }
                Some(Ok(ExecutorEvent::Update(content))) => {
                    self.emit(&node.id, GraphEvent::Update(content)).await?;
                }
                Some(Ok(ExecutorEvent::Completed(payload))) => {
                    output = Some(payload);
                }
                Some(Err(err)) => return Err(err),
                None => {
                    return output.ok_or_else(|| AgentflowError::Executor(format!("executor {} finished without an output", node.id)));
                }
            }
        }
    }

    /// Suspends the run until the caller answers `request`.
    ///
    /// The request is pending before its update is published, so a caller
    /// may approve as soon as it sees the update.
    async fn await_approval(
        &self,
        nid: &str,
        request: ApprovalRequest,
    ) -> Result<ApprovalResponse> {
        {
            let mut state = write_state(&self.state);
            state.status = RunStatus::AwaitingApproval;
            state.pending = Some(request.clone());
        }
        info!(rid = self.ctx.rid(), nid, token = %request.id, function = %request.function_call.name, "awaiting approval");
        self.emit(nid, GraphEvent::Update(UpdateContent::ApprovalRequest(request.clone()))).await?;
        self.emit(nid, GraphEvent::Workflow(WorkflowEvent::AwaitingApproval(request.clone()))).await?;

        let cancelled = self.ctx.wait_shutdown();
        tokio::pin!(cancelled);
        loop {
            let command = tokio::select! {
                biased;
                _ = &mut cancelled => return Err(AgentflowError::Cancelled(CANCELLED_BY_CALLER.to_string())),
                command = self.command_queue.next_async() => command,
            };

            match command {
                Some(WorkflowCommand::Approve(response)) if response.token() == request.id => {
                    {
                        let mut state = write_state(&self.state);
                        state.status = RunStatus::Running;
                        state.pending = None;
                    }
                    info!(rid = self.ctx.rid(), nid, token = %request.id, approved = response.approved, "approval received");
                    self.emit(nid, GraphEvent::Workflow(WorkflowEvent::Resumed(request.id.clone()))).await?;
                    return Ok(response);
                }
                Some(WorkflowCommand::Approve(response)) => {
                    warn!(rid = self.ctx.rid(), token = response.token(), "ignoring decision for a request that is not pending");
                }
                None => return Err(AgentflowError::Queue("command queue closed".to_string())),
            }
        }
    }

    /// Races `fut` against cancellation and the invocation deadline.
    /// Cancellation wins ties so no update is relayed after it is observed.
    async fn guard<T>(
        &self,
        nid: &str,
        deadline: Option<Instant>,
        fut: impl Future<Output = T>,
    ) -> Result<T> {
        let cancelled = self.ctx.wait_shutdown();
        let expired = async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => Err(AgentflowError::Cancelled(CANCELLED_BY_CALLER.to_string())),
            _ = expired => Err(AgentflowError::Timeout(nid.to_string())),
            value = fut => Ok(value),
        }
    }

    async fn emit(
        &self,
        nid: &str,
        event: GraphEvent,
    ) -> Result<()> {
        self.bus.publish(nid, event).await
    }

    /// Records the terminal state, then publishes the status event last.
    async fn finish(
        &self,
        status: StatusEvent,
    ) {
        {
            let mut state = write_state(&self.state);
            state.status = status.status;
            state.pending = None;
            state.error = status.error.clone();
        }

        match status.status {
            RunStatus::Failed => {
                error!(rid = self.ctx.rid(), error = status.error.as_deref().unwrap_or_default(), "run failed")
            }
            s => info!(rid = self.ctx.rid(), status = s.as_ref(), "run finished"),
        }

        let stale = self.command_queue.drain();
        if stale > 0 {
            debug!(rid = self.ctx.rid(), stale, "discarded commands sent after the run ended");
        }

        // the consumer may be gone already; the channel copy is still published
        let _ = self.emit("", GraphEvent::Status(status)).await;
        self.ctx.done();
    }
}

fn deadline_after(timeout: Option<Duration>) -> Option<Instant> {
    timeout.map(|t| Instant::now() + t)
}
