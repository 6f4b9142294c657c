use std::{
    pin::Pin,
    sync::{
        Arc, RwLock, RwLockReadGuard, RwLockWriteGuard,
        atomic::{AtomicBool, Ordering},
    },
    task::{Context as TaskContext, Poll},
};

use futures::{Stream, StreamExt};
use tokio::{runtime::Handle, sync::mpsc};
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    AgentflowError, ApprovalRequest, ApprovalResponse, Payload, Result, RunOptions, ShareLock, StatusEvent,
    common::Queue,
    dispatcher::Dispatcher,
    events::{GraphEvent, RunEvent},
    runtime::{Channel, Context, EventBus, RunState, RunStatus},
    utils,
    workflow::Workflow,
};

const COMMAND_QUEUE_SIZE: usize = 100;

pub type RunId = String;

#[derive(Debug, Clone)]
pub enum WorkflowCommand {
    Approve(ApprovalResponse),
}

/// One execution of a workflow against one input.
///
/// The workflow is shared and never mutated; everything that changes while
/// the run progresses lives in the run's [`RunState`].
pub struct Run {
    id: RunId,
    workflow: Arc<Workflow>,
    ctx: Arc<Context>,
    state: ShareLock<RunState>,
    command_queue: Arc<Queue<WorkflowCommand>>,
    channel: Option<Arc<Channel>>,
    options: RunOptions,
    started: AtomicBool,
    cancel_requested: Arc<AtomicBool>,
}

impl Run {
    pub fn new(
        workflow: Arc<Workflow>,
        options: RunOptions,
        channel: Option<Arc<Channel>>,
    ) -> Arc<Run> {
        let rid = utils::longid();
        let ctx = Arc::new(Context::new(rid.clone(), workflow.id().to_string(), workflow.env()));

        Arc::new(Run {
            id: rid,
            workflow,
            ctx,
            state: Arc::new(RwLock::new(RunState::default())),
            command_queue: Queue::new(COMMAND_QUEUE_SIZE),
            channel,
            options,
            started: AtomicBool::new(false),
            cancel_requested: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn wid(&self) -> &str {
        self.workflow.id()
    }

    /// Spawns the scheduler on `runtime` and returns the run's event stream.
    /// A run can only be started once.
    pub fn start(
        self: &Arc<Self>,
        runtime: &Handle,
        input: Payload,
    ) -> Result<RunHandle> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(AgentflowError::Run(format!("run {} already started", self.id)));
        }

        let (tx, rx) = mpsc::channel(self.options.event_buffer.max(1));
        let dispatcher = Dispatcher::new(
            self.ctx.clone(),
            self.workflow.clone(),
            self.command_queue.clone(),
            EventBus::new(self.id.clone(), tx, self.channel.clone()),
            self.state.clone(),
            self.options.clone(),
        );
        runtime.spawn(dispatcher.run(input));

        Ok(RunHandle {
            run: self.clone(),
            events: RunStream {
                rid: self.id.clone(),
                inner: ReceiverStream::new(rx),
                ctx: self.ctx.clone(),
                cancel_requested: self.cancel_requested.clone(),
                next_sequence: 0,
                finished: false,
            },
        })
    }

    /// Aborts the run. The executor in flight is dropped, no further updates
    /// are delivered and the stream ends with a `Cancelled` status.
    pub fn cancel(&self) {
        if self.is_complete() {
            return;
        }
        self.cancel_requested.store(true, Ordering::SeqCst);
        self.ctx.done();
    }

    /// Answers the pending approval request identified by `token`.
    pub fn approve(
        &self,
        token: &str,
        approved: bool,
    ) -> Result<()> {
        let request = self.pending_approval().filter(|r| r.id == token).ok_or_else(|| {
            AgentflowError::Run(format!("run {} has no pending approval request {}", self.id, token))
        })?;
        self.command_queue.send(WorkflowCommand::Approve(request.respond(approved)))
    }

    /// Snapshot of the run state.
    pub fn state(&self) -> RunState {
        self.read_state().clone()
    }

    pub fn status(&self) -> RunStatus {
        self.read_state().status
    }

    pub fn history(&self) -> Vec<(String, Payload)> {
        self.read_state().history.clone()
    }

    pub fn pending_approval(&self) -> Option<ApprovalRequest> {
        self.read_state().pending.clone()
    }

    pub fn is_complete(&self) -> bool {
        self.read_state().status.is_terminal()
    }

    fn read_state(&self) -> RwLockReadGuard<'_, RunState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }
}

pub(crate) fn write_state(state: &ShareLock<RunState>) -> RwLockWriteGuard<'_, RunState> {
    state.write().unwrap_or_else(|e| e.into_inner())
}

/// A started run together with its ordered event stream.
pub struct RunHandle {
    run: Arc<Run>,
    events: RunStream,
}

impl RunHandle {
    pub fn id(&self) -> &str {
        self.run.id()
    }

    pub fn run(&self) -> Arc<Run> {
        self.run.clone()
    }

    pub fn cancel(&self) {
        self.run.cancel();
    }

    pub fn approve(
        &self,
        token: &str,
        approved: bool,
    ) -> Result<()> {
        self.run.approve(token, approved)
    }

    pub fn state(&self) -> RunState {
        self.run.state()
    }

    /// Drains the stream and returns the terminal status.
    pub async fn wait(mut self) -> StatusEvent {
        while let Some(event) = self.events.next().await {
            if let GraphEvent::Status(status) = event.event {
                return status;
            }
        }
        StatusEvent::failed("run stream ended without a status")
    }
}

impl Stream for RunHandle {
    type Item = RunEvent;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
    ) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().events).poll_next(cx)
    }
}

/// The caller side of a run's event bus.
///
/// Guarantees that the stream ends with exactly one status event: if the
/// scheduler goes away without sending one, a `Failed` status is
/// synthesized. Updates still buffered when the caller cancels are
/// discarded. Dropping the stream before the status arrives cancels the run.
pub struct RunStream {
    rid: RunId,
    inner: ReceiverStream<RunEvent>,
    ctx: Arc<Context>,
    cancel_requested: Arc<AtomicBool>,
    next_sequence: u64,
    finished: bool,
}

impl Stream for RunStream {
    type Item = RunEvent;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
    ) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if this.finished {
                return Poll::Ready(None);
            }
            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(event)) => {
                    this.next_sequence = event.sequence + 1;
                    if event.is_terminal() {
                        this.finished = true;
                    } else if this.cancel_requested.load(Ordering::SeqCst) && event.as_update().is_some() {
                        continue;
                    }
                    return Poll::Ready(Some(event));
                }
                Poll::Ready(None) => {
                    this.finished = true;
                    return Poll::Ready(Some(RunEvent {
                        rid: this.rid.clone(),
                        nid: String::new(),
                        sequence: this.next_sequence,
                        event: GraphEvent::Status(StatusEvent::failed("run terminated unexpectedly")),
                    }));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl Drop for RunStream {
    fn drop(&mut self) {
        if !self.finished {
            self.cancel_requested.store(true, Ordering::SeqCst);
            self.ctx.done();
        }
    }
}
