mod func;
mod workflow;

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::{AgentflowError, ApprovalResponse, Payload, Result, events::UpdateContent, runtime::Context};

pub use func::{FnExecutor, StreamExecutor, executor_fn, stream_fn};
pub use workflow::WorkflowExecutor;

/// Item of an executor's stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutorEvent {
    /// Incremental content, relayed to the caller as soon as it is pulled.
    Update(UpdateContent),
    /// The final output. Must be the last item of the stream.
    Completed(Payload),
}

impl ExecutorEvent {
    pub fn text(text: impl Into<String>) -> Self {
        ExecutorEvent::Update(UpdateContent::text(text))
    }

    pub fn completed(output: impl Into<Payload>) -> Self {
        ExecutorEvent::Completed(output.into())
    }
}

/// Lazy, ordered output of one invocation.
///
/// The scheduler pulls one item at a time and relays it before pulling the
/// next. Dropping the stream aborts the invocation.
pub type ExecutorStream = BoxStream<'static, Result<ExecutorEvent>>;

#[async_trait]
pub trait Executor: Send + Sync {
    /// Starts one invocation.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The [`Context`] of the run, scoped to this executor.
    /// * `input` - The output of the previous executor, or the run input.
    ///
    /// # Returns
    ///
    /// Returns an [`ExecutorStream`] that yields updates and ends with
    /// exactly one [`ExecutorEvent::Completed`].
    async fn invoke(
        &self,
        ctx: Arc<Context>,
        input: Payload,
    ) -> Result<ExecutorStream>;

    /// Continues an invocation that yielded an approval request.
    ///
    /// The returned stream replaces the suspended one. Executors that never
    /// request approval keep the default, which fails the run.
    async fn resume(
        &self,
        ctx: Arc<Context>,
        response: ApprovalResponse,
    ) -> Result<ExecutorStream> {
        Err(AgentflowError::Executor(format!("executor {} does not support approval requests (token {})", ctx.nid(), response.token())))
    }
}
