//! Executors built from closures.

use std::sync::Arc;

use async_trait::async_trait;
use futures::{Stream, StreamExt, stream};

use crate::{
    AgentflowError, ApprovalResponse, Payload, Result,
    runtime::Context,
    workflow::executors::{Executor, ExecutorEvent, ExecutorStream},
};

type ResumeFn = Arc<dyn Fn(Arc<Context>, ApprovalResponse) -> ExecutorStream + Send + Sync>;

/// Executor producing a single output without updates.
pub struct FnExecutor<F> {
    f: F,
}

/// Wraps an async function as an executor.
///
/// ```rust,ignore
/// let upper = executor_fn(|_ctx, input| async move { Ok(Payload::text(input.to_string().to_uppercase())) });
/// ```
pub fn executor_fn<F, Fut>(f: F) -> FnExecutor<F>
where
    F: Fn(Arc<Context>, Payload) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Payload>> + Send + 'static,
{
    FnExecutor {
        f,
    }
}

#[async_trait]
impl<F, Fut> Executor for FnExecutor<F>
where
    F: Fn(Arc<Context>, Payload) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Payload>> + Send + 'static,
{
    async fn invoke(
        &self,
        ctx: Arc<Context>,
        input: Payload,
    ) -> Result<ExecutorStream> {
        let output = (self.f)(ctx, input);
        Ok(stream::once(async move { output.await.map(ExecutorEvent::Completed) }).boxed())
    }
}

/// Executor whose invocation is an arbitrary event stream.
pub struct StreamExecutor<F> {
    f: F,
    on_resume: Option<ResumeFn>,
}

/// Wraps a function returning a stream of [`ExecutorEvent`]s as an executor.
pub fn stream_fn<F, S>(f: F) -> StreamExecutor<F>
where
    F: Fn(Arc<Context>, Payload) -> S + Send + Sync,
    S: Stream<Item = Result<ExecutorEvent>> + Send + 'static,
{
    StreamExecutor {
        f,
        on_resume: None,
    }
}

impl<F> StreamExecutor<F> {
    /// Handles the answer to an approval request yielded by the stream.
    pub fn on_resume<R, S>(
        mut self,
        resume: R,
    ) -> Self
    where
        R: Fn(Arc<Context>, ApprovalResponse) -> S + Send + Sync + 'static,
        S: Stream<Item = Result<ExecutorEvent>> + Send + 'static,
    {
        self.on_resume = Some(Arc::new(move |ctx: Arc<Context>, response: ApprovalResponse| resume(ctx, response).boxed()));
        self
    }
}

#[async_trait]
impl<F, S> Executor for StreamExecutor<F>
where
    F: Fn(Arc<Context>, Payload) -> S + Send + Sync,
    S: Stream<Item = Result<ExecutorEvent>> + Send + 'static,
{
    async fn invoke(
        &self,
        ctx: Arc<Context>,
        input: Payload,
    ) -> Result<ExecutorStream> {
        Ok((self.f)(ctx, input).boxed())
    }

    async fn resume(
        &self,
        ctx: Arc<Context>,
        response: ApprovalResponse,
    ) -> Result<ExecutorStream> {
        match &self.on_resume {
            Some(resume) => Ok(resume(ctx, response)),
            None => Err(AgentflowError::Executor(format!("executor {} does not support approval requests", ctx.nid()))),
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use futures::TryStreamExt;

    use super::*;
    use crate::{ApprovalRequest, FunctionCall, events::UpdateContent};

    fn ctx() -> Arc<Context> {
        Arc::new(Context::new("r1".to_string(), "w1".to_string(), &HashMap::new()).for_executor("x"))
    }

    #[tokio::test]
    async fn test_executor_fn_is_lazy() {
        let executor = executor_fn(|_, input: Payload| async move { Ok(Payload::text(format!("{}!", input))) });
        let stream = executor.invoke(ctx(), Payload::text("hi")).await.unwrap();
        let events: Vec<ExecutorEvent> = stream.try_collect().await.unwrap();
        assert_eq!(events, vec![ExecutorEvent::completed("hi!")]);
    }

    #[tokio::test]
    async fn test_stream_fn_and_resume() {
        let executor = stream_fn(|_, _| {
            let request = ApprovalRequest::new(FunctionCall::new("c1", "delete", serde_json::Value::Null));
            stream::iter(vec![Ok(ExecutorEvent::text("thinking")), Ok(ExecutorEvent::Update(UpdateContent::ApprovalRequest(request)))])
        });
        let request = ApprovalRequest::new(FunctionCall::new("c1", "delete", serde_json::Value::Null));
        assert!(executor.resume(ctx(), request.respond(true)).await.is_err());

        let executor = executor.on_resume(|_, response: ApprovalResponse| {
            let verdict = if response.approved { "deleted" } else { "kept" };
            stream::iter(vec![Ok(ExecutorEvent::completed(verdict))])
        });
        let events: Vec<ExecutorEvent> = executor.invoke(ctx(), Payload::null()).await.unwrap().try_collect().await.unwrap();
        assert_eq!(events.len(), 2);

        let events: Vec<ExecutorEvent> = executor.resume(ctx(), request.respond(false)).await.unwrap().try_collect().await.unwrap();
        assert_eq!(events, vec![ExecutorEvent::completed("kept")]);
    }
}
