use std::{fmt, sync::Arc, time::Duration};

use crate::workflow::executors::Executor;

/// executor id, unique within a workflow
pub type ExecutorId = String;

/// Registration options for an executor.
#[derive(Debug, Clone, Default)]
pub struct NodeOptions {
    /// human readable title, defaults to the id
    pub title: Option<String>,
    /// timeout for one invocation, excluding time spent awaiting approval
    pub timeout: Option<Duration>,
}

impl NodeOptions {
    pub fn title(
        mut self,
        title: impl Into<String>,
    ) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A graph node: an executor with its identity.
#[derive(Clone)]
pub struct Node {
    pub id: ExecutorId,
    pub title: String,
    pub timeout: Option<Duration>,
    pub executor: Arc<dyn Executor>,
}

impl Node {
    pub fn new(
        id: ExecutorId,
        executor: Arc<dyn Executor>,
        options: NodeOptions,
    ) -> Self {
        Self {
            title: options.title.unwrap_or_else(|| id.clone()),
            id,
            timeout: options.timeout,
            executor,
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Node").field("id", &self.id).field("title", &self.title).field("timeout", &self.timeout).finish()
    }
}
