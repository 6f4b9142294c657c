use std::sync::{Arc, RwLock};

use futures::future::BoxFuture;
use tokio::runtime::Handle;

use crate::{
    AgentflowError, Result, ShareLock, StatusEvent, UpdateContent,
    common::{BroadcastQueue, Shutdown},
    events::RunEvent,
    runtime::RunId,
};

macro_rules! dispatch_event {
    ($handles:expr, $(&$item:ident), +) => {
        let handlers = $handles.read().unwrap_or_else(|e| e.into_inner());
        for handle in handlers.iter() {
            (handle)($(&$item),+);
        }
    };
}

macro_rules! dispatch_event_async {
    ($runtime:expr, $handles:expr, $(&$item:ident), +) => {
        let handles = $handles.clone();

        $runtime.spawn(async move {
            let handlers = handles.read().unwrap_or_else(|e| e.into_inner()).clone();
            for handle in handlers.iter() {
                (handle)($(&$item),+).await;
            }
        });
    };
}

pub type RunEventHandle = Arc<dyn Fn(&RunEvent) + Send + Sync>;
pub type RunEventHandleAsync = Arc<dyn Fn(&RunEvent) -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ChannelOptions {
    /// use the glob pattern to match the run id
    /// eg. rid1*
    pub rid: String,

    /// use the glob pattern to match the executor id
    /// eg. city_*
    pub nid: String,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            rid: "*".to_string(),
            nid: "*".to_string(),
        }
    }
}

impl ChannelOptions {
    pub fn new(
        rid: String,
        nid: String,
    ) -> Self {
        Self {
            rid,
            nid,
        }
    }

    pub fn with_rid(rid: String) -> Self {
        Self {
            rid,
            nid: "*".to_string(),
        }
    }

    pub fn with_nid(nid: String) -> Self {
        Self {
            rid: "*".to_string(),
            nid,
        }
    }
}

/// Engine-wide broadcast of every run's events.
///
/// Runs publish into the queue; `listen` fans each event out to the
/// registered handlers on the engine runtime.
#[derive(Clone)]
pub struct Channel {
    event_queue: Arc<BroadcastQueue<RunEvent>>,

    events: ShareLock<Vec<RunEventHandle>>,
    events_async: ShareLock<Vec<RunEventHandleAsync>>,

    runtime: Handle,
    shutdown: Arc<Shutdown>,
}

impl Channel {
    pub(crate) fn new(
        runtime: Handle,
        event_queue_size: usize,
    ) -> Self {
        Self {
            event_queue: BroadcastQueue::new(event_queue_size),
            events: Arc::new(RwLock::new(Vec::new())),
            events_async: Arc::new(RwLock::new(Vec::new())),
            runtime,
            shutdown: Arc::new(Shutdown::new()),
        }
    }

    pub(crate) fn event_queue(&self) -> Arc<BroadcastQueue<RunEvent>> {
        self.event_queue.clone()
    }

    pub(crate) fn listen(&self) {
        let mut event_queue = self.event_queue.subscribe();
        let events = self.events.clone();
        let events_async = self.events_async.clone();
        let runtime = self.runtime.clone();

        let shutdown = self.shutdown.wait();
        self.runtime.spawn(async move {
            tokio::pin!(shutdown);
            loop {
                tokio::select! {
                    _ = &mut shutdown => break,
                    received = event_queue.recv() => match received {
                        Ok(e) => {
                            let evt = e.clone();
                            dispatch_event!(events, &evt);
                            dispatch_event_async!(runtime, events_async, &e);
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "channel listener lagged, events dropped");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        });
    }

    pub(crate) fn shutdown(&self) {
        self.shutdown.shutdown();
    }
}

/// Filtered subscription to a [`Channel`].
#[derive(Clone)]
pub struct ChannelEvent {
    channel: Arc<Channel>,

    glob: (globset::GlobMatcher, globset::GlobMatcher),
}

impl ChannelEvent {
    pub fn channel(
        channel: Arc<Channel>,
        options: ChannelOptions,
    ) -> Result<Self> {
        let compile = |pattern: &str| {
            globset::Glob::new(pattern)
                .map(|g| g.compile_matcher())
                .map_err(|e| AgentflowError::Engine(format!("invalid channel pattern '{}': {}", pattern, e)))
        };

        Ok(Self {
            channel,
            glob: (compile(&options.rid)?, compile(&options.nid)?),
        })
    }

    /// Called with the run id when a run completes successfully.
    pub fn on_complete(
        &self,
        f: impl Fn(RunId) + Send + Sync + 'static,
    ) {
        self.push(move |e| {
            if e.is_complete() {
                f(e.rid.clone());
            }
        });
    }

    /// Called when a run fails.
    pub fn on_error(
        &self,
        f: impl Fn(&RunEvent) + Send + Sync + 'static,
    ) {
        self.push(move |e| {
            if e.is_error() {
                f(e);
            }
        });
    }

    /// Called with the terminal status of every run, whatever its outcome.
    pub fn on_status(
        &self,
        f: impl Fn(&RunId, &StatusEvent) + Send + Sync + 'static,
    ) {
        self.push(move |e| {
            if let Some(status) = e.as_status() {
                f(&e.rid, status);
            }
        });
    }

    /// Called for every update relayed from an executor.
    pub fn on_update(
        &self,
        f: impl Fn(&RunEvent, &UpdateContent) + Send + Sync + 'static,
    ) {
        self.push(move |e| {
            if let Some(content) = e.as_update() {
                f(e, content);
            }
        });
    }

    pub fn on_event(
        &self,
        f: impl Fn(&RunEvent) + Send + Sync + 'static,
    ) {
        self.push(f);
    }

    pub fn on_event_async<F>(
        &self,
        f: F,
    ) where
        F: Fn(&RunEvent) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        let glob = self.glob.clone();

        self.channel.events_async.write().unwrap_or_else(|e| e.into_inner()).push(Arc::new(move |e| {
            if is_match(&glob, e) {
                f(e)
            } else {
                Box::pin(async {})
            }
        }));
    }

    fn push(
        &self,
        f: impl Fn(&RunEvent) + Send + Sync + 'static,
    ) {
        let glob = self.glob.clone();

        self.channel.events.write().unwrap_or_else(|e| e.into_inner()).push(Arc::new(move |e| {
            if is_match(&glob, e) {
                f(e);
            }
        }));
    }
}

/// Run-level events carry an empty executor id; they only have to match the
/// run pattern.
fn is_match(
    glob: &(globset::GlobMatcher, globset::GlobMatcher),
    e: &RunEvent,
) -> bool {
    let (pat_rid, pat_nid) = glob;
    pat_rid.is_match(&e.rid) && (e.nid.is_empty() || pat_nid.is_match(&e.nid))
}

#[cfg(test)]
mod test {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use tokio::runtime::Handle;

    use super::*;
    use crate::{GraphEvent, Payload};

    fn event(
        rid: &str,
        nid: &str,
        sequence: u64,
        event: GraphEvent,
    ) -> RunEvent {
        RunEvent {
            rid: rid.to_string(),
            nid: nid.to_string(),
            sequence,
            event,
        }
    }

    #[tokio::test]
    async fn test_filtered_handlers() {
        let channel = Arc::new(Channel::new(Handle::current(), 16));
        channel.listen();

        let updates = Arc::new(Mutex::new(Vec::new()));
        let completed = Arc::new(Mutex::new(Vec::new()));

        let seen = updates.clone();
        ChannelEvent::channel(channel.clone(), ChannelOptions::new("r1".to_string(), "city_*".to_string()))
            .unwrap()
            .on_update(move |e, content| seen.lock().unwrap().push((e.nid.clone(), content.as_text().unwrap_or_default().to_string())));

        let done = completed.clone();
        ChannelEvent::channel(channel.clone(), ChannelOptions::default()).unwrap().on_complete(move |rid| done.lock().unwrap().push(rid));

        let queue = channel.event_queue();
        queue.send(event("r1", "city_info", 0, GraphEvent::Update(UpdateContent::text("Paris"))));
        queue.send(event("r1", "tourist", 1, GraphEvent::Update(UpdateContent::text("Louvre"))));
        queue.send(event("r2", "city_info", 0, GraphEvent::Update(UpdateContent::text("Rome"))));
        queue.send(event("r1", "", 2, GraphEvent::Status(StatusEvent::completed(Payload::text("Louvre")))));

        tokio::time::sleep(Duration::from_millis(50)).await;
        channel.shutdown();

        assert_eq!(*updates.lock().unwrap(), vec![("city_info".to_string(), "Paris".to_string())]);
        assert_eq!(*completed.lock().unwrap(), vec!["r1".to_string()]);
    }

    #[test]
    fn test_invalid_pattern() {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let channel = Arc::new(Channel::new(runtime.handle().clone(), 4));
        assert!(ChannelEvent::channel(channel, ChannelOptions::with_rid("[".to_string())).is_err());
    }
}
