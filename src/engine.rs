//! Workflow engine - the embedding entry point for Agentflow.
//!
//! The engine manages deployed workflows and the runs started from them:
//! - Deploying built or declarative workflows
//! - Starting runs and routing approval decisions and stop requests to them
//! - Broadcasting every run event on one channel
//! - Graceful shutdown coordination

mod monitor;

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::runtime::{Handle, Runtime};
use tracing::{debug, info};

use crate::{
    AgentflowError, ChannelEvent, ChannelOptions, Config, Payload, Result, RunOptions,
    common::{MemCache, Queue, Shutdown},
    model::WorkflowModel,
    runtime::{Channel, Run, RunHandle, RunId},
    workflow::{ExecutorRegistry, Workflow},
};

use monitor::Monitor;

/// Maximum number of deployed workflows kept by the engine.
const WORKFLOW_CACHE_SIZE: usize = 1024;
/// Size of the queue for finished run notifications.
const RUN_COMPLETE_QUEUE_SIZE: usize = 100;

/// The main workflow engine.
///
/// # Example
///
/// ```rust,ignore
/// let engine = EngineBuilder::new().build()?;
/// engine.launch();
///
/// engine.deploy(workflow);
/// let mut run = engine.run("city_tour", "Toronto")?;
/// while let Some(event) = run.next().await {
///     println!("{:?}", event);
/// }
///
/// engine.shutdown();
/// ```
pub struct Engine {
    /// Event channel every run publishes to.
    channel: Arc<Channel>,
    /// Logs channel traffic.
    monitor: Monitor,
    /// Runs whose terminal status was observed on the channel.
    runs_complete_queue: Arc<Queue<RunId>>,
    /// Live runs by id.
    runs: Arc<MemCache<RunId, Arc<Run>>>,
    /// Deployed workflows by id.
    workflows: Arc<MemCache<String, Arc<Workflow>>>,
    /// Defaults for every run started by the engine.
    options: RunOptions,

    running: Arc<AtomicBool>,
    /// Owned runtime, if the engine created one.
    _runtime: Option<Arc<Runtime>>,
    handle: Handle,
    shutdown: Arc<Shutdown>,
}

impl Engine {
    pub(crate) fn new(
        config: Config,
        runtime: Option<Arc<Runtime>>,
        handle: Handle,
    ) -> Self {
        let channel = Arc::new(Channel::new(handle.clone(), config.channel.event_queue_size));
        let shutdown = Arc::new(Shutdown::new());
        let monitor = Monitor::new(channel.clone(), handle.clone(), shutdown.clone());

        Self {
            channel,
            monitor,
            runs_complete_queue: Queue::new(RUN_COMPLETE_QUEUE_SIZE),
            runs: Arc::new(MemCache::new(config.run_cache_size)),
            workflows: Arc::new(MemCache::new(WORKFLOW_CACHE_SIZE)),
            options: config.run,
            running: Arc::new(AtomicBool::new(false)),
            _runtime: runtime,
            handle,
            shutdown,
        }
    }

    /// Creates an engine that owns a runtime configured by `config`.
    pub fn new_with_config(config: Config) -> Result<Self> {
        crate::EngineBuilder::from_config(config).build()
    }

    /// Starts listening on the channel and evicting finished runs.
    pub fn launch(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        // register handlers before listening so no event is missed
        self.monitor.monitor();

        let runs_complete_queue = self.runs_complete_queue.clone();
        ChannelEvent::channel(self.channel.clone(), ChannelOptions::default())?.on_status(move |rid, _| {
            let _ = runs_complete_queue.send(rid.clone());
        });
        self.channel.listen();

        let runs_complete_queue = self.runs_complete_queue.clone();
        let shutdown = self.shutdown.wait();
        let runs = self.runs.clone();
        self.handle.spawn(async move {
            tokio::pin!(shutdown);
            loop {
                tokio::select! {
                    _ = &mut shutdown => break,
                    Some(rid) = runs_complete_queue.next_async() => {
                        debug!(rid = %rid, "evicting finished run");
                        runs.remove(&rid);
                    }
                }
            }
        });

        info!("engine launched");
        Ok(())
    }

    /// Cancels every live run and stops the channel.
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        for (_, run) in self.runs.iter() {
            run.cancel();
        }
        self.shutdown.shutdown();
        self.channel.shutdown();
        info!("engine shut down");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Deploys a built workflow under its id. Returns true if it replaced a
    /// previous deployment; runs already started keep the old graph.
    pub fn deploy(
        &self,
        workflow: impl Into<Arc<Workflow>>,
    ) -> bool {
        let workflow = workflow.into();
        let wid = workflow.id().to_string();
        let replaced = self.workflows.take(&wid).is_some();
        info!(wid = %wid, replaced, "workflow deployed");
        self.workflows.set(wid, workflow);
        replaced
    }

    /// Resolves and deploys a declarative workflow.
    pub fn deploy_model(
        &self,
        model: &WorkflowModel,
        registry: &ExecutorRegistry,
    ) -> Result<bool> {
        Ok(self.deploy(model.build(registry)?))
    }

    pub fn workflow(
        &self,
        wid: &str,
    ) -> Option<Arc<Workflow>> {
        self.workflows.get(&wid.to_string())
    }

    /// Starts a run of a deployed workflow with the engine's run options.
    pub fn run(
        &self,
        wid: &str,
        input: impl Into<Payload>,
    ) -> Result<RunHandle> {
        self.run_with(wid, input, self.options.clone())
    }

    pub fn run_with(
        &self,
        wid: &str,
        input: impl Into<Payload>,
        options: RunOptions,
    ) -> Result<RunHandle> {
        if !self.is_running() {
            return Err(AgentflowError::Engine("engine is not running".to_string()));
        }
        let workflow = self.workflow(wid).ok_or_else(|| AgentflowError::Engine(format!("workflow {} is not deployed", wid)))?;

        let run = Run::new(workflow, options, Some(self.channel.clone()));
        self.runs.set(run.id().to_string(), run.clone());

        match run.start(&self.handle, input.into()) {
            Ok(handle) => Ok(handle),
            Err(err) => {
                self.runs.remove(&run.id().to_string());
                Err(err)
            }
        }
    }

    /// Starts a run whose events are only observed through the channel.
    pub fn spawn(
        &self,
        wid: &str,
        input: impl Into<Payload>,
    ) -> Result<RunId> {
        let handle = self.run(wid, input)?;
        let rid = handle.id().to_string();
        self.handle.spawn(async move {
            handle.wait().await;
        });
        Ok(rid)
    }

    /// Cancels a live run.
    pub fn stop(
        &self,
        rid: &str,
    ) -> Result<()> {
        self.live_run(rid)?.cancel();
        Ok(())
    }

    /// Answers the pending approval request of a live run.
    pub fn approve(
        &self,
        rid: &str,
        token: &str,
        approved: bool,
    ) -> Result<()> {
        self.live_run(rid)?.approve(token, approved)
    }

    pub fn get_run(
        &self,
        rid: &str,
    ) -> Option<Arc<Run>> {
        self.runs.get(&rid.to_string())
    }

    pub fn run_options(&self) -> &RunOptions {
        &self.options
    }

    /// Returns a reference to the event channel.
    pub fn channel(&self) -> Arc<Channel> {
        self.channel.clone()
    }

    fn live_run(
        &self,
        rid: &str,
    ) -> Result<Arc<Run>> {
        self.get_run(rid).ok_or_else(|| AgentflowError::Run(format!("run {} not found", rid)))
    }
}
