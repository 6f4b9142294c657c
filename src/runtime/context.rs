use std::{collections::HashMap, sync::Arc};

use crate::{
    Payload,
    common::{MemCache, Shutdown},
    runtime::RunId,
    workflow::node::ExecutorId,
};

const ENV_CACHE_SIZE: usize = 1024;
const VARS_CACHE_SIZE: usize = 1024;

/// Per-run state handed to executors.
///
/// Every invocation receives a copy scoped to the invoked executor (`nid`).
/// All copies of one run share the same environment, scratch variables and
/// termination signal.
#[derive(Clone)]
pub struct Context {
    rid: RunId,
    wid: String,
    nid: ExecutorId,
    env: Arc<MemCache<String, String>>,
    vars: Arc<MemCache<String, Payload>>,

    shutdown: Arc<Shutdown>,
}

impl Context {
    pub fn new(
        rid: RunId,
        wid: String,
        env: &HashMap<String, String>,
    ) -> Self {
        let cache = MemCache::new(ENV_CACHE_SIZE);
        env.iter().for_each(|(k, v)| cache.set(k.clone(), v.clone()));

        Self {
            rid,
            wid,
            nid: ExecutorId::new(),
            env: Arc::new(cache),
            vars: Arc::new(MemCache::new(VARS_CACHE_SIZE)),
            shutdown: Arc::new(Shutdown::new()),
        }
    }

    pub(crate) fn for_executor(
        &self,
        nid: &str,
    ) -> Self {
        Self {
            nid: nid.to_string(),
            ..self.clone()
        }
    }

    pub fn rid(&self) -> &str {
        &self.rid
    }

    pub fn wid(&self) -> &str {
        &self.wid
    }

    /// Id of the executor this context was handed to.
    pub fn nid(&self) -> &str {
        &self.nid
    }

    /// Workflow environment variables.
    pub fn env(&self) -> Arc<MemCache<String, String>> {
        self.env.clone()
    }

    /// Scratch values executors may share within one run.
    pub fn vars(&self) -> Arc<MemCache<String, Payload>> {
        self.vars.clone()
    }

    /// True once the run was cancelled or has finished.
    pub fn is_cancelled(&self) -> bool {
        self.shutdown.is_terminated()
    }

    /// Resolves once the run is cancelled or finished. Executors holding
    /// external resources should select on this and release them.
    pub fn wait_shutdown(&self) -> impl Future<Output = ()> + Send + 'static {
        self.shutdown.wait()
    }

    pub(crate) fn done(&self) {
        self.shutdown.shutdown();
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::Context;

    #[test]
    fn test_for_executor_shares_run_state() {
        let env = HashMap::from([("REGION".to_string(), "ca".to_string())]);
        let ctx = Context::new("r1".to_string(), "w1".to_string(), &env);
        let scoped = ctx.for_executor("city_info");

        assert_eq!(scoped.nid(), "city_info");
        assert_eq!(scoped.rid(), "r1");
        assert_eq!(scoped.env().get(&"REGION".to_string()), Some("ca".to_string()));

        scoped.vars().set("k".to_string(), "v".into());
        assert!(ctx.vars().contains(&"k".to_string()));

        ctx.done();
        assert!(scoped.is_cancelled());
    }
}
