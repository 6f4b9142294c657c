//! Two-phase workflow construction.
//!
//! [`WorkflowBuilder`] only records what it is given. All validation
//! happens in [`WorkflowBuilder::build`], which either returns an immutable
//! [`Workflow`] or the first [`BuildError`] found.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use petgraph::{graph::DiGraph, visit::Bfs};
use tracing::warn;

use crate::{
    BuildError, Result, WorkflowModel,
    workflow::{
        ExecutorRegistry, Workflow,
        conditions::Condition,
        edge::{Route, SwitchCase, SwitchGroup},
        executors::Executor,
        node::{ExecutorId, Node, NodeOptions},
    },
};

#[derive(Default)]
pub struct WorkflowBuilder {
    id: String,
    name: String,
    env: HashMap<String, String>,
    start: Option<ExecutorId>,
    executors: Vec<Node>,
    edges: Vec<(ExecutorId, ExecutorId)>,
    switches: Vec<(ExecutorId, Vec<SwitchCase>)>,
}

impl WorkflowBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            ..Default::default()
        }
    }

    pub fn name(
        mut self,
        name: impl Into<String>,
    ) -> Self {
        self.name = name.into();
        self
    }

    pub fn env(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn add_executor(
        self,
        id: impl Into<ExecutorId>,
        executor: impl Executor + 'static,
    ) -> Self {
        self.add_executor_with(id, Arc::new(executor), NodeOptions::default())
    }

    pub fn add_executor_with(
        mut self,
        id: impl Into<ExecutorId>,
        executor: Arc<dyn Executor>,
        options: NodeOptions,
    ) -> Self {
        self.executors.push(Node::new(id.into(), executor, options));
        self
    }

    pub fn set_start_executor(
        mut self,
        id: impl Into<ExecutorId>,
    ) -> Self {
        self.start = Some(id.into());
        self
    }

    /// Adds an unconditional edge.
    pub fn add_edge(
        mut self,
        from: impl Into<ExecutorId>,
        to: impl Into<ExecutorId>,
    ) -> Self {
        self.edges.push((from.into(), to.into()));
        self
    }

    /// Adds a switch group. Cases are evaluated in the given order; the
    /// position of the default among them does not matter.
    pub fn add_switch(
        mut self,
        from: impl Into<ExecutorId>,
        cases: impl IntoIterator<Item = SwitchCase>,
    ) -> Self {
        self.switches.push((from.into(), cases.into_iter().collect()));
        self
    }

    /// Shorthand for a switch group with one case and an optional default.
    pub fn add_condition(
        self,
        from: impl Into<ExecutorId>,
        condition: impl Condition + 'static,
        to: impl Into<ExecutorId>,
        otherwise: Option<&str>,
    ) -> Self {
        let mut cases = vec![SwitchCase::when(condition, to)];
        if let Some(target) = otherwise {
            cases.push(SwitchCase::otherwise(target));
        }
        self.add_switch(from, cases)
    }

    /// Resolves a declarative model. Every `uses` must name a registered
    /// executor and every case condition must be valid.
    pub fn from_model(
        model: &WorkflowModel,
        registry: &ExecutorRegistry,
    ) -> Result<Self> {
        let mut builder = WorkflowBuilder::new(&model.id).set_start_executor(&model.start);
        if !model.name.is_empty() {
            builder = builder.name(&model.name);
        }
        for (key, value) in &model.env {
            builder = builder.env(key, value);
        }

        for executor in &model.executors {
            let mut options = NodeOptions::default();
            if !executor.title.is_empty() {
                options = options.title(&executor.title);
            }
            if let Some(ms) = executor.timeout {
                options = options.timeout(Duration::from_millis(ms));
            }
            builder = builder.add_executor_with(&executor.id, registry.create(&executor.uses, &executor.params)?, options);
        }

        for edge in &model.edges {
            builder = builder.add_edge(&edge.source, &edge.target);
        }

        for switch in &model.switches {
            let mut cases = Vec::with_capacity(switch.cases.len() + 1);
            for case in &switch.cases {
                case.condition.validate()?;
                cases.push(SwitchCase::when(case.condition.clone(), &case.target));
            }
            if let Some(target) = &switch.default {
                cases.push(SwitchCase::otherwise(target));
            }
            builder = builder.add_switch(&switch.source, cases);
        }

        Ok(builder)
    }

    pub fn build(self) -> std::result::Result<Workflow, BuildError> {
        let start = self.start.ok_or(BuildError::MissingStart)?;

        let mut graph = DiGraph::new();
        let mut index = HashMap::new();
        for node in self.executors {
            if index.contains_key(&node.id) {
                return Err(BuildError::DuplicateExecutor(node.id));
            }
            let id = node.id.clone();
            index.insert(id, graph.add_node(node));
        }

        if !index.contains_key(&start) {
            return Err(BuildError::UnknownStart(start));
        }

        let resolve = |from: &ExecutorId, to: &ExecutorId| match (index.get(from), index.get(to)) {
            (Some(a), Some(b)) => Ok((*a, *b)),
            _ => Err(BuildError::UnknownExecutor {
                from: from.clone(),
                to: to.clone(),
            }),
        };

        let mut switches = HashMap::new();
        let mut routed = Vec::new();
        for (from, cases) in &self.switches {
            if switches.contains_key(from) {
                return Err(BuildError::DuplicateSwitch(from.clone()));
            }

            let mut conditions = Vec::new();
            let mut default = None;
            for case in cases {
                match case {
                    SwitchCase::Case {
                        condition,
                        target,
                    } => {
                        routed.push((resolve(from, target)?, Route::Case(conditions.len())));
                        conditions.push(condition.clone());
                    }
                    SwitchCase::Default {
                        target,
                    } => {
                        if default.is_some() {
                            return Err(BuildError::DuplicateDefault(from.clone()));
                        }
                        default = Some(resolve(from, target)?);
                    }
                }
            }
            if let Some(endpoints) = default {
                routed.push((endpoints, Route::Default));
            }
            switches.insert(from.clone(), SwitchGroup::new(conditions, default.is_some()));
        }

        let mut direct = HashSet::new();
        for (from, to) in &self.edges {
            let endpoints = resolve(from, to)?;
            if switches.contains_key(from) {
                warn!(from = %from, to = %to, "switch group takes precedence, unconditional edge ignored");
                continue;
            }
            if !direct.insert(from.clone()) {
                return Err(BuildError::AmbiguousEdge {
                    from: from.clone(),
                });
            }
            routed.push((endpoints, Route::Direct));
        }

        for ((a, b), route) in routed {
            graph.add_edge(a, b, route);
        }

        let mut reachable = HashSet::new();
        let mut bfs = Bfs::new(&graph, index[&start]);
        while let Some(idx) = bfs.next(&graph) {
            reachable.insert(idx);
        }
        let mut unreachable: Vec<ExecutorId> = graph.node_indices().filter(|idx| !reachable.contains(idx)).map(|idx| graph[idx].id.clone()).collect();
        if !unreachable.is_empty() {
            unreachable.sort();
            return Err(BuildError::Unreachable(unreachable));
        }

        Ok(Workflow {
            id: self.id,
            name: self.name,
            env: self.env,
            start,
            graph,
            index,
            switches,
        })
    }
}
