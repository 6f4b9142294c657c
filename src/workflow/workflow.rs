//! Immutable workflow graph.
//!
//! A built workflow holds its executors as nodes of a directed graph (using
//! petgraph) whose edges are labelled with the [`Route`] that produced them.
//! All per-execution state lives in a run, so one workflow can serve many
//! concurrent runs.

use std::{collections::HashMap, sync::Arc};

use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
};
use tokio::runtime::Handle;

use crate::{
    AgentflowError, Payload, Result, RunOptions,
    runtime::{Run, RunHandle},
    workflow::{
        edge::{Route, SwitchGroup},
        node::{ExecutorId, Node},
    },
};

/// Where a run goes after an executor produced its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next<'a> {
    /// Continue with this executor.
    Executor(&'a str),
    /// The executor has no outgoing route; the run completes.
    End,
    /// The switch group matched no case and has no default; the run halts.
    Exhausted,
    /// The switch group selected a route that no edge carries.
    Unrouted(Route),
}

pub struct Workflow {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) env: HashMap<String, String>,
    pub(crate) start: ExecutorId,
    pub(crate) graph: DiGraph<Node, Route>,
    pub(crate) index: HashMap<ExecutorId, NodeIndex>,
    pub(crate) switches: HashMap<ExecutorId, SwitchGroup>,
}

impl Workflow {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn get_node(
        &self,
        id: &str,
    ) -> Option<&Node> {
        self.index.get(id).map(|idx| &self.graph[*idx])
    }

    /// Executor ids in registration order.
    pub fn executor_ids(&self) -> Vec<ExecutorId> {
        self.graph.node_indices().map(|idx| self.graph[idx].id.clone()).collect()
    }

    pub fn switch_group(
        &self,
        id: &str,
    ) -> Option<&SwitchGroup> {
        self.switches.get(id)
    }

    /// True if the executor has no outgoing route.
    pub fn is_end_node(
        &self,
        id: &str,
    ) -> Result<bool> {
        let idx = self.index.get(id).ok_or_else(|| AgentflowError::Runtime(format!("executor {} not found", id)))?;
        Ok(self.graph.edges_directed(*idx, Direction::Outgoing).next().is_none())
    }

    /// Resolves the successor of `id` for `output`.
    ///
    /// A switch group takes precedence over an unconditional edge; the
    /// builder never keeps both.
    pub fn next(
        &self,
        id: &str,
        output: &Payload,
    ) -> Next<'_> {
        let Some(group) = self.switches.get(id) else {
            return self.target(id, Route::Direct).map(Next::Executor).unwrap_or(Next::End);
        };

        match group.select(output) {
            Some(route) => self.target(id, route).map(Next::Executor).unwrap_or(Next::Unrouted(route)),
            None => Next::Exhausted,
        }
    }

    fn target(
        &self,
        id: &str,
        route: Route,
    ) -> Option<&str> {
        let idx = self.index.get(id)?;
        self.graph
            .edges_directed(*idx, Direction::Outgoing)
            .find(|edge| *edge.weight() == route)
            .map(|edge| self.graph[edge.target()].id.as_str())
    }

    /// Starts a run on the current tokio runtime.
    pub fn run_stream(
        self: &Arc<Self>,
        input: impl Into<Payload>,
    ) -> Result<RunHandle> {
        self.run_stream_with(input, RunOptions::default())
    }

    pub fn run_stream_with(
        self: &Arc<Self>,
        input: impl Into<Payload>,
        options: RunOptions,
    ) -> Result<RunHandle> {
        let runtime = Handle::try_current().map_err(|e| AgentflowError::Runtime(format!("no tokio runtime available: {}", e)))?;
        Run::new(self.clone(), options, None).start(&runtime, input.into())
    }

    /// Human-readable representation of the workflow graph.
    pub fn schema(&self) -> String {
        let graph = &self.graph;
        let mut lines = Vec::new();

        lines.push(format!("=== Workflow {} ({}) ===", self.name, self.id));
        lines.push(format!("Executors: {}, Edges: {}, Start: {}", graph.node_count(), graph.edge_count(), self.start));
        lines.push(String::new());

        lines.push("--- Executors ---".to_string());
        for idx in graph.node_indices() {
            let node = &graph[idx];
            let timeout = node.timeout.map(|t| format!("{}ms", t.as_millis())).unwrap_or_else(|| "none".to_string());
            lines.push(format!("[{}] {} (timeout: {})", node.id, node.title, timeout));
        }
        lines.push(String::new());

        lines.push("--- Edges ---".to_string());
        for edge in graph.edge_references() {
            lines.push(format!("{} --[{}]--> {}", graph[edge.source()].id, edge.weight(), graph[edge.target()].id));
        }
        lines.push(String::new());

        lines.push("--- Graph Structure ---".to_string());
        for idx in graph.node_indices() {
            let node = &graph[idx];
            let mut outgoing: Vec<(Route, &str)> =
                graph.edges_directed(idx, Direction::Outgoing).map(|e| (*e.weight(), graph[e.target()].id.as_str())).collect();
            outgoing.sort_by_key(|(route, _)| route_order(*route));

            if outgoing.is_empty() {
                lines.push(format!("{} -> (end)", node.id));
            } else {
                let targets: Vec<String> = outgoing.iter().map(|(route, target)| format!("{}({})", target, route)).collect();
                let prefix = if self.switches.contains_key(&node.id) { "switch " } else { "" };
                lines.push(format!("{} -> {}{}", node.id, prefix, targets.join(", ")));
            }
        }

        lines.join("\n")
    }

    /// Graphviz rendering of the workflow. Conditional edges are dashed and
    /// the start executor is drawn with a double border.
    pub fn to_dot(&self) -> String {
        let graph = &self.graph;
        let mut out = String::from("digraph workflow {\n    rankdir=LR;\n");

        for idx in graph.node_indices() {
            let node = &graph[idx];
            let shape = if node.id == self.start { "doublecircle" } else { "box" };
            out.push_str(&format!("    \"{}\" [label=\"{}\", shape={}];\n", escape(&node.id), escape(&node.title), shape));
        }
        for edge in graph.edge_references() {
            let style = match edge.weight() {
                Route::Direct => "solid",
                Route::Case(_) | Route::Default => "dashed",
            };
            out.push_str(&format!(
                "    \"{}\" -> \"{}\" [label=\"{}\", style={}];\n",
                escape(&graph[edge.source()].id),
                escape(&graph[edge.target()].id),
                edge.weight(),
                style
            ));
        }

        out.push_str("}\n");
        out
    }
}

fn route_order(route: Route) -> usize {
    match route {
        Route::Direct => 0,
        Route::Case(i) => i,
        Route::Default => usize::MAX,
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use crate::{
        Payload, RunStatus, SwitchCase, WorkflowBuilder,
        workflow::{Next, edge::Route, executors::executor_fn},
    };

    #[tokio::test]
    async fn test_missing_switch_edge_fails_run() {
        let echo = || executor_fn(|_, input| async move { Ok(input) });
        let mut workflow = WorkflowBuilder::new("switch")
            .add_executor("city", echo())
            .add_executor("hockey", echo())
            .add_executor("tourist", echo())
            .add_switch("city", [SwitchCase::when(|p: &Payload| p.as_str() == Some("Canada"), "hockey"), SwitchCase::otherwise("tourist")])
            .set_start_executor("city")
            .build()
            .unwrap();
        workflow.graph.clear_edges();

        assert_eq!(workflow.next("city", &Payload::text("Canada")), Next::Unrouted(Route::Case(0)));
        assert_eq!(workflow.next("city", &Payload::text("France")), Next::Unrouted(Route::Default));
        assert_eq!(workflow.next("hockey", &Payload::null()), Next::End);

        let status = Arc::new(workflow).run_stream("Canada").unwrap().wait().await;
        assert_eq!(status.status, RunStatus::Failed);
        assert!(status.error.unwrap().contains("no edge for case 0"));
    }
}
