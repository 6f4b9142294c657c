//! # Agentflow
//!
//! Agentflow is an embeddable engine that runs directed graphs of
//! asynchronous executors, such as LLM-backed agents, and relays their
//! progress as one ordered event stream.
//!
//! ## Core Features
//!
//! - **Streaming Executors**: Executors yield incremental updates before their final output
//! - **Conditional Routing**: Unconditional edges or ordered switch groups with a default
//! - **Human in the Loop**: Runs suspend on approval requests until the caller decides
//! - **Composable**: A workflow can be wrapped as an executor of another workflow
//! - **Embeddable Engine**: Deploy workflows, start runs and subscribe to every event on one channel
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use agentflow::{WorkflowBuilder, executor_fn};
//!
//! let workflow = Arc::new(
//!     WorkflowBuilder::new("city_tour")
//!         .add_executor("city_info", city_info)
//!         .add_executor("tourist", tourist)
//!         .add_edge("city_info", "tourist")
//!         .set_start_executor("city_info")
//!         .build()?,
//! );
//!
//! let mut run = workflow.run_stream("You are at the CN Tower.")?;
//! while let Some(event) = run.next().await {
//!     println!("{:?}", event);
//! }
//! ```

mod builder;
mod common;
mod config;
mod dispatcher;
mod engine;
mod error;
mod events;
mod model;
mod runtime;
mod utils;
mod workflow;

use std::sync::{Arc, RwLock};

pub use builder::EngineBuilder;
pub use common::{MemCache, Payload};
pub use config::{ChannelConfig, Config, RunOptions};
pub use engine::Engine;
pub use error::{AgentflowError, BuildError};
pub use events::*;
pub use model::*;
pub use runtime::{Channel, ChannelEvent, ChannelOptions, Context, Run, RunHandle, RunId, RunState, RunStatus, RunStream};
pub use workflow::{
    ExecutorRegistry, Next, Workflow, WorkflowBuilder,
    conditions::{Comparison, ComparisonOperator, Condition, ConditionValue, FieldCondition, LogicalOperator, SchemaCondition, StructuredCondition},
    edge::{Route, SwitchCase, SwitchGroup},
    executors::{Executor, ExecutorEvent, ExecutorStream, FnExecutor, StreamExecutor, WorkflowExecutor, executor_fn, stream_fn},
    node::{ExecutorId, Node, NodeOptions},
};

/// Result type alias for Agentflow operations.
pub type Result<T> = std::result::Result<T, AgentflowError>;

/// Thread-safe shared lock wrapper using Arc<RwLock<T>>.
pub(crate) type ShareLock<T> = Arc<RwLock<T>>;
