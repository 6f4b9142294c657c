mod builder;
pub mod conditions;
pub mod edge;
pub mod executors;
pub mod node;
mod registry;
mod workflow;

pub use builder::WorkflowBuilder;
pub use registry::ExecutorRegistry;
pub use workflow::{Next, Workflow};
