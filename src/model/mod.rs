mod edge;
mod node;
mod workflow;

pub use edge::{CaseModel, EdgeModel, SwitchModel};
pub use node::ExecutorModel;
pub use workflow::WorkflowModel;
