mod bus;
mod channel;
mod context;
mod run;
mod state;

pub(crate) use bus::EventBus;
pub use channel::{Channel, ChannelEvent, ChannelOptions};
pub use context::Context;
pub(crate) use run::write_state;
pub use run::{Run, RunHandle, RunId, RunStream, WorkflowCommand};
pub use state::{RunState, RunStatus};
