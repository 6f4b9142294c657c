mod cache;
mod payload;
mod queue;
mod shutdown;

pub use cache::MemCache;
pub use payload::Payload;
pub use queue::{BroadcastQueue, Queue};
pub use shutdown::Shutdown;
