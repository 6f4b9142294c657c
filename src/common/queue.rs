//! Queues carrying run commands (flume) and engine-wide events (tokio
//! broadcast).

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::{AgentflowError, Result};

/// Bounded MPMC queue. Each message is consumed by exactly one receiver.
#[derive(Clone)]
pub struct Queue<T> {
    receiver: flume::Receiver<T>,
    sender: flume::Sender<T>,
}

impl<T> Queue<T> {
    pub fn new(cap: usize) -> Arc<Self> {
        let (tx, rx) = flume::bounded(cap);

        Arc::new(Self {
            receiver: rx,
            sender: tx,
        })
    }

    /// Enqueues without waiting; fails when the queue is full.
    pub fn send(
        &self,
        msg: T,
    ) -> Result<()> {
        self.sender.try_send(msg).map_err(|e| AgentflowError::Queue(e.to_string()))
    }

    pub async fn next_async(&self) -> Option<T> {
        self.receiver.recv_async().await.ok()
    }

    /// Drops every message currently queued, returning how many were discarded.
    pub fn drain(&self) -> usize {
        self.receiver.drain().count()
    }
}

/// One-to-many queue. Every subscriber receives every message sent after it
/// subscribed; slow subscribers lag and lose the oldest messages.
#[derive(Clone)]
pub struct BroadcastQueue<T> {
    sender: broadcast::Sender<T>,
}

impl<T: Clone> BroadcastQueue<T> {
    pub fn new(cap: usize) -> Arc<Self> {
        let (tx, _) = broadcast::channel(cap);

        Arc::new(Self {
            sender: tx,
        })
    }

    /// Publishes a message, returning the number of subscribers reached.
    /// Having no subscribers is not an error.
    pub fn send(
        &self,
        msg: T,
    ) -> usize {
        self.sender.send(msg).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_queue_roundtrip_and_drain() {
        let queue = Queue::new(4);
        queue.send(1).unwrap();
        queue.send(2).unwrap();
        assert_eq!(queue.next_async().await, Some(1));
        assert_eq!(queue.drain(), 1);
    }

    #[test]
    fn test_queue_rejects_when_full() {
        let queue = Queue::new(1);
        queue.send(1).unwrap();
        assert!(queue.send(2).is_err());
    }

    #[tokio::test]
    async fn test_broadcast_without_subscribers() {
        let queue = BroadcastQueue::new(4);
        assert_eq!(queue.send("x"), 0);
        let mut rx = queue.subscribe();
        assert_eq!(queue.send("y"), 1);
        assert_eq!(rx.recv().await.unwrap(), "y");
    }
}
