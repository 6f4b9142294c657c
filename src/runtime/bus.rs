use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::sync::mpsc;

use crate::{
    AgentflowError, Result,
    events::{GraphEvent, RunEvent},
    runtime::{Channel, RunId},
};

/// Serializes the events of one run onto its stream.
///
/// The scheduler is the only producer and only one executor is active at a
/// time, so events leave the bus in exactly the order they were published.
/// Each event is stamped with the next sequence number and mirrored onto
/// the engine channel when the run has one.
pub(crate) struct EventBus {
    rid: RunId,
    sequence: AtomicU64,
    tx: mpsc::Sender<RunEvent>,
    channel: Option<Arc<Channel>>,
}

impl EventBus {
    pub(crate) fn new(
        rid: RunId,
        tx: mpsc::Sender<RunEvent>,
        channel: Option<Arc<Channel>>,
    ) -> Self {
        Self {
            rid,
            sequence: AtomicU64::new(0),
            tx,
            channel,
        }
    }

    /// Waits for room on the run stream. Fails with `Cancelled` once the
    /// consumer has dropped the stream.
    pub(crate) async fn publish(
        &self,
        nid: &str,
        event: GraphEvent,
    ) -> Result<()> {
        let message = RunEvent {
            rid: self.rid.clone(),
            nid: nid.to_string(),
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
            event,
        };

        if let Some(channel) = &self.channel {
            channel.event_queue().send(message.clone());
        }

        self.tx.send(message).await.map_err(|_| AgentflowError::Cancelled("event stream was dropped".to_string()))
    }
}

#[cfg(test)]
mod test {
    use tokio::sync::mpsc;

    use super::EventBus;
    use crate::{GraphEvent, UpdateContent};

    #[tokio::test]
    async fn test_publish_stamps_sequence() {
        let (tx, mut rx) = mpsc::channel(4);
        let bus = EventBus::new("r1".to_string(), tx, None);

        bus.publish("a", GraphEvent::Update(UpdateContent::text("x"))).await.unwrap();
        bus.publish("b", GraphEvent::Update(UpdateContent::text("y"))).await.unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!((first.nid.as_str(), first.sequence), ("a", 0));
        assert_eq!((second.nid.as_str(), second.sequence), ("b", 1));

        drop(rx);
        let err = bus.publish("a", GraphEvent::Update(UpdateContent::text("z"))).await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
