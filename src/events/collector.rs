use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;

use crate::{
    Payload, Result,
    events::{GraphEvent, NodeEvent, RunEvent, StatusEvent, UpdateContent},
    workflow::node::ExecutorId,
};

/// Joins the streamed text of a run into one response per executor turn.
///
/// Consecutive text updates from the same invocation form one response; a
/// new response starts whenever an executor starts running or another
/// executor takes over.
#[derive(Debug, Clone, Default)]
pub struct ResponseCollector {
    responses: Vec<(ExecutorId, String)>,
    status: Option<StatusEvent>,
    turn_started: bool,
}

impl ResponseCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains `events` and collects them.
    pub async fn collect<S>(events: S) -> Self
    where
        S: Stream<Item = RunEvent> + Unpin,
    {
        let mut collector = Self::new();
        let mut events = events;
        while let Some(event) = events.next().await {
            collector.push(&event);
        }
        collector
    }

    pub fn push(
        &mut self,
        event: &RunEvent,
    ) {
        match &event.event {
            GraphEvent::Update(UpdateContent::Text {
                text,
            }) => match self.responses.last_mut() {
                Some((nid, response)) if !self.turn_started && *nid == event.nid => response.push_str(text),
                _ => {
                    self.responses.push((event.nid.clone(), text.clone()));
                    self.turn_started = false;
                }
            },
            GraphEvent::Node(NodeEvent::Running(_)) => self.turn_started = true,
            GraphEvent::Status(status) => self.status = Some(status.clone()),
            _ => {}
        }
    }

    /// Responses in the order they were produced.
    pub fn responses(&self) -> &[(ExecutorId, String)] {
        &self.responses
    }

    /// The last response produced by `nid`.
    pub fn response(
        &self,
        nid: &str,
    ) -> Option<&str> {
        self.responses.iter().rev().find(|(id, _)| id == nid).map(|(_, text)| text.as_str())
    }

    /// Parses the last response of `nid` as structured output.
    pub fn parse<T: DeserializeOwned>(
        &self,
        nid: &str,
    ) -> Option<Result<T>> {
        self.response(nid).map(|text| Payload::text(text).parse::<T>())
    }

    pub fn status(&self) -> Option<&StatusEvent> {
        self.status.as_ref()
    }
}

#[cfg(test)]
mod test {
    use futures::stream;
    use serde::Deserialize;

    use super::*;

    fn update(
        seq: u64,
        nid: &str,
        text: &str,
    ) -> RunEvent {
        RunEvent {
            rid: "r1".to_string(),
            nid: nid.to_string(),
            sequence: seq,
            event: GraphEvent::Update(UpdateContent::text(text)),
        }
    }

    #[derive(Deserialize)]
    struct CityInfo {
        name: String,
    }

    #[tokio::test]
    async fn test_collect_groups_by_turn() {
        let events = vec![
            update(0, "city_info", "{\"name\":"),
            update(1, "city_info", "\"Toronto\"}"),
            update(2, "tourist", "Visit "),
            update(3, "tourist", "the CN Tower"),
            RunEvent {
                rid: "r1".to_string(),
                nid: String::new(),
                sequence: 4,
                event: GraphEvent::Status(StatusEvent::completed(Payload::text("done"))),
            },
        ];

        let collector = ResponseCollector::collect(stream::iter(events)).await;
        assert_eq!(collector.responses().len(), 2);
        assert_eq!(collector.response("tourist"), Some("Visit the CN Tower"));
        assert_eq!(collector.parse::<CityInfo>("city_info").unwrap().unwrap().name, "Toronto");
        assert!(collector.parse::<CityInfo>("missing").is_none());
        assert!(collector.status().is_some());
    }

    #[test]
    fn test_self_loop_splits_turns() {
        let running = |seq: u64| RunEvent {
            rid: "r1".to_string(),
            nid: "tick".to_string(),
            sequence: seq,
            event: GraphEvent::Node(NodeEvent::Running(0)),
        };

        let mut collector = ResponseCollector::new();
        for event in [running(0), update(1, "tick", "one"), update(2, "tick", "-a"), running(3), update(4, "tick", "two")] {
            collector.push(&event);
        }

        let responses: Vec<&str> = collector.responses().iter().map(|(_, text)| text.as_str()).collect();
        assert_eq!(responses, vec!["one-a", "two"]);
        assert_eq!(collector.response("tick"), Some("two"));
    }
}
