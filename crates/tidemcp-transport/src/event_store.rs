//! Per-stream bounded event log used by server-side streaming transports to
//! support client reconnection via `Last-Event-Id`.
//!
//! Generalized from a single ring-buffer-per-HTTP-session design into a
//! multi-stream store keyed by `streamId`, with an authoritative index and
//! strict errors on replay of an unknown event id.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use tidemcp_transport_traits::TransportError;

/// `{streamId}_{monotonic}_{random}` — the stream id is recoverable by
/// parsing the prefix before the first `_`, but the index is authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub event_id: String,
    pub stream_id: String,
    pub payload: Vec<u8>,
    pub created_at: std::time::Instant,
}

impl Event {
    /// Empty-payload events are priming markers, skipped during replay.
    pub fn is_priming(&self) -> bool {
        self.payload.is_empty()
    }
}

struct Stream {
    events: VecDeque<Event>,
    sequence: u64,
    max_events: usize,
}

impl Stream {
    fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::new(),
            sequence: 0,
            max_events,
        }
    }

    fn push(&mut self, stream_id: &str, payload: Vec<u8>) -> Event {
        self.sequence += 1;
        let event_id = format!("{stream_id}_{}_{}", self.sequence, fastrand::u32(..));
        let event = Event {
            event_id,
            stream_id: stream_id.to_string(),
            payload,
            created_at: std::time::Instant::now(),
        };
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event.clone());
        event
    }
}

/// Thread-safe under concurrent store/replay — every operation takes the
/// single lock for the span of the mutation only, never across I/O.
pub struct EventStore {
    streams: Mutex<HashMap<String, Stream>>,
    /// event id -> stream id, so `streamIdForEventId` does not need to scan.
    index: Mutex<HashMap<String, String>>,
    default_max_events: usize,
}

impl EventStore {
    pub fn new(default_max_events_per_stream: usize) -> Self {
        Self {
            streams: Mutex::new(HashMap::new()),
            index: Mutex::new(HashMap::new()),
            default_max_events: default_max_events_per_stream,
        }
    }

    /// Appends `payload` to `stream_id`, evicting the oldest event (and its
    /// index entry) if the stream is already at `maxEventsPerStream`.
    pub fn store_event(&self, stream_id: &str, payload: Vec<u8>) -> String {
        let mut streams = self.streams.lock();
        let stream = streams
            .entry(stream_id.to_string())
            .or_insert_with(|| Stream::new(self.default_max_events));

        let evicted = if stream.events.len() >= stream.max_events {
            stream.events.front().map(|e| e.event_id.clone())
        } else {
            None
        };
        let event = stream.push(stream_id, payload);
        drop(streams);

        let mut index = self.index.lock();
        if let Some(evicted) = evicted {
            index.remove(&evicted);
        }
        index.insert(event.event_id.clone(), stream_id.to_string());
        event.event_id
    }

    /// Appends an empty-payload priming marker, returning its id so the
    /// transport can hand it to the client as a resumption point before
    /// any real event has been produced.
    pub fn store_priming_event(&self, stream_id: &str) -> String {
        self.store_event(stream_id, Vec::new())
    }

    pub fn stream_id_for_event_id(&self, event_id: &str) -> Option<String> {
        if let Some(stream_id) = self.index.lock().get(event_id) {
            return Some(stream_id.clone());
        }
        event_id.split_once('_').map(|(prefix, _)| prefix.to_string())
    }

    /// Emits every event strictly after `event_id`, in order, skipping
    /// priming markers. Errors if `event_id` is unknown to this store.
    pub fn replay_events_after(
        &self,
        event_id: &str,
        mut emit: impl FnMut(&Event),
    ) -> Result<(), TransportError> {
        let Some(stream_id) = self.stream_id_for_event_id(event_id) else {
            return Err(TransportError::ProtocolError(format!("unknown event id: {event_id}")));
        };
        let streams = self.streams.lock();
        let Some(stream) = streams.get(&stream_id) else {
            return Err(TransportError::ProtocolError(format!("unknown event id: {event_id}")));
        };
        let position = stream.events.iter().position(|e| e.event_id == event_id);
        let Some(position) = position else {
            return Err(TransportError::ProtocolError(format!("unknown event id: {event_id}")));
        };
        for event in stream.events.iter().skip(position + 1) {
            if !event.is_priming() {
                emit(event);
            }
        }
        Ok(())
    }

    pub fn remove_events(&self, stream_id: &str) {
        self.streams.lock().remove(stream_id);
        self.index.lock().retain(|_, v| v != stream_id);
    }

    pub fn clean_up(&self, older_than: std::time::Duration) {
        let now = std::time::Instant::now();
        let mut removed_ids = Vec::new();
        {
            let mut streams = self.streams.lock();
            for stream in streams.values_mut() {
                while let Some(front) = stream.events.front() {
                    if now.duration_since(front.created_at) > older_than {
                        removed_ids.push(stream.events.pop_front().unwrap().event_id);
                    } else {
                        break;
                    }
                }
            }
        }
        let mut index = self.index.lock();
        for id in removed_ids {
            index.remove(&id);
        }
    }

    pub fn clear(&self) {
        self.streams.lock().clear();
        self.index.lock().clear();
    }

    pub fn event_count(&self) -> usize {
        self.streams.lock().values().map(|s| s.events.len()).sum()
    }

    pub fn stream_count(&self) -> usize {
        self.streams.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replay_emits_only_strictly_later_events() {
        let store = EventStore::new(100);
        let e1 = store.store_event("s", b"one".to_vec());
        let e2 = store.store_event("s", b"two".to_vec());
        let _e3 = store.store_event("s", b"three".to_vec());

        let mut seen = Vec::new();
        store.replay_events_after(&e1, |e| seen.push(e.event_id.clone())).unwrap();
        assert_eq!(seen, vec![e2.clone()]);

        assert!(!seen.contains(&e1));

        let mut seen2 = Vec::new();
        store.replay_events_after(&e2, |e| seen2.push(e.event_id.clone())).unwrap();
        assert!(!seen2.contains(&e1) && !seen2.contains(&e2));
    }

    #[test]
    fn replay_of_unknown_id_errors() {
        let store = EventStore::new(10);
        store.store_event("s", b"one".to_vec());
        let result = store.replay_events_after("bogus_1_2", |_| {});
        assert!(result.is_err());
    }

    #[test]
    fn eviction_at_max_events_per_stream_is_fifo_and_errors_on_evicted_ids() {
        let store = EventStore::new(5);
        let mut ids = Vec::new();
        for i in 0..7 {
            ids.push(store.store_event("s", vec![i]));
        }
        assert_eq!(store.event_count(), 5);
        assert!(store.replay_events_after(&ids[0], |_| {}).is_err());
        assert!(store.replay_events_after(&ids[1], |_| {}).is_err());

        let mut seen = Vec::new();
        store.replay_events_after(&ids[2], |e| seen.push(e.event_id.clone())).unwrap();
        assert_eq!(seen, ids[3..7].to_vec());
    }

    #[test]
    fn priming_events_are_skipped_during_replay() {
        let store = EventStore::new(10);
        let priming = store.store_priming_event("s");
        let real = store.store_event("s", b"payload".to_vec());

        let mut seen = Vec::new();
        store.replay_events_after(&priming, |e| seen.push(e.event_id.clone())).unwrap();
        assert_eq!(seen, vec![real]);
    }

    #[test]
    fn stream_id_for_event_id_falls_back_to_prefix_parsing() {
        let store = EventStore::new(10);
        assert_eq!(store.stream_id_for_event_id("mystream_3_1234"), Some("mystream".to_string()));
    }

    #[test]
    fn event_ids_are_unique_and_strictly_ordered_per_stream() {
        let store = EventStore::new(100);
        let ids: Vec<_> = (0..20).map(|i| store.store_event("s", vec![i])).collect();
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }
}
