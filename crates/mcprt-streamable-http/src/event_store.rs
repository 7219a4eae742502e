//! SSE event store (spec §4.5): a fixed-capacity circular buffer per stream
//! plus a hash index from event ID to buffer slot, giving O(1) append and
//! O(k) replay (`k` = number of events to replay) instead of a linear scan
//! over a growing `VecDeque`.
//!
//! Event IDs are assigned as a monotonically increasing decimal counter
//! per stream. When the buffer wraps, the slot being overwritten has its
//! old ID evicted from the index first, so a stale `Last-Event-ID` is
//! detected rather than silently matching the wrong slot.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::sse::SseEvent;

/// One retained event: its assigned ID alongside the payload needed to
/// reconstruct the wire event on replay.
#[derive(Debug, Clone)]
struct Slot {
    id: u64,
    event_type: Option<String>,
    data: String,
}

/// Per-stream circular buffer of recent events, indexed by event ID.
#[derive(Debug)]
struct Stream {
    capacity: usize,
    slots: Vec<Option<Slot>>,
    index: HashMap<u64, usize>,
    head: usize,
    tail: usize,
    len: usize,
    next_event_id: u64,
}

impl Stream {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slots: vec![None; capacity],
            index: HashMap::new(),
            head: 0,
            tail: 0,
            len: 0,
            next_event_id: 1,
        }
    }

    fn append(&mut self, event_type: Option<String>, data: String) -> u64 {
        let id = self.next_event_id;
        self.next_event_id += 1;

        if self.len == self.capacity {
            if let Some(evicted) = self.slots[self.head].take() {
                self.index.remove(&evicted.id);
            }
            self.head = (self.head + 1) % self.capacity;
        } else {
            self.len += 1;
        }

        self.slots[self.tail] = Some(Slot { id, event_type, data });
        self.index.insert(id, self.tail);
        self.tail = (self.tail + 1) % self.capacity;

        id
    }

    /// Events with id strictly greater than `last_event_id`, in ascending
    /// order. If `last_event_id` is still resident, the hash index gives
    /// an O(1) jump straight to its slot and replay walks forward from
    /// there (O(k) in the number of events replayed, per spec §4.5). If
    /// it was evicted (or never existed), replays everything currently
    /// retained — the caller has no way to know what it missed, so the
    /// full window is the best available answer.
    fn replay_from(&self, last_event_id: Option<u64>) -> Vec<(u64, Option<String>, String)> {
        let start = match last_event_id.and_then(|last| self.index.get(&last)) {
            Some(&pos) => (pos + 1) % self.capacity.max(1),
            None => self.head,
        };
        let mut out = Vec::with_capacity(self.len);
        let mut idx = start;
        for _ in 0..self.len {
            if let Some(slot) = &self.slots[idx] {
                let include = match last_event_id {
                    Some(last) => slot.id > last,
                    None => true,
                };
                if include {
                    out.push((slot.id, slot.event_type.clone(), slot.data.clone()));
                }
            }
            idx = (idx + 1) % self.capacity;
        }
        out
    }
}

/// Owns one circular-buffer [`Stream`] per live SSE stream (keyed by
/// session ID, or any other caller-chosen stream key), behind a single
/// mutex.
#[derive(Debug)]
pub struct EventStore {
    capacity: usize,
    streams: Mutex<HashMap<String, Stream>>,
}

impl EventStore {
    pub fn new(capacity_per_stream: usize) -> Self {
        Self {
            capacity: capacity_per_stream.max(1),
            streams: Mutex::new(HashMap::new()),
        }
    }

    /// Append an event to `stream_key`'s buffer (creating it on first use)
    /// and return the decimal event ID assigned to it.
    pub fn append(&self, stream_key: &str, event_type: Option<String>, data: String) -> String {
        let mut streams = self.streams.lock().expect("event store mutex poisoned");
        let stream = streams
            .entry(stream_key.to_string())
            .or_insert_with(|| Stream::new(self.capacity));
        stream.append(event_type, data).to_string()
    }

    /// Replay events after `last_event_id` for `stream_key`, encoded as
    /// ready-to-send [`SseEvent`]s. `last_event_id` is the raw
    /// `Last-Event-ID` header value; a value that doesn't parse as a
    /// decimal ID is treated as "replay everything retained".
    pub fn replay(&self, stream_key: &str, last_event_id: Option<&str>) -> Vec<SseEvent> {
        let streams = self.streams.lock().expect("event store mutex poisoned");
        let Some(stream) = streams.get(stream_key) else {
            return Vec::new();
        };
        let last = last_event_id.and_then(|s| s.parse::<u64>().ok());
        stream
            .replay_from(last)
            .into_iter()
            .map(|(id, event_type, data)| SseEvent {
                id: Some(id.to_string()),
                event: event_type,
                data,
                retry: None,
            })
            .collect()
    }

    /// Drop a stream's retained events entirely (e.g. on session termination).
    pub fn drop_stream(&self, stream_key: &str) {
        self.streams
            .lock()
            .expect("event store mutex poisoned")
            .remove(stream_key);
    }
}
