//! Incremental Server-Sent Events frame parser. Kept free of any I/O so it
//! can be fed arbitrary byte chunks (as they arrive off the wire) and tested
//! without a running server.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    pub id: Option<String>,
    pub event: Option<String>,
    pub data: String,
    pub retry: Option<u64>,
}

impl SseEvent {
    pub fn is_priming(&self) -> bool {
        self.event.as_deref() == Some("priming")
    }
}

/// Buffers partial lines across chunk boundaries and yields complete events
/// separated by a blank line, per the SSE wire format.
#[derive(Default)]
pub struct SseParser {
    buffer: String,
    pending: SseEvent,
    has_pending_data: bool,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk of bytes, returning every event completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                if self.has_pending_data || self.pending.id.is_some() || self.pending.event.is_some() {
                    events.push(std::mem::take(&mut self.pending));
                    self.has_pending_data = false;
                }
                continue;
            }
            self.apply_field(line);
        }
        events
    }

    fn apply_field(&mut self, line: &str) {
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "id" => self.pending.id = Some(value.to_string()),
            "event" => self.pending.event = Some(value.to_string()),
            "retry" => self.pending.retry = value.parse().ok(),
            "data" => {
                if self.has_pending_data {
                    self.pending.data.push('\n');
                }
                self.pending.data.push_str(value);
                self.has_pending_data = true;
            }
            _ => {}
        }
    }
}
