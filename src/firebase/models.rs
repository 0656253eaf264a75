//! Firebase REST streaming protocol.
//!
//! The stream is Server-Sent Events where every `put` / `patch` carries a JSON
//! body `{"path": "/7/sensorData", "data": ...}` relative to the subscribed
//! location.

use serde::Deserialize;
use serde_json::Value;

/// Body of a `put` or `patch` event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PathUpdate {
    pub path: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Replace the value at `path`.
    Put(PathUpdate),
    /// Merge the children of `data` into `path`.
    Patch(PathUpdate),
    KeepAlive,
    /// The server closed the subscription, usually on a rules change.
    Cancel(String),
    /// The auth token expired; the stream must be reopened.
    AuthRevoked,
    Malformed { event: String, error: String },
    Unknown(String),
    /// A line or event grew past the decoder limit. The decoder state was
    /// dropped and the stream should be reopened.
    Overflow,
}

impl ServerEvent {
    fn parse(event: &str, data: &str) -> Self {
        match event {
            "put" | "patch" => match serde_json::from_str::<PathUpdate>(data) {
                Ok(update) if event == "put" => Self::Put(update),
                Ok(update) => Self::Patch(update),
                Err(e) => Self::Malformed {
                    event: event.to_string(),
                    error: e.to_string(),
                },
            },
            "keep-alive" => Self::KeepAlive,
            "cancel" => Self::Cancel(
                serde_json::from_str::<String>(data).unwrap_or_else(|_| data.to_string()),
            ),
            "auth_revoked" => Self::AuthRevoked,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Largest pending line or event body. The initial snapshot of the whole
/// subtree arrives as a single `data:` line.
pub const MAX_EVENT_BYTES: usize = 32 * 1024 * 1024;

/// Incremental SSE decoder. Chunks may split lines anywhere.
#[derive(Debug)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: String,
    max_event_bytes: usize,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_limit(MAX_EVENT_BYTES)
    }
}

impl SseDecoder {
    #[must_use]
    pub fn with_limit(max_event_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            event: None,
            data: String::new(),
            max_event_bytes,
        }
    }

    /// Feed raw bytes, returning every event completed by this chunk.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<ServerEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(event) = self.dispatch() {
                    events.push(event);
                }
                continue;
            }

            // Comment line
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };

            match field {
                "event" => self.event = Some(value.to_string()),
                "data" => {
                    if !self.data.is_empty() {
                        self.data.push('\n');
                    }
                    self.data.push_str(value);
                }
                _ => {}
            }

            if self.data.len() > self.max_event_bytes {
                self.reset();
                events.push(ServerEvent::Overflow);
                return events;
            }
        }

        if self.buffer.len() > self.max_event_bytes {
            self.reset();
            events.push(ServerEvent::Overflow);
        }

        events
    }

    fn reset(&mut self) {
        self.buffer = Vec::new();
        self.event = None;
        self.data.clear();
    }

    fn dispatch(&mut self) -> Option<ServerEvent> {
        let data = std::mem::take(&mut self.data);
        let event = self.event.take()?;
        Some(ServerEvent::parse(&event, &data))
    }
}
