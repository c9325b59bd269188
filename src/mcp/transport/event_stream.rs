//! Server-sent event framing shared by both HTTP transports
//!
//! Bytes are buffered across chunk boundaries and only decoded once a full
//! event block (terminated by a blank line) is available, so multi-byte
//! UTF-8 sequences split between chunks survive intact.
//!
//! SSE field processing:
//!
//! - `data:` -- lines are joined with `\n`; one leading space is stripped.
//! - `event:` -- stored as [`SseEvent::event`]; absent means `message`.
//! - `id:` -- stored as [`SseEvent::id`].
//! - `retry:` -- ignored.
//! - Lines starting with `:` are comments.
//!
//! Blocks with no data, `event: ping` blocks and `data: [PING]` blocks are
//! dropped.

use bytes::Bytes;
use futures::{Stream, StreamExt};

/// One dispatched server-sent event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// Value of the `event:` field, if any.
    pub event: Option<String>,
    /// Joined `data:` lines.
    pub data: String,
    /// Value of the `id:` field, if any.
    pub id: Option<String>,
}

impl SseEvent {
    /// Event type, defaulting to `message` when absent.
    pub fn kind(&self) -> &str {
        self.event.as_deref().unwrap_or("message")
    }

    fn is_ping(&self) -> bool {
        self.kind().eq_ignore_ascii_case("ping") || self.data.eq_ignore_ascii_case("[ping]")
    }
}

/// Parse a single event block (the text between two blank lines).
///
/// Returns `None` when the block dispatches nothing.
///
/// # Examples
///
/// ```
/// use mcp_e2e::mcp::transport::event_stream::parse_event_block;
///
/// let ev = parse_event_block("event: endpoint\ndata: /messages?sessionId=1").unwrap();
/// assert_eq!(ev.kind(), "endpoint");
/// assert_eq!(ev.data, "/messages?sessionId=1");
/// ```
pub fn parse_event_block(block: &str) -> Option<SseEvent> {
    let mut data_lines: Vec<&str> = Vec::new();
    let mut event = SseEvent::default();

    for line in block.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => data_lines.push(value),
            "event" => event.event = Some(value.to_string()),
            "id" => event.id = Some(value.to_string()),
            _ => {}
        }
    }

    if data_lines.is_empty() {
        return None;
    }
    event.data = data_lines.join("\n");

    if event.is_ping() || event.data.is_empty() {
        return None;
    }
    Some(event)
}

/// Incremental decoder turning raw body chunks into [`SseEvent`]s.
#[derive(Debug, Default)]
pub struct EventDecoder {
    buffer: Vec<u8>,
}

impl EventDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every event it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        // CR is dropped so that CRLF framing collapses to LF.
        self.buffer
            .extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut events = Vec::new();
        while let Some(pos) = find_blank_line(&self.buffer) {
            let block: Vec<u8> = self.buffer.drain(..pos + 2).collect();
            let text = String::from_utf8_lossy(&block[..pos]);
            if let Some(event) = parse_event_block(&text) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing block left when the stream ends without a blank line.
    pub fn finish(self) -> Option<SseEvent> {
        if self.buffer.is_empty() {
            return None;
        }
        parse_event_block(&String::from_utf8_lossy(&self.buffer))
    }
}

fn find_blank_line(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

/// Drive `byte_stream` to completion, handing each event to `on_event`.
///
/// Stops early when `on_event` returns `false` or the stream yields an
/// error. Intended to run inside `tokio::spawn`.
pub async fn pump_events<S, F>(byte_stream: S, mut on_event: F)
where
    S: Stream<Item = reqwest::Result<Bytes>>,
    F: FnMut(SseEvent) -> bool,
{
    let mut decoder = EventDecoder::new();
    tokio::pin!(byte_stream);

    while let Some(chunk_result) = byte_stream.next().await {
        let chunk = match chunk_result {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!("SSE stream ended with error: {e}");
                return;
            }
        };
        for event in decoder.feed(&chunk) {
            if !on_event(event) {
                return;
            }
        }
    }

    if let Some(event) = decoder.finish() {
        on_event(event);
    }
}
