//! Server-Sent Events decoding for streamed completions
//!
//! Network chunks are buffered as raw bytes and split on blank lines. Event
//! boundaries are ASCII, so a multi-byte character split across two chunks
//! is reassembled before any text is decoded.

/// One dispatched SSE event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// `event:` field, if present
    pub event_type: Option<String>,
    /// `data:` lines joined with newlines
    pub data: String,
}

impl SseEvent {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            event_type: None,
            data: data.into(),
        }
    }

    /// The OpenAI end-of-stream sentinel
    pub fn is_done(&self) -> bool {
        self.data.trim() == "[DONE]"
    }
}

/// Incremental SSE decoder
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a network chunk and return every event it completes
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some((end, delimiter_len)) = find_blank_line(&self.pending) {
            let block: Vec<u8> = self.pending.drain(..end + delimiter_len).collect();
            if let Some(event) = parse_block(&block[..end]) {
                events.push(event);
            }
        }
        events
    }

    /// Flush an unterminated trailing event when the connection closes
    pub fn finish(&mut self) -> Option<SseEvent> {
        let block = std::mem::take(&mut self.pending);
        parse_block(&block)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Position and length of the first `\n\n`, `\r\n\r\n` or `\r\r`
fn find_blank_line(bytes: &[u8]) -> Option<(usize, usize)> {
    for i in 0..bytes.len() {
        let rest = &bytes[i..];
        if rest.starts_with(b"\r\n\r\n") {
            return Some((i, 4));
        }
        if rest.starts_with(b"\n\n") || rest.starts_with(b"\r\r") {
            return Some((i, 2));
        }
    }
    None
}

fn parse_block(block: &[u8]) -> Option<SseEvent> {
    let text = String::from_utf8_lossy(block);
    let mut event_type = None;
    let mut data_lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        // Comment lines are keep-alives
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => data_lines.push(value),
            "event" => event_type = Some(value.trim().to_string()),
            _ => {}
        }
    }

    if data_lines.is_empty() {
        return None;
    }
    Some(SseEvent {
        event_type,
        data: data_lines.join("\n"),
    })
}
