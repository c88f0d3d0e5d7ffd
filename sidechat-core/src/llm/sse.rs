//! Incremental decoder for the chat endpoint's streamed wire format
//!
//! The response body arrives as arbitrary byte chunks. Chunk boundaries fall
//! anywhere: inside a multi-byte UTF-8 character, inside a `data: ` marker,
//! inside a JSON payload. The decoder therefore carries two pieces of state
//! between `feed` calls: undecoded trailing bytes and an unterminated line.
//!
//! Per line: the `data: ` marker is stripped, `[DONE]` ends the stream, and
//! anything else is parsed as a JSON object whose
//! `choices[0].delta.content` field is the text fragment. Malformed payloads
//! are expected at chunk boundaries and are dropped without ending the
//! stream.

use serde_json::Value;

const DATA_MARKER: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// One decoded wire event
#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent {
    /// A text fragment extracted from a delta payload
    Delta(String),
    /// The `[DONE]` sentinel; no further events follow
    Done,
}

/// Stateful decoder, one per response body
#[derive(Debug, Default)]
pub struct DeltaDecoder {
    pending_bytes: Vec<u8>,
    pending_line: String,
    done: bool,
}

impl DeltaDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of body bytes, returning the events it completes.
    /// After `Done` has been emitted, further input is ignored.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        if self.done {
            return Vec::new();
        }

        self.pending_bytes.extend_from_slice(chunk);
        let text = self.drain_decoded();

        let mut events = Vec::new();
        for ch in text.chars() {
            if ch == '\n' {
                let line = std::mem::take(&mut self.pending_line);
                if self.handle_line(&line, &mut events) {
                    self.done = true;
                    break;
                }
            } else {
                self.pending_line.push(ch);
            }
        }
        events
    }

    /// Flush a trailing unterminated line once the body is exhausted.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        if self.done {
            return Vec::new();
        }

        let mut events = Vec::new();
        let line = std::mem::take(&mut self.pending_line);
        if !line.trim().is_empty() && self.handle_line(&line, &mut events) {
            self.done = true;
        }
        events
    }

    /// Whether the `[DONE]` sentinel has been seen
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Decode the longest complete UTF-8 prefix of the byte buffer, keeping
    /// an incomplete trailing sequence for the next chunk.
    fn drain_decoded(&mut self) -> String {
        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending_bytes) {
                Ok(valid) => {
                    out.push_str(valid);
                    self.pending_bytes.clear();
                    break;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending_bytes[..valid_up_to]));
                    match e.error_len() {
                        // Truly invalid bytes: replace and keep going
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending_bytes.drain(..valid_up_to + len);
                        }
                        // Incomplete trailing sequence: wait for more bytes
                        None => {
                            self.pending_bytes.drain(..valid_up_to);
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Handle one complete line. Returns true when the line carried the
    /// terminal sentinel.
    fn handle_line(&self, line: &str, events: &mut Vec<SseEvent>) -> bool {
        let line = line.trim_end_matches('\r');
        if !line.starts_with(DATA_MARKER) {
            return false;
        }

        let data = line.trim_start_matches(DATA_MARKER).trim();
        if data.is_empty() {
            return false;
        }
        if data == DONE_SENTINEL {
            events.push(SseEvent::Done);
            return true;
        }

        match serde_json::from_str::<Value>(data) {
            Ok(payload) => {
                if let Some(delta) = extract_delta(&payload) {
                    if !delta.is_empty() {
                        events.push(SseEvent::Delta(delta.to_string()));
                    }
                }
            }
            Err(e) => {
                tracing::debug!("discarding malformed stream payload: {}", e);
            }
        }
        false
    }
}

fn extract_delta(payload: &Value) -> Option<&str> {
    payload
        .get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()
}
