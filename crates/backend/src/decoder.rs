//! Incremental decoding of the chat endpoint's `event:`/`data:` byte stream.
//!
//! Chunks arrive with no alignment guarantees: a chunk can end in the middle of a line or in the
//! middle of a multi-byte UTF-8 sequence. Everything that has not yet formed a complete unit is
//! carried over to the next [`FrameDecoder::feed`] call, so the frames produced never depend on
//! how the bytes were segmented.

use serde_json::Value;

use crate::frame::Frame;

const EVENT_PREFIX: &str = "event: ";
const DATA_PREFIX: &str = "data: ";

/// Streaming UTF-8 decoder that holds back an incomplete trailing sequence between chunks.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes as much of `pending + bytes` as is complete.
    ///
    /// Invalid sequences become U+FFFD, one per maximal invalid subpart. A sequence that may still
    /// be completed by the next chunk is kept for later.
    pub fn feed(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut decoded = String::with_capacity(self.pending.len());
        let mut rest: &[u8] = &self.pending;
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    decoded.push_str(text);
                    rest = &[];
                    break;
                }
                Err(error) => {
                    let (valid, after) = rest.split_at(error.valid_up_to());
                    decoded.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match error.error_len() {
                        Some(invalid_len) => {
                            decoded.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[invalid_len..];
                        }
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        let tail = rest.to_vec();
        self.pending = tail;
        decoded
    }

    /// Number of bytes held back waiting for the rest of a sequence.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drops any incomplete trailing sequence, returning how many bytes were discarded.
    pub fn finish(&mut self) -> usize {
        let discarded = self.pending.len();
        self.pending.clear();
        discarded
    }
}

/// Turns raw chunks into [`Frame`]s.
///
/// The pending event name is decoder state: an `event:` line in one chunk applies to a `data:`
/// line in a later chunk.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    text: Utf8ChunkDecoder,
    line_buffer: String,
    pending_event: String,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk and returns the frames completed by it, in stream order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let text = self.text.feed(chunk);
        self.line_buffer.push_str(&text);

        let mut buffer = std::mem::take(&mut self.line_buffer);
        let complete = buffer.rfind('\n').map_or(0, |newline| newline + 1);

        let mut frames = Vec::new();
        for line in buffer[..complete].split_terminator('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if let Some(frame) = self.process_line(line) {
                frames.push(frame);
            }
        }

        buffer.drain(..complete);
        self.line_buffer = buffer;
        frames
    }

    /// Ends the stream. Unterminated content is discarded and never emitted as a frame; the
    /// return value is the number of discarded bytes.
    pub fn finish(&mut self) -> usize {
        let discarded = self.line_buffer.len() + self.text.finish();
        if discarded > 0 {
            tracing::debug!(discarded, "discarding unterminated tail of chat stream");
        }
        self.line_buffer.clear();
        self.pending_event.clear();
        discarded
    }

    fn process_line(&mut self, line: &str) -> Option<Frame> {
        if let Some(name) = line.strip_prefix(EVENT_PREFIX) {
            self.pending_event = name.trim().to_string();
            return None;
        }

        let data = line.strip_prefix(DATA_PREFIX)?;
        let event = std::mem::take(&mut self.pending_event);
        match serde_json::from_str::<Value>(data) {
            Ok(payload) => Some(Frame { event, payload }),
            Err(error) => {
                tracing::debug!(event = %event, error = %error, "skipping malformed data line");
                None
            }
        }
    }
}
