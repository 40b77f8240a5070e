//! Blocking server-sent-event reader for chat-completion streams.

use std::io::BufRead;

use tracing::{debug, warn};

use super::wire::ChatCompletionChunk;
use crate::error::ProviderError;

/// Max SSE event size (1MB) to prevent OOM from malformed streams
const MAX_EVENT_SIZE: usize = 1_048_576;

const DONE_MARKER: &str = "[DONE]";

/// Pull-based iterator over the chunks of one SSE body.
///
/// Each `next()` blocks until a full event (terminated by a blank line) has
/// been read. Ends on `data: [DONE]` or end of body. A read or decode error is
/// yielded once, after which the iterator is exhausted.
pub struct SseChunks<R> {
    reader: R,
    line: Vec<u8>,
    finished: bool,
}

impl<R: BufRead> SseChunks<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
            finished: false,
        }
    }

    /// Read lines until a complete event's `data` payload is buffered
    fn read_event(&mut self) -> Result<Option<String>, ProviderError> {
        let mut data: Vec<u8> = Vec::new();

        loop {
            self.line.clear();
            let n = self.reader.read_until(b'\n', &mut self.line)?;
            if n == 0 {
                // EOF: flush a trailing event without blank-line terminator
                return Ok(if data.is_empty() {
                    None
                } else {
                    Some(String::from_utf8_lossy(&data).into_owned())
                });
            }

            let line = trim_line_end(&self.line);
            if line.is_empty() {
                if data.is_empty() {
                    continue;
                }
                // Safe to decode here: events are complete UTF-8 at boundaries
                return Ok(Some(String::from_utf8_lossy(&data).into_owned()));
            }

            if let Some(payload) = line.strip_prefix(b"data:") {
                let payload = payload.strip_prefix(b" ").unwrap_or(payload);
                if !data.is_empty() {
                    data.push(b'\n');
                }
                data.extend_from_slice(payload);

                if data.len() > MAX_EVENT_SIZE {
                    return Err(ProviderError::EventTooLarge {
                        limit: MAX_EVENT_SIZE,
                    });
                }
            }
            // `event:`, `id:`, `retry:` and comments carry nothing we need
        }
    }
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

impl<R: BufRead> Iterator for SseChunks<R> {
    type Item = Result<ChatCompletionChunk, ProviderError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let result = match self.read_event() {
            Ok(None) => {
                debug!("SSE body ended without [DONE]");
                self.finished = true;
                return None;
            }
            Ok(Some(data)) if data.trim() == DONE_MARKER => {
                self.finished = true;
                return None;
            }
            Ok(Some(data)) => serde_json::from_str::<ChatCompletionChunk>(data.trim())
                .map_err(ProviderError::from),
            Err(e) => Err(e),
        };

        if let Err(ref e) = result {
            warn!(error = %e, "SSE stream failed");
            self.finished = true;
        }

        Some(result)
    }
}
