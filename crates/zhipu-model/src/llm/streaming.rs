//! Streaming session: bridges the blocking chunk iterator into an async
//! event stream.
//!
//! Every pull is its own `spawn_blocking` unit. The iterator moves onto a
//! blocking worker, yields one chunk, and comes back with it. Nothing is
//! pulled until the consumer asks for the next event, so pacing (and
//! backpressure) belongs entirely to the caller and no worker thread sits idle
//! between chunks.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::assemble::map_usage;
use super::client::ChunkIter;
use super::parts::{PartsManager, StreamEvent};
use super::translate::dump_json;
use super::types::{ModelResponse, Usage};
use super::wire::ChatCompletionChunk;
use crate::error::{AdapterError, ProviderError, Result};

/// Lifecycle of a streaming session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Iterator active, events may still be produced
    Open,
    /// Iterator exhausted, final usage being frozen
    Draining,
    /// Terminal: no more events, iterator released
    Closed,
}

type PullOutput = (
    ChunkIter,
    Option<std::result::Result<ChatCompletionChunk, ProviderError>>,
);

/// Live response of a streaming request.
///
/// Yields [`StreamEvent`]s via [`Stream`] / [`next_event`](Self::next_event).
/// Dropping the session closes it; an in-flight pull finishes on its worker
/// and releases the connection there.
pub struct StreamedResponse {
    model_name: String,
    timestamp: DateTime<Utc>,
    vendor_model: Option<String>,
    chunks: Option<ChunkIter>,
    pull: Option<JoinHandle<PullOutput>>,
    pending: VecDeque<StreamEvent>,
    parts: PartsManager,
    usage: Usage,
    state: StreamState,
    chunks_seen: usize,
}

impl StreamedResponse {
    pub(crate) fn new(model_name: &str, chunks: ChunkIter) -> Self {
        Self {
            model_name: model_name.to_string(),
            timestamp: Utc::now(),
            vendor_model: None,
            chunks: Some(chunks),
            pull: None,
            pending: VecDeque::new(),
            parts: PartsManager::new(),
            usage: Usage::default(),
            state: StreamState::Open,
            chunks_seen: 0,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == StreamState::Closed
    }

    /// Usage as of the last chunk that carried it (zero if none has)
    pub fn usage(&self) -> Usage {
        self.usage
    }

    /// Frozen usage, available once the session is closed
    pub fn usage_snapshot(&self) -> Option<Usage> {
        self.is_closed().then_some(self.usage)
    }

    /// Response assembled from the deltas seen so far
    pub fn get(&self) -> ModelResponse {
        ModelResponse {
            parts: self.parts.parts(),
            timestamp: self.timestamp,
            model_name: self.vendor_model.clone(),
        }
    }

    pub async fn next_event(&mut self) -> Option<Result<StreamEvent>> {
        self.next().await
    }

    /// Consume the remaining events and return the final response and usage
    pub async fn complete(&mut self) -> Result<(ModelResponse, Usage)> {
        while let Some(event) = self.next().await {
            event?;
        }
        Ok((self.get(), self.usage))
    }

    /// Stop consuming and release the iterator. Idempotent.
    pub fn close(&mut self) {
        if self.state == StreamState::Closed {
            return;
        }
        // Dropping the handle detaches an in-flight pull; its worker drops the iterator
        self.pull = None;
        self.chunks = None;
        self.pending.clear();
        self.state = StreamState::Closed;
        debug!(
            model = %self.model_name,
            chunks = self.chunks_seen,
            "Stream closed before exhaustion"
        );
    }

    fn finish(&mut self) {
        if self.state != StreamState::Open {
            return;
        }
        self.state = StreamState::Draining;
        self.chunks = None;
        self.pull = None;
        self.state = StreamState::Closed;
        debug!(
            model = %self.model_name,
            chunks = self.chunks_seen,
            request_tokens = self.usage.request_tokens,
            response_tokens = self.usage.response_tokens,
            "Stream exhausted"
        );
    }

    fn process_chunk(&mut self, chunk: ChatCompletionChunk) {
        self.chunks_seen += 1;

        if self.vendor_model.is_none() {
            self.vendor_model = chunk.model;
        }

        // Usage may arrive on any chunk; last write wins
        if let Some(usage) = chunk.usage.as_ref() {
            self.usage = map_usage(Some(usage));
        }

        let Some(choice) = chunk.choices.into_iter().next() else {
            return;
        };

        if let Some(content) = choice.delta.content {
            if let Some(event) = self.parts.handle_text_delta(content) {
                self.pending.push_back(event);
            }
        }

        for tc in choice.delta.tool_calls.unwrap_or_default() {
            let (name, args) = match tc.function {
                Some(f) => (f.name, f.arguments.and_then(args_fragment)),
                None => (None, None),
            };
            if let Some(event) = self.parts.handle_tool_call_delta(tc.index, name, args, tc.id) {
                self.pending.push_back(event);
            }
        }
    }

    /// Fold a feed of chunks without going through a worker
    #[cfg(test)]
    pub(crate) fn process_chunks_for_test(
        &mut self,
        chunks: impl IntoIterator<Item = ChatCompletionChunk>,
    ) -> Vec<StreamEvent> {
        for chunk in chunks {
            self.process_chunk(chunk);
        }
        self.pending.drain(..).collect()
    }
}

/// Argument fragments are strings; an object-valued delta is re-encoded whole
fn args_fragment(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(dump_json(&other)),
    }
}

fn spawn_pull(mut chunks: ChunkIter) -> JoinHandle<PullOutput> {
    tokio::task::spawn_blocking(move || {
        let next = chunks.next();
        (chunks, next)
    })
}

impl Stream for StreamedResponse {
    type Item = Result<StreamEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(event) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(event)));
            }
            if this.state != StreamState::Open {
                return Poll::Ready(None);
            }

            if this.pull.is_none() {
                match this.chunks.take() {
                    Some(chunks) => this.pull = Some(spawn_pull(chunks)),
                    None => {
                        this.finish();
                        continue;
                    }
                }
            }

            let joined = match this.pull.as_mut() {
                Some(pull) => ready!(Pin::new(pull).poll(cx)),
                None => continue,
            };
            this.pull = None;

            match joined {
                Ok((chunks, Some(Ok(chunk)))) => {
                    this.chunks = Some(chunks);
                    this.process_chunk(chunk);
                }
                Ok((_, None)) => this.finish(),
                Ok((_, Some(Err(e)))) => {
                    warn!(model = %this.model_name, error = %e, "Stream failed");
                    this.close();
                    return Poll::Ready(Some(Err(AdapterError::Provider(e))));
                }
                Err(e) => {
                    warn!(model = %this.model_name, error = %e, "Stream worker failed");
                    this.close();
                    return Poll::Ready(Some(Err(e.into())));
                }
            }
        }
    }
}

impl Drop for StreamedResponse {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for StreamedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamedResponse")
            .field("model_name", &self.model_name)
            .field("state", &self.state)
            .field("usage", &self.usage)
            .field("chunks_seen", &self.chunks_seen)
            .field("pending", &self.pending.len())
            .finish()
    }
}
