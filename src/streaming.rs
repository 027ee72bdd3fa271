//! Server-sent event decoding for `stream: true` chat completions.

use futures::{Stream, StreamExt};
use serde::Deserialize;
use std::collections::VecDeque;
use std::pin::Pin;

use crate::client::ApiErrorBody;
use crate::error::{ModelError, ModelResult};
use crate::models::ChatCompletionChunk;
use crate::transport::BodyStream;

/// A streaming response from the chat completions endpoint
pub type StreamingResponse = Pin<Box<dyn Stream<Item = ModelResult<ChatCompletionChunk>> + Send>>;

const DONE: &str = "[DONE]";

/// An `{"error": ...}` event sent in place of a chunk.
#[derive(Deserialize)]
struct ErrorEvent {
    error: ApiErrorBody,
}

struct SseState {
    body: BodyStream,
    buffer: Vec<u8>,
    data_lines: Vec<String>,
    events: VecDeque<String>,
    eof: bool,
    finished: bool,
}

impl SseState {
    fn new(body: BodyStream) -> Self {
        Self {
            body,
            buffer: Vec::new(),
            data_lines: Vec::new(),
            events: VecDeque::new(),
            eof: false,
            finished: false,
        }
    }

    /// Move every complete line out of the buffer.
    fn drain_lines(&mut self) -> ModelResult<()> {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.feed_line(&line[..line.len() - 1])?;
        }
        Ok(())
    }

    fn flush(&mut self) -> ModelResult<()> {
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.feed_line(&line)?;
        }
        self.dispatch();
        Ok(())
    }

    fn feed_line(&mut self, raw: &[u8]) -> ModelResult<()> {
        let line = std::str::from_utf8(raw)
            .map_err(|e| ModelError::Stream(format!("invalid UTF-8 in event stream: {e}")))?;
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.is_empty() {
            self.dispatch();
        } else if let Some(value) = line.strip_prefix("data:") {
            self.data_lines
                .push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
        // `event:`, `id:`, `retry:` and `:` comments carry nothing we use
        Ok(())
    }

    fn dispatch(&mut self) {
        if !self.data_lines.is_empty() {
            self.events.push_back(self.data_lines.join("\n"));
            self.data_lines.clear();
        }
    }
}

fn parse_chunk(data: &str) -> ModelResult<ChatCompletionChunk> {
    match serde_json::from_str::<ChatCompletionChunk>(data) {
        Ok(chunk) => Ok(chunk),
        Err(err) => match serde_json::from_str::<ErrorEvent>(data) {
            Ok(api_err) => Err(ModelError::Stream(api_err.error.message)),
            Err(_) => Err(ModelError::Decode(err)),
        },
    }
}

/// Decode an SSE body into chunks. The stream ends at `data: [DONE]`, at the
/// end of the body, or after the first error.
pub fn decode_chunks(body: BodyStream) -> StreamingResponse {
    let stream = futures::stream::unfold(SseState::new(body), |mut state| async move {
        loop {
            if state.finished {
                return None;
            }
            if let Some(data) = state.events.pop_front() {
                if data.trim() == DONE {
                    return None;
                }
                let item = parse_chunk(&data);
                if item.is_err() {
                    state.finished = true;
                }
                return Some((item, state));
            }
            if state.eof {
                return None;
            }

            let read = match state.body.next().await {
                Some(Ok(bytes)) => {
                    state.buffer.extend_from_slice(&bytes);
                    state.drain_lines()
                }
                Some(Err(err)) => Err(err),
                None => {
                    state.eof = true;
                    state.flush()
                }
            };
            if let Err(err) = read {
                tracing::debug!(error = %err, "event stream aborted");
                state.finished = true;
                return Some((Err(err), state));
            }
        }
    });
    Box::pin(stream)
}
