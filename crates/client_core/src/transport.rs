//! Server-push (text/event-stream) transport for chat endpoints.

use std::{
    collections::VecDeque,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use futures::{Stream, StreamExt};
use shared::protocol::StreamMessage;
use tracing::debug;

use crate::error::ApiClientError;

const DEFAULT_EVENT_TYPE: &str = "message";

type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, ApiClientError>> + Send>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
    pub id: Option<String>,
    /// Reconnection delay in effect when the event was dispatched.
    pub retry: Option<u64>,
}

/// Incremental event-stream decoder. Input is split only on CR/LF bytes, so
/// UTF-8 sequences cut across network chunks are reassembled before decoding.
#[derive(Debug, Default)]
pub struct SseDecoder {
    line: Vec<u8>,
    skip_lf: bool,
    started: bool,
    data: String,
    event_type: String,
    last_event_id: Option<String>,
    retry: Option<u64>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let mut events = Vec::new();
        for &byte in chunk {
            if self.skip_lf {
                self.skip_lf = false;
                if byte == b'\n' {
                    continue;
                }
            }
            match byte {
                b'\n' => self.end_line(&mut events),
                b'\r' => {
                    self.skip_lf = true;
                    self.end_line(&mut events);
                }
                _ => self.line.push(byte),
            }
        }
        events
    }

    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Reconnection delay requested by the server, in milliseconds.
    pub fn retry(&self) -> Option<u64> {
        self.retry
    }

    fn end_line(&mut self, events: &mut Vec<SseEvent>) {
        let raw = std::mem::take(&mut self.line);
        let mut line = String::from_utf8_lossy(&raw);
        if !self.started {
            self.started = true;
            if line.starts_with('\u{FEFF}') {
                line = line['\u{FEFF}'.len_utf8()..].to_string().into();
            }
        }

        if line.is_empty() {
            if let Some(event) = self.dispatch() {
                events.push(event);
            }
            return;
        }
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (&*line, ""),
        };
        self.apply_field(field, value);
    }

    fn apply_field(&mut self, field: &str, value: &str) {
        match field {
            "event" => self.event_type = value.to_string(),
            "data" => {
                self.data.push_str(value);
                self.data.push('\n');
            }
            "id" => {
                if !value.contains('\0') {
                    self.last_event_id = Some(value.to_string());
                }
            }
            "retry" => {
                if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
                    if let Ok(millis) = value.parse() {
                        self.retry = Some(millis);
                    }
                }
            }
            other => debug!(field = other, "sse: ignoring unknown field"),
        }
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event_type = std::mem::take(&mut self.event_type);
        if self.data.is_empty() {
            return None;
        }

        let mut data = std::mem::take(&mut self.data);
        data.pop();
        Some(SseEvent {
            event: if event_type.is_empty() {
                DEFAULT_EVENT_TYPE.to_string()
            } else {
                event_type
            },
            data,
            id: self.last_event_id.clone(),
            retry: self.retry,
        })
    }
}

/// A live server-push connection. Dropping it closes the underlying request.
pub struct ChatConnection {
    url: String,
    body: ByteStream,
    decoder: SseDecoder,
    ready: VecDeque<SseEvent>,
    finished: bool,
}

impl ChatConnection {
    pub(crate) fn from_response(url: String, response: reqwest::Response) -> Self {
        let stream_url = url.clone();
        let body = response.bytes_stream().map(move |chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|source| ApiClientError::Stream {
                    url: stream_url.clone(),
                    source,
                })
        });
        Self::from_byte_stream(url, body)
    }

    pub fn from_byte_stream<S>(url: impl Into<String>, body: S) -> Self
    where
        S: Stream<Item = Result<Vec<u8>, ApiClientError>> + Send + 'static,
    {
        Self {
            url: url.into(),
            body: Box::pin(body),
            decoder: SseDecoder::new(),
            ready: VecDeque::new(),
            finished: false,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn last_event_id(&self) -> Option<&str> {
        self.decoder.last_event_id()
    }

    pub fn retry_hint(&self) -> Option<Duration> {
        self.decoder.retry().map(Duration::from_millis)
    }

    /// Classifies each event payload into chat-level messages.
    pub fn messages(self) -> impl Stream<Item = Result<StreamMessage, ApiClientError>> + Send + Unpin {
        self.map(classify_event as fn(_) -> _)
    }
}

fn classify_event(event: Result<SseEvent, ApiClientError>) -> Result<StreamMessage, ApiClientError> {
    event.map(|event| StreamMessage::classify(&event.data))
}

impl Stream for ChatConnection {
    type Item = Result<SseEvent, ApiClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(event) = this.ready.pop_front() {
                return Poll::Ready(Some(Ok(event)));
            }
            if this.finished {
                return Poll::Ready(None);
            }
            match this.body.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    let events = this.decoder.feed(&chunk);
                    this.ready.extend(events);
                }
                Poll::Ready(Some(Err(err))) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => {
                    debug!(url = %this.url, "sse: stream closed by server");
                    this.finished = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
