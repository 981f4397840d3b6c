//! In-memory backend and I/O plumbing for view and navigation tests.

use std::{
    collections::VecDeque,
    io::Cursor,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use client_core::{ApiClientError, ChatBackend, ChatConnection, ServerStatus, StatusCode};
use futures::{future::BoxFuture, stream, FutureExt, StreamExt};
use shared::{
    domain::{ChatId, ChatMode},
    error::TerminateResult,
    protocol::TerminateResponse,
};
use tokio::io::{AsyncReadExt, DuplexStream};

use crate::views::ViewContext;

pub const ANNOUNCED_CHAT_ID: &str = "fedcba9876543210fedcba9876543210";

pub enum Reply {
    /// Frames followed by end of stream.
    Frames(Vec<&'static str>),
    /// Frames, then the stream stays open until dropped.
    Hang(Vec<&'static str>),
    Fail(StatusCode),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedStream {
    pub mode: ChatMode,
    pub message: String,
    pub chat_id: Option<ChatId>,
}

pub struct FakeBackend {
    pub status: ServerStatus,
    replies: Mutex<VecDeque<Reply>>,
    pub opened: Mutex<Vec<OpenedStream>>,
    pub terminated: Mutex<Vec<(ChatId, bool)>>,
}

impl FakeBackend {
    pub fn online(replies: Vec<Reply>) -> Arc<Self> {
        Self::with_status(ServerStatus::Online, replies)
    }

    pub fn with_status(status: ServerStatus, replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            status,
            replies: Mutex::new(replies.into()),
            opened: Mutex::new(Vec::new()),
            terminated: Mutex::new(Vec::new()),
        })
    }

    pub fn opened(&self) -> Vec<OpenedStream> {
        self.opened.lock().expect("opened lock").clone()
    }

    pub fn terminated(&self) -> Vec<(ChatId, bool)> {
        self.terminated.lock().expect("terminated lock").clone()
    }
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn open_chat_stream(
        &self,
        mode: ChatMode,
        message: &str,
        chat_id: Option<&ChatId>,
    ) -> Result<ChatConnection, ApiClientError> {
        self.opened.lock().expect("opened lock").push(OpenedStream {
            mode,
            message: message.to_string(),
            chat_id: chat_id.cloned(),
        });

        let url = format!("fake://{mode:?}");
        let reply = self
            .replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or(Reply::Frames(Vec::new()));
        match reply {
            Reply::Frames(frames) => Ok(ChatConnection::from_byte_stream(url, frame_stream(frames))),
            Reply::Hang(frames) => Ok(ChatConnection::from_byte_stream(
                url,
                frame_stream(frames).chain(stream::pending()),
            )),
            Reply::Fail(status) => Err(ApiClientError::Status { url, status }),
        }
    }

    async fn probe_server(&self) -> ServerStatus {
        self.status.clone()
    }

    async fn terminate_chat(
        &self,
        chat_id: &ChatId,
        hard: bool,
    ) -> Result<TerminateResponse, ApiClientError> {
        self.terminated
            .lock()
            .expect("terminated lock")
            .push((chat_id.clone(), hard));
        Ok(TerminateResponse {
            chat_id: chat_id.to_string(),
            ok: true,
            result: TerminateResult::Terminated,
        })
    }
}

fn frame_stream(
    frames: Vec<&'static str>,
) -> impl futures::Stream<Item = Result<Vec<u8>, ApiClientError>> + Send + 'static {
    stream::iter(
        frames
            .into_iter()
            .map(|frame| Ok(format!("data:{frame}\n\n").into_bytes())),
    )
}

/// Context reading `input` and writing into the returned duplex end.
pub fn context_with(
    backend: Arc<FakeBackend>,
    input: &str,
) -> (ViewContext, DuplexStream) {
    let (writer, reader) = tokio::io::duplex(64 * 1024);
    let ctx = ViewContext::new(backend, Cursor::new(input.as_bytes().to_vec()), writer)
        .with_interrupt(never_interrupt);
    (ctx, reader)
}

pub fn never_interrupt() -> BoxFuture<'static, ()> {
    futures::future::pending().boxed()
}

pub fn interrupt_after(delay: Duration) -> impl Fn() -> BoxFuture<'static, ()> + Send + Sync {
    move || tokio::time::sleep(delay).boxed()
}

/// Drops the context so the output side closes, then collects everything written.
pub async fn finish(ctx: ViewContext, mut reader: DuplexStream) -> String {
    drop(ctx);
    let mut out = String::new();
    reader.read_to_string(&mut out).await.expect("read output");
    out
}
