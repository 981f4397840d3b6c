//! Terminal views the shell navigates between, plus the I/O context they share.

use std::{future::Future, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use client_core::{ChatBackend, ChatConnection};
use futures::{future::BoxFuture, FutureExt, StreamExt};
use shared::{domain::ChatId, protocol::StreamMessage};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tracing::{debug, info, warn};

mod about;
mod home;
mod lite_mind;
mod love_app;

pub use about::AboutView;
pub use home::HomeView;
pub use lite_mind::LiteMindView;
pub use love_app::LoveAppView;

pub const BACK_COMMAND: &str = "/back";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    To(String),
    Exit,
}

impl Navigation {
    pub fn home() -> Self {
        Self::To("/".to_string())
    }
}

#[async_trait]
pub trait View: Send + Sync {
    fn title(&self) -> &'static str;
    async fn render(&self, ctx: &mut ViewContext) -> Result<Navigation>;
}

type InputLines = Lines<Box<dyn AsyncBufRead + Send + Unpin>>;
type InterruptSource = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

pub struct ViewContext {
    pub backend: Arc<dyn ChatBackend>,
    input: InputLines,
    output: Box<dyn AsyncWrite + Send + Unpin>,
    interrupt: InterruptSource,
}

impl ViewContext {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        input: impl AsyncBufRead + Send + Unpin + 'static,
        output: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        let input: Box<dyn AsyncBufRead + Send + Unpin> = Box::new(input);
        Self {
            backend,
            input: input.lines(),
            output: Box::new(output),
            interrupt: Arc::new(|| wait_for_signal(tokio::signal::ctrl_c()).boxed()),
        }
    }

    pub fn stdio(backend: Arc<dyn ChatBackend>) -> Self {
        Self::new(
            backend,
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
        )
    }

    /// Replaces what counts as "the user interrupted" a prompt or a running stream.
    pub fn with_interrupt<F>(mut self, interrupt: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        self.interrupt = Arc::new(interrupt);
        self
    }

    /// Prints `prompt` and reads one line; `None` at end of input or when the
    /// user interrupts while waiting.
    pub async fn prompt(&mut self, prompt: &str) -> Result<Option<String>> {
        self.write(prompt).await?;
        let interrupt = (self.interrupt)();
        tokio::select! {
            line = self.input.next_line() => return Ok(line?),
            _ = interrupt => {}
        }
        debug!("prompt: interrupted while waiting for input");
        self.writeln("").await?;
        Ok(None)
    }

    pub async fn write(&mut self, text: &str) -> Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.flush().await?;
        Ok(())
    }

    pub async fn writeln(&mut self, text: &str) -> Result<()> {
        self.write(text).await?;
        self.write("\n").await
    }
}

/// Resolves when `signal` fires. A listener that cannot be installed never
/// fires, so streams are not reported as interrupted.
async fn wait_for_signal(signal: impl Future<Output = std::io::Result<()>>) {
    if let Err(err) = signal.await {
        warn!(error = %err, "views: cannot listen for Ctrl-C");
        futures::future::pending::<()>().await;
    }
}

/// How streamed chunks are laid out on the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStyle {
    /// Token pieces appended on one line.
    Inline,
    /// One line per message, for agent steps.
    Lines,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamOutcome {
    pub chat_id: Option<ChatId>,
    pub chunks: usize,
    pub completed: bool,
    pub interrupted: bool,
}

/// Copies a chat stream to the output until `[DONE]`, end of stream, a stream
/// error, or an interrupt. On interrupt the announced chat (if any) is
/// terminated on the backend.
pub async fn relay_stream(
    conn: ChatConnection,
    ctx: &mut ViewContext,
    style: RelayStyle,
) -> Result<StreamOutcome> {
    let mut messages = conn.messages();
    let mut interrupt = (ctx.interrupt)();
    let mut outcome = StreamOutcome::default();

    if style == RelayStyle::Inline {
        ctx.write("ai> ").await?;
    }

    loop {
        tokio::select! {
            next = messages.next() => match next {
                Some(Ok(StreamMessage::ChatId(chat_id))) => {
                    debug!(chat_id = chat_id.as_str(), "relay: server announced chat id");
                    outcome.chat_id = Some(chat_id);
                }
                Some(Ok(StreamMessage::Text(text))) => {
                    outcome.chunks += 1;
                    match style {
                        RelayStyle::Inline => ctx.write(&text).await?,
                        RelayStyle::Lines => ctx.writeln(&format!("  {text}")).await?,
                    }
                }
                Some(Ok(StreamMessage::Done)) => {
                    outcome.completed = true;
                    break;
                }
                Some(Err(err)) => {
                    warn!(error = %err, "relay: stream failed");
                    ctx.writeln(&format!("\n[stream error] {err}")).await?;
                    break;
                }
                None => break,
            },
            _ = &mut interrupt => {
                outcome.interrupted = true;
                ctx.writeln("\n[interrupted]").await?;
                if let Some(chat_id) = &outcome.chat_id {
                    terminate(ctx, chat_id, false).await?;
                }
                break;
            }
        }
    }

    if style == RelayStyle::Inline && !outcome.interrupted {
        ctx.writeln("").await?;
    }
    info!(
        chunks = outcome.chunks,
        completed = outcome.completed,
        interrupted = outcome.interrupted,
        "relay: stream finished"
    );
    Ok(outcome)
}

pub async fn terminate(ctx: &mut ViewContext, chat_id: &ChatId, hard: bool) -> Result<()> {
    match ctx.backend.terminate_chat(chat_id, hard).await {
        Ok(response) if response.ok => {
            ctx.writeln(&format!("[chat {chat_id} terminated]")).await
        }
        Ok(_) => {
            ctx.writeln(&format!("[chat {chat_id} was not running]"))
                .await
        }
        Err(err) => {
            warn!(chat_id = chat_id.as_str(), error = %err, "relay: terminate failed");
            ctx.writeln(&format!("[terminate failed] {err}")).await
        }
    }
}

#[cfg(test)]
#[path = "../tests/views_tests.rs"]
mod tests;
