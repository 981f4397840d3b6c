use anyhow::Result;
use async_trait::async_trait;
use shared::domain::{ChatId, ChatMode};
use tracing::{info, warn};

use super::{relay_stream, Navigation, RelayStyle, View, ViewContext, BACK_COMMAND};

pub struct LoveAppView;

#[async_trait]
impl View for LoveAppView {
    fn title(&self) -> &'static str {
        "Love App"
    }

    async fn render(&self, ctx: &mut ViewContext) -> Result<Navigation> {
        let chat_id = ChatId::generate();
        info!(chat_id = chat_id.as_str(), "love-app: session started");
        ctx.writeln(&format!(
            "Love App (chat {chat_id}). Type a message, {BACK_COMMAND} to return."
        ))
        .await?;

        loop {
            let Some(line) = ctx.prompt("you> ").await? else {
                return Ok(Navigation::Exit);
            };
            let message = line.trim();
            if message.is_empty() {
                continue;
            }
            if message == BACK_COMMAND {
                return Ok(Navigation::home());
            }

            let backend = ctx.backend.clone();
            match backend
                .open_chat_stream(ChatMode::LoveApp, message, Some(&chat_id))
                .await
            {
                Ok(conn) => {
                    relay_stream(conn, ctx, RelayStyle::Inline).await?;
                }
                Err(err) => {
                    warn!(chat_id = chat_id.as_str(), error = %err, "love-app: could not open stream");
                    ctx.writeln(&format!("[error] {err}")).await?;
                }
            }
        }
    }
}
