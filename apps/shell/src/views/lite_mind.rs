use anyhow::Result;
use async_trait::async_trait;
use shared::domain::{ChatId, ChatMode};
use tracing::warn;

use super::{relay_stream, terminate, Navigation, RelayStyle, View, ViewContext, BACK_COMMAND};

const STOP_COMMAND: &str = "/stop";

pub struct LiteMindView;

#[async_trait]
impl View for LiteMindView {
    fn title(&self) -> &'static str {
        "LiteMind"
    }

    async fn render(&self, ctx: &mut ViewContext) -> Result<Navigation> {
        ctx.writeln(&format!(
            "LiteMind agent. Describe a task; Ctrl-C stops a running task, {STOP_COMMAND} ends the last one for good, {BACK_COMMAND} returns."
        ))
        .await?;

        let mut last_chat_id: Option<ChatId> = None;
        loop {
            let Some(line) = ctx.prompt("you> ").await? else {
                return Ok(Navigation::Exit);
            };
            let message = line.trim();
            match message {
                "" => continue,
                BACK_COMMAND => return Ok(Navigation::home()),
                STOP_COMMAND => {
                    match &last_chat_id {
                        Some(chat_id) => terminate(ctx, chat_id, true).await?,
                        None => ctx.writeln("[no task to stop]").await?,
                    }
                    continue;
                }
                _ => {}
            }

            let backend = ctx.backend.clone();
            let conn = match backend
                .open_chat_stream(ChatMode::LiteMind, message, None)
                .await
            {
                Ok(conn) => conn,
                Err(err) => {
                    warn!(error = %err, "lite-mind: could not open stream");
                    ctx.writeln(&format!("[error] {err}")).await?;
                    continue;
                }
            };

            let outcome = relay_stream(conn, ctx, RelayStyle::Lines).await?;
            if outcome.chat_id.is_some() {
                last_chat_id = outcome.chat_id;
            }
        }
    }
}
