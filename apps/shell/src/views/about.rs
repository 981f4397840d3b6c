use anyhow::Result;
use async_trait::async_trait;

use super::{Navigation, View, ViewContext};

const ABOUT_TEXT: &str = "\
agent-shell talks to the chat agent backend over HTTP and server-sent events.
  /love-app   streams answers from the relationship advisor, keeping one chat id per session
  /lite-mind  streams the agent's steps; Ctrl-C while it runs asks the backend to stop
Type /back inside a chat to return home.";

pub struct AboutView;

#[async_trait]
impl View for AboutView {
    fn title(&self) -> &'static str {
        "About"
    }

    async fn render(&self, ctx: &mut ViewContext) -> Result<Navigation> {
        ctx.writeln(ABOUT_TEXT).await?;
        Ok(Navigation::home())
    }
}
