use anyhow::Result;
use async_trait::async_trait;

use super::{Navigation, View, ViewContext};

const MENU: [(&str, &str, &str); 3] = [
    ("1", "/love-app", "Love App: relationship advice chat"),
    ("2", "/lite-mind", "LiteMind: multi-step agent"),
    ("3", "/about", "About this shell"),
];

pub struct HomeView;

#[async_trait]
impl View for HomeView {
    fn title(&self) -> &'static str {
        "Home"
    }

    async fn render(&self, ctx: &mut ViewContext) -> Result<Navigation> {
        let status = ctx.backend.probe_server().await;
        ctx.writeln(&format!("Backend: {status}")).await?;
        for (key, path, label) in MENU {
            ctx.writeln(&format!("  {key}) {label}  [{path}]")).await?;
        }
        ctx.writeln("  q) quit").await?;

        loop {
            let Some(line) = ctx.prompt("home> ").await? else {
                return Ok(Navigation::Exit);
            };
            let choice = line.trim();
            if choice.is_empty() {
                continue;
            }
            if choice == "q" || choice == "quit" {
                return Ok(Navigation::Exit);
            }
            if choice.starts_with('/') {
                return Ok(Navigation::To(choice.to_string()));
            }
            if let Some((_, path, _)) = MENU.iter().find(|(key, _, _)| *key == choice) {
                return Ok(Navigation::To(path.to_string()));
            }
            ctx.writeln(&format!("unknown choice '{choice}'")).await?;
        }
    }
}
