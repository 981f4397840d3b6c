use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::Parser;
use client_core::ApiService;
use tracing::{debug, info, warn};

mod config;
mod router;
mod views;

use config::load_settings;
use router::RouteTable;
use views::{Navigation, ViewContext};

#[derive(Parser, Debug)]
#[command(about = "Terminal shell for the chat agent backend")]
struct Args {
    /// TOML file with api_base_url / log_filter / start_path.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    api_base_url: Option<String>,
    /// View to open first, e.g. /love-app.
    path: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (mut settings, config_warnings) = load_settings(args.config.as_deref())?;
    if let Some(api_base_url) = args.api_base_url {
        settings.api_base_url = api_base_url;
    }
    if let Some(path) = args.path {
        settings.start_path = path;
    }

    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .with_writer(std::io::stderr)
        .init();
    for warning in &config_warnings {
        warn!("config: {warning}");
    }

    let api = ApiService::new(settings.api_base_url.as_str())
        .with_context(|| format!("cannot use api base url '{}'", settings.api_base_url))?;
    info!(api_base_url = api.base_url(), "shell: starting");

    let routes = RouteTable::standard()?;
    for route in routes.iter() {
        debug!(
            path = route.path(),
            name = route.name(),
            deferred = route.is_deferred(),
            "router: registered"
        );
    }
    let mut ctx = ViewContext::stdio(Arc::new(api));
    run_shell(&routes, &mut ctx, &settings.start_path).await
}

/// Navigation loop: look up the current target, render its view, follow the
/// view's answer. Unknown targets fall back to `/`.
async fn run_shell(routes: &RouteTable, ctx: &mut ViewContext, start_path: &str) -> Result<()> {
    let mut path = start_path.to_string();
    loop {
        let Some(route) = routes.lookup(&path) else {
            if path == "/" {
                bail!("route table has no root view");
            }
            warn!(%path, "router: no view matches path");
            ctx.writeln(&format!("No view at '{path}', returning home."))
                .await?;
            path = "/".to_string();
            continue;
        };

        let view = route.view();
        info!(path = route.path(), view = view.title(), "router: navigating");
        match view.render(ctx).await? {
            Navigation::To(next) => path = next,
            Navigation::Exit => break,
        }
    }
    info!("shell: exiting");
    Ok(())
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
