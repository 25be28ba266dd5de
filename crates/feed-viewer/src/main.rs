use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use feed_viewer::config::FeedConfig;
use feed_viewer::state::StateStore;
use feed_viewer::transport::{HttpGet, ReqwestTransport};
use feed_viewer::{FeedRegistry, FeedViewer};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "feed-viewer")]
#[command(version, about = "Browse RSS and JSON feeds listed in a Google Sheet", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, help = "Output as JSON")]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the feeds in the sheet
    List,
    /// Fetch and render a feed; defaults to the last one shown
    Show { name: Option<String> },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = FeedConfig::load()?;
    let transport: Arc<dyn HttpGet> = Arc::new(ReqwestTransport::new()?);
    let registry = FeedRegistry::new(config.sheets.clone(), transport.clone());
    let viewer = FeedViewer::new(registry, transport, config.proxy_url.clone());

    match cli.command {
        Commands::List => {
            let feeds = viewer.list().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&feeds)?);
            } else if feeds.is_empty() {
                println!("No feeds in the sheet.");
            } else {
                for feed in &feeds {
                    let route = if feed.requires_cors_proxy { " (via CORS proxy)" } else { "" };
                    println!("{}{route}", feed.name);
                }
            }
        }
        Commands::Show { name } => {
            let store = config.state_path().map(StateStore::new);
            let name = match name {
                Some(name) => name,
                None => store
                    .as_ref()
                    .and_then(|s| s.load().last_feed)
                    .context("no feed given and none shown before; pass a feed name")?,
            };
            if let Some(store) = &store {
                if let Err(e) = store.remember(&name) {
                    tracing::warn!(path = %store.path().display(), error = %e, "could not save selection");
                }
            }

            let view = viewer.show(&name).await?;
            if view.route.is_proxied() {
                eprintln!("{} is served through the CORS proxy", view.entry.name);
            }
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                println!("{}", view.content.to_pretty_json()?);
            }
        }
    }

    Ok(())
}
