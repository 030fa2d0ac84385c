//! The association website: public pages in French and Breton, and a small
//! back office for articles, agenda events and accounts.
//!
//! ```text
//! capsule-site --config config/site.toml --bind 0.0.0.0:8080
//! ```

mod admin;
mod app;
mod auth;
mod i18n;
mod pages;
mod repo;
mod session;
mod settings;
mod views;

use std::path::PathBuf;
use std::time::Duration;

use capsule::{config, logging, Server};
use clap::Parser;
use tracing::{debug, info};

use crate::settings::Settings;

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser, Debug)]
#[command(name = "capsule-site", version, about = "Association website")]
struct Cli {
    /// Configuration file.
    #[arg(short, long, default_value = "config/site.toml")]
    config: PathBuf,

    /// Overrides `server.bind`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut settings: Settings = config::load(&cli.config)?;
    if let Some(bind) = cli.bind {
        settings.server.bind = bind;
    }

    logging::init(&settings.log);
    info!(config = %cli.config.display(), bind = %settings.server.bind, "capsule-site starting");

    let app = app::build(&settings)?;

    let sessions = app.sessions.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(PURGE_INTERVAL);
        loop {
            tick.tick().await;
            let purged = sessions.purge_expired();
            if purged > 0 {
                debug!(purged, "expired sessions removed");
            }
        }
    });

    Server::from_config(&settings.server)?.serve(app.router).await?;

    info!("shutdown complete");
    Ok(())
}
