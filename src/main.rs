//! Web front end for an Avalon game server.
//!
//! Usage:
//!   avalon-web                        Serve the controller and viewer pages
//!   avalon-web serve --listen ADDR    Same, on a chosen address
//!   avalon-web transcript <game_id>   Print a finished game as plain text
//!   avalon-web stats                  Win rates across all logged games

mod api;
mod conf;
mod controller;
mod error;
mod forms;
mod models;
mod routes;
mod state;
mod templates;
mod viewer;
mod ws;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;

use crate::api::{GameApi, HttpGameApi};
use crate::conf::Config;
use crate::state::AppState;
use crate::viewer::stats::WinStats;

#[derive(Parser)]
#[command(name = "avalon-web", version, about, long_about = None)]
struct Cli {
  /// Game server base URL (overrides AVALON_BACKEND_URL)
  #[arg(long, global = true)]
  backend_url: Option<String>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the web UI (default)
  Serve {
    /// Address to listen on (overrides AVALON_LISTEN)
    #[arg(long)]
    listen: Option<String>,
    /// Status poll interval in milliseconds (overrides AVALON_POLL_MS)
    #[arg(long)]
    poll_ms: Option<u64>,
  },
  /// Print the transcript of one logged game
  Transcript { game_id: String },
  /// Summarize wins across all logged games
  Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "avalon_web=info,tower_http=info".into()),
    )
    .init();

  let mut config = Config::load();
  if let Some(url) = cli.backend_url {
    config.backend_url = url;
  }
  let api = Arc::new(
    HttpGameApi::new(&config.backend_url, config.request_timeout())
      .context("configuring the game server client")?,
  );

  match cli.command.unwrap_or(Command::Serve {
    listen: None,
    poll_ms: None,
  }) {
    Command::Serve { listen, poll_ms } => {
      if let Some(listen) = listen {
        config.listen = listen;
      }
      if let Some(poll_ms) = poll_ms {
        config.poll_ms = poll_ms;
      }
      serve(api, config).await
    }
    Command::Transcript { game_id } => {
      let log = api
        .get_log(&game_id)
        .await
        .with_context(|| format!("loading game {game_id}"))?;
      print!("{}", viewer::transcript::transcript(&log));
      Ok(())
    }
    Command::Stats => {
      let list = api.list_logs().await.context("listing game logs")?;
      let mut logs = Vec::with_capacity(list.logs.len());
      for summary in &list.logs {
        match api.get_log(&summary.game_id).await {
          Ok(log) => logs.push(log),
          Err(e) => tracing::warn!(game_id = %summary.game_id, error = %e, "skipping unreadable log"),
        }
      }
      println!("{}", WinStats::collect(&logs));
      Ok(())
    }
  }
}

async fn serve(api: Arc<HttpGameApi>, config: Config) -> Result<()> {
  let listen = config.listen.clone();
  tracing::info!(backend = %config.backend_url, poll_ms = config.poll_ms, "using game server");

  let state = AppState::new(api, config);
  let app = routes::app(state);

  let listener = tokio::net::TcpListener::bind(&listen)
    .await
    .with_context(|| format!("binding {listen}"))?;
  tracing::info!("Server listening on {}", listen);
  axum::serve(listener, app).await?;
  Ok(())
}
