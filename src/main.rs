// lofiplayer - terminal audio playlist player
// Loads a catalog from a music server or local folders and plays it

use anyhow::Result;
use clap::Parser;
use lofiplayer::{ui::App, Config};
use std::path::PathBuf;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lofiplayer")]
#[command(about = "A terminal audio playlist player with search and shuffle")]
struct Args {
    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base URL of a catalog server exposing /api/audio
    #[arg(long)]
    endpoint: Option<String>,

    /// Scan this directory instead of the configured ones (repeatable)
    #[arg(long = "dir")]
    dirs: Vec<PathBuf>,

    /// Enable developer logging (debug level in the log file)
    #[arg(long)]
    dev: bool,
}

fn init_logging(dev: bool) -> Result<WorkerGuard> {
    let log_dir = PathBuf::from("logs");
    std::fs::create_dir_all(&log_dir)?;

    // Daily rotating file appender; the terminal belongs to the UI
    let file_appender = tracing_appender::rolling::daily(&log_dir, "lofiplayer.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let default_filter = if dev { "debug" } else { "info,lofiplayer=debug" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = tracing_subscriber::fmt()
        .with_writer(file_writer)
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_env_filter(filter)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(guard)
}

fn apply_overrides(config: &mut Config, args: &Args) {
    if !args.dirs.is_empty() {
        config.catalog.music_directories = args.dirs.clone();
        config.catalog.endpoint = None;
    }
    if let Some(endpoint) = &args.endpoint {
        config.catalog.endpoint = Some(endpoint.clone());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging(args.dev)?;

    info!("lofiplayer starting up");

    let mut config = Config::load(args.config.as_deref())?;
    apply_overrides(&mut config, &args);

    let mut app = App::new(config)?;
    app.run().await?;

    Ok(())
}
