// Cadenza - terminal music search and playback through mpv

use anyhow::Result;
use cadenza::config::AppConfig;
use cadenza::player::shutdown;
use cadenza::settings::SettingsStore;
use cadenza::ui::{theme, App};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cadenza", version, about = "Terminal music search and playback")]
struct Cli {
    /// Alternate config file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "cadenza=trace"
    #[arg(long)]
    log: Option<String>,

    /// Search and play immediately, skipping the menu
    #[arg(long)]
    play: Option<String>,
}

/// Logs go to a rolling file under the cache dir - the terminal belongs
/// to the UI. The guard must live until exit to flush the writer.
fn init_tracing(
    cache_dir: &Path,
    filter: Option<&str>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = cache_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok()?;

    let appender = tracing_appender::rolling::daily(log_dir, "cadenza.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let env_filter = match filter {
        Some(f) => EnvFilter::new(f),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Some(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    let settings_store = SettingsStore::new()?;
    let settings = settings_store.load()?;

    let _log_guard = init_tracing(&settings.cache_dir, cli.log.as_deref());

    theme::set_theme(&settings.theme);

    // registered once, before any session can exist
    shutdown::install();

    let mut app = App::new(config, settings_store, settings)?;
    if let Some(query) = cli.play {
        return app.play_query(&query).await;
    }
    app.run().await
}
