mod api;
mod app;
mod cache;
mod commands;
mod config;
mod event;
mod mutation;
mod notify;
mod query;
mod ui;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use api::ResourceKind;

#[derive(Parser, Debug)]
#[command(name = "bizdesk")]
#[command(about = "A terminal front end for leads, orders, invoices and payments")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/bizdesk/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Base URL of the REST API (overrides BIZDESK_API_URL and the config file)
  #[arg(long)]
  api_url: Option<String>,

  /// Collection to open at startup, e.g. leads, orders, invoices
  #[arg(short, long)]
  resource: Option<String>,

  /// Rows per page
  #[arg(long)]
  page_size: Option<u32>,
}

/// Log to a file in the data directory; the terminal belongs to the UI.
fn init_logging() -> Option<WorkerGuard> {
  let dir = dirs::data_dir()?.join("bizdesk");
  std::fs::create_dir_all(&dir).ok()?;

  let appender = tracing_appender::rolling::never(dir, "bizdesk.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bizdesk=info"));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .init();
  Some(guard)
}

/// Restore the terminal before the color-eyre panic report is printed
fn install_panic_hook() {
  let report = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    let _ = app::restore_terminal();
    report(info);
  }));
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;
  install_panic_hook();
  let _log_guard = init_logging();

  let args = Args::parse();

  // Load configuration; command line wins over environment and file
  let mut config = config::Config::load(args.config.as_deref(), args.api_url.as_deref())?;

  if let Some(resource) = args.resource {
    let kind = ResourceKind::parse(&resource).ok_or_else(|| eyre!("Unknown resource '{}'", resource))?;
    config.default_resource = kind.collection().to_string();
  }
  if let Some(page_size) = args.page_size {
    if page_size == 0 {
      return Err(eyre!("--page-size must be greater than zero"));
    }
    config.page_size = page_size;
  }

  tracing::info!(api = %config.api.base_url, "starting");

  // Initialize and run the app
  let mut app = app::App::new(config)?;
  app.run().await?;

  Ok(())
}
