use std::sync::Arc;

use airtime::config::{Config, USAGE};
use airtime::kernel::time;
use airtime::outputs::CsvSink;
use airtime::services::listeners::ListenerService;
use airtime::{Reactor, ReactorConfig};
use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Setup Logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    // 2. Configuration (fatal before any polling)
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            return Err(e).context("invalid configuration");
        }
    };
    tracing::info!(?config, "airtime starting");

    // 3. Collaborators
    let source = ListenerService::new(config.listeners_url.clone(), &config.api_key, config.fetch_timeout)
        .context("building listener client")?;
    let sink = Arc::new(CsvSink::new(config.output_dir.clone(), config.export_prefix.clone()));
    let mut reactor = Reactor::new(source, sink, ReactorConfig::from(&config), time::now());

    // 4. Ctrl+C cancels the reactor; it flushes and drains before returning
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("shutdown requested");
                signal_token.cancel();
            }
            Err(e) => tracing::error!("failed to listen for ctrl-c: {}", e),
        }
    });

    reactor.run(shutdown).await;
    Ok(())
}
