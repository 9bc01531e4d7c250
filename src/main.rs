//! Burstbot binary: wires the webhook, buffer, answerer, and notifier.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;

use burstbot::answer::ChatAnswerer;
use burstbot::answer::history::SessionHistory;
use burstbot::buffer::{Aggregator, DebounceScheduler, RedisBufferStore};
use burstbot::config::Config;
use burstbot::notify::EvolutionNotifier;
use burstbot::server::{self, AppState};

#[derive(Parser, Debug)]
#[command(
    name = "burstbot",
    about = "WhatsApp assistant that answers coalesced message bursts"
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "burstbot.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("burstbot=info")),
        )
        .init();

    let config = Config::load(Some(&cli.config)).context("failed to load configuration")?;

    let redis_client =
        redis::Client::open(config.redis_url.as_str()).context("invalid redis url")?;
    let connection = redis::aio::ConnectionManager::new(redis_client)
        .await
        .context("failed to connect to redis")?;

    // Process-wide singletons, built once and shared by handle.
    let store = Arc::new(RedisBufferStore::new(connection.clone()));
    let history = SessionHistory::new(
        connection,
        config.history.ttl_seconds,
        config.history.max_turns,
    );
    let answerer = Arc::new(ChatAnswerer::new(config.llm.clone(), history));
    let notifier = Arc::new(EvolutionNotifier::new(config.evolution.clone()));

    let scheduler = DebounceScheduler::new(config.quiet_period(), store.clone(), answerer, notifier);
    let aggregator = Arc::new(Aggregator::new(store, scheduler.clone(), config.buffer_ttl()));

    let app = server::router(AppState { aggregator });
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "burstbot listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await
        .context("server error")?;

    // Unflushed buffers are left to their TTL; see the scheduler docs.
    scheduler.shutdown().await;
    Ok(())
}
