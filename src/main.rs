//! dbtest: datastore health-check service.
//!
//! This is the application entry point. It loads configuration from a TOML
//! file, initializes tracing, resolves the datastore secret, sets up the Axum
//! router and starts the HTTP server.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dbtest::config::{AppConfig, LoggingConfig, StoreConfig, DEFAULT_CONFIG_PATH};
use dbtest::store::{sql::redacted_url, MysqlStore};
use dbtest::{create_router, AppState, Probe};

/// dbtest: probes a MySQL/MariaDB datastore on every health request
#[derive(Parser, Debug)]
#[command(name = "dbtest", version, about)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Log level filter (e.g., "dbtest=debug,tower_http=info")
    #[arg(short, long)]
    log_level: Option<String>,
}

/// Install the global subscriber. Filter priority: CLI > RUST_LOG > config.
fn init_tracing(cli_filter: Option<String>, logging: &LoggingConfig) {
    let log_filter = cli_filter
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| logging.filter_directive());
    let filter = tracing_subscriber::EnvFilter::new(&log_filter);

    if logging.is_json() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(
        format = %logging.format,
        filter = %log_filter,
        "Logging started"
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // A missing or invalid config aborts startup
    let config = AppConfig::load(&args.config)?;

    init_tracing(args.log_level, &config.logging);
    tracing::info!(path = %args.config, "Loaded configuration");

    let store_config = StoreConfig::from_env(&config.mysql);
    tracing::info!(
        url = %redacted_url(&store_config),
        key_column = %store_config.key_column,
        value_column = %store_config.value_column,
        "Datastore configured"
    );

    let probe = Probe::new(Arc::new(MysqlStore::new(store_config)));
    let state = AppState::new(config.clone(), probe);
    let app = create_router(state);

    dbtest::http::start_server(app, &config.http).await?;

    Ok(())
}
