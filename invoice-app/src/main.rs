//! # Invoice Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the ledger store adapter
//! - Create the invoice service
//! - Start the HTTP server

mod config;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use invoice_hex::{InvoiceService, inbound::HttpServer};
use invoice_repo::build_repo;

use config::{Config, LogFormat};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,invoice_app=debug,invoice_hex=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Text => registry.with(fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    init_tracing(config.log_format);

    tracing::info!("Starting invoice server on port {}", config.port);
    tracing::info!("Using database: {}", config.database_url);
    tracing::debug!(
        timeout_ms = config.request_timeout.as_millis() as u64,
        "Request deadline"
    );

    // Build repository (handles connection and migration)
    let repo = build_repo(&config.database_url).await?;

    // Create the invoice service
    let service = InvoiceService::with_timeout(repo, config.request_timeout);

    // Create and run the HTTP server
    let server = HttpServer::new(service);
    let addr = format!("0.0.0.0:{}", config.port);

    server.run(&addr).await?;

    tracing::info!("Server stopped");
    Ok(())
}
