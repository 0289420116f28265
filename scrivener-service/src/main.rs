use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

mod api;
mod config;
mod error;
mod ocr;
mod service;
mod store;
mod websocket;

use crate::config::StaticConfig;
use crate::ocr::TesseractEngine;
use crate::service::ScrivenerService;

// Re-export config crate types to avoid namespace collision
use ::config::{Config as ConfigBuilder, Environment, File};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_logging();

    info!("Starting Scrivener service v{}", env!("CARGO_PKG_VERSION"));

    // Load static configuration (server binding, storage paths, OCR settings)
    let static_config: StaticConfig = ConfigBuilder::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(
            Environment::with_prefix("SCRIVENER")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    info!(
        host = %static_config.server.host,
        port = static_config.server.port,
        "Static configuration loaded"
    );

    // Spool directory must exist before the first upload lands
    std::fs::create_dir_all(&static_config.storage.spool_dir)?;

    let config = Arc::new(static_config);

    // Initialize the OCR engine and the service
    let ocr = Arc::new(TesseractEngine::new(&config.ocr));
    info!(
        command = %config.ocr.command.display(),
        language = %config.ocr.language,
        "Tesseract engine initialized"
    );
    let service = Arc::new(ScrivenerService::new(config.clone(), ocr));

    // Build the router
    let app = api::router(service);

    // Start the server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let format = fmt::format()
        .with_target(true)
        .with_thread_ids(true)
        .compact();

    // Use RUST_LOG if set, otherwise default to info level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("scrivener_service=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter)
        .init();
}
