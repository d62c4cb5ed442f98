//! Markdown to PDF HTTP service.
//!
//! ## Configuration
//!
//! Environment variables (a `.env` file is read first when present):
//! - `SUPABASE_URL`, `SUPABASE_KEY`: object store endpoint and key (required)
//! - `STORAGE_BUCKET`: bucket for rendered PDFs (default: avatars)
//! - `PORT` / `HOST`: listen address (default: 0.0.0.0:3003)
//! - `MAX_CONCURRENT_RENDERS`: open browser sessions at once (default: 4)
//! - `RENDER_TIMEOUT_SECS`: per-render deadline (default: 30)
//! - `BODY_LIMIT_BYTES`: request body cap (default: 5 MiB)
//! - `CHROME_PATH`: browser binary (default: auto-detect)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP collector endpoint (unset disables export)
//! - `LOG_FORMAT`: `text` or `json` (default: text)
//! - `RUST_LOG`: Log level (default: info)

use anyhow::{Context, Result};
use markdown_pdf_service::config::{LogFormat, ServiceConfig};
use markdown_pdf_service::converter::{ChromeLauncher, HtmlToPdfConverter};
use markdown_pdf_service::routes;
use markdown_pdf_service::service::RenderService;
use markdown_pdf_service::storage::SupabaseStorage;
use markdown_pdf_service::telemetry;
use markdown_pdf_service::template::DocumentTemplate;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServiceConfig::from_env().context("Failed to load configuration")?;

    init_logging(config.log_format);

    if let Some(endpoint) = config.otlp_endpoint.as_deref() {
        if let Err(e) = telemetry::init_telemetry(endpoint, &config.service_name) {
            warn!("Failed to initialize telemetry: {}", e);
        }
    }

    info!("Starting markdown to PDF service");
    info!(
        "Configuration: bucket={}, max_concurrent_renders={}, render_timeout_secs={}, body_limit_bytes={}",
        config.bucket,
        config.max_concurrent_renders,
        config.render_timeout.as_secs(),
        config.body_limit_bytes
    );

    let http = reqwest::Client::builder()
        .timeout(config.render_timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let store = SupabaseStorage::new(
        http.clone(),
        &config.storage_url,
        config.storage_key.clone(),
        config.bucket.clone(),
    );

    let launcher = ChromeLauncher::new(config.chrome_path.clone(), config.render_timeout);
    let converter = HtmlToPdfConverter::new(
        Arc::new(launcher),
        config.max_concurrent_renders,
        config.render_timeout,
    );

    let service = RenderService::new(
        DocumentTemplate::new(config.default_logo_url.clone()),
        converter,
        Arc::new(store),
        http,
    );

    let app = routes::router(Arc::new(service), config.body_limit_bytes);

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Server running on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    telemetry::shutdown_telemetry();
    info!("Service shutdown complete");
    Ok(())
}

fn init_logging(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal, finishing in-flight requests...");
}
