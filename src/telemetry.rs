//! Telemetry and structured logging for render requests.

use crate::job::{JobStatus, RenderJob};
use opentelemetry::trace::{Span, Tracer};
use opentelemetry::{global, KeyValue};
use tracing::{debug, info, warn};

const TRACER_NAME: &str = "markdown-pdf-service";

/// Renders slower than this are logged as a warning.
const SLOW_RENDER_MS: i64 = 5000;

/// Emits an OpenTelemetry span and a structured log line for a finished request.
///
/// Without an installed tracer provider the span goes to the global no-op tracer,
/// so this is safe to call unconditionally.
pub fn record_render_telemetry(job: &RenderJob) {
    let tracer = global::tracer(TRACER_NAME);
    let mut span = tracer.start("render_job");

    span.set_attribute(KeyValue::new("job_id", job.job_id.clone()));
    span.set_attribute(KeyValue::new("kind", job.kind.to_string()));
    span.set_attribute(KeyValue::new("status", job.status.to_string()));
    span.set_attribute(KeyValue::new("part_count", job.part_count as i64));

    if let Some(ref name) = job.artifact_name {
        span.set_attribute(KeyValue::new("artifact_name", name.clone()));
    }
    if let Some(byte_len) = job.byte_len {
        span.set_attribute(KeyValue::new("byte_len", byte_len as i64));
    }

    if let Some(duration_ms) = job.processing_duration_ms() {
        span.set_attribute(KeyValue::new("duration_ms", duration_ms));

        info!(
            job_id = %job.job_id,
            kind = %job.kind,
            status = %job.status,
            duration_ms = duration_ms,
            artifact = job.artifact_name.as_deref().unwrap_or("-"),
            bytes = job.byte_len.unwrap_or(0),
            "Render request finished"
        );

        if duration_ms > SLOW_RENDER_MS {
            warn!(
                job_id = %job.job_id,
                duration_ms = duration_ms,
                "Render exceeded performance threshold ({}ms)",
                SLOW_RENDER_MS
            );
        }
    }

    if job.status == JobStatus::Failed {
        if let Some(ref error) = job.error {
            span.set_attribute(KeyValue::new("error", error.clone()));
            warn!(
                job_id = %job.job_id,
                kind = %job.kind,
                error = %error,
                "Render request failed"
            );
        }
    }

    span.end();

    if let Ok(record) = serde_json::to_string(job) {
        debug!(job = %record, "Render job record");
    }
}

/// Installs an OTLP batch exporter as the global tracer provider.
///
/// Must run inside the Tokio runtime.
pub fn init_telemetry(endpoint: &str, service_name: &str) -> Result<(), Box<dyn std::error::Error>> {
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::trace::Config;

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint),
        )
        .with_trace_config(Config::default().with_resource(
            opentelemetry_sdk::Resource::new(vec![
                KeyValue::new("service.name", service_name.to_string()),
                KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            ]),
        ))
        .install_batch(opentelemetry_sdk::runtime::Tokio)?;

    if let Some(provider) = tracer.provider() {
        global::set_tracer_provider(provider);
    }

    info!("Telemetry initialized: endpoint={}", endpoint);
    Ok(())
}

/// Flushes pending spans before the process exits.
pub fn shutdown_telemetry() {
    global::shutdown_tracer_provider();
}
