//! Observability module for centralized metrics, tracing, and logging setup.
//!
//! This module provides:
//! - Structured logging with configurable levels and formats
//! - Optional OpenTelemetry span export over OTLP
//! - Prometheus metrics, rendered by the liveness listener
//! - Span helpers shared by the bot, the store and the completion client

pub mod metrics;
pub mod tracing_mod;

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::observability_config::ObservabilityConfig;

pub use metrics::{
    record_completion_metrics, record_menu_action, record_reminder_created,
    record_reminders_fired, record_request_metrics, record_storage_error,
    record_telegram_message, record_tts_metrics, record_uptime,
};
pub use tracing_mod::{completion_span, storage_span, telegram_span};

/// Initialize the complete observability stack with custom configuration
///
/// Returns the Prometheus handle so the liveness listener can serve `/metrics`.
pub async fn init_observability_with_config(
    config: ObservabilityConfig,
) -> Result<Option<PrometheusHandle>> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid observability configuration: {}", e))?;

    // Tracing first so the rest of the setup is logged
    tracing_mod::init_tracing_with_config(&config)?;

    let metrics_handle = metrics::init_metrics_with_config(&config)?;

    tracing_mod::init_opentelemetry_tracing_with_config(&config)?;

    tracing::info!(
        environment = %config.environment,
        otlp_endpoint = ?config.otlp_endpoint,
        metrics_enabled = %metrics_handle.is_some(),
        "Observability stack initialized successfully"
    );
    Ok(metrics_handle)
}

/// Start a background task that periodically records the uptime gauge
pub fn start_uptime_recorder() -> tokio::task::JoinHandle<()> {
    tokio::spawn(async {
        let started = std::time::Instant::now();
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(30));

        loop {
            interval.tick().await;
            record_uptime(started.elapsed().as_secs_f64());
        }
    })
}
