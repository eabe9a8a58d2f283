//! Metrics collection and Prometheus export module.
//!
//! The recorder is installed once at startup; the rendered exposition is
//! served by the liveness listener under `/metrics`. Every `record_*`
//! function is safe to call without an installed recorder.

use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

use crate::observability_config::ObservabilityConfig;

/// Initialize metrics collection with Prometheus exporter and configuration
///
/// Returns `None` when metrics export is disabled.
pub fn init_metrics_with_config(config: &ObservabilityConfig) -> Result<Option<PrometheusHandle>> {
    if !config.enable_metrics_export {
        tracing::info!("Metrics export disabled");
        return Ok(None);
    }

    let mut builder = PrometheusBuilder::new();
    for (key, value) in config.get_tags() {
        builder = builder.add_global_label(key, value);
    }
    let handle = builder.install_recorder()?;

    tracing::info!("Metrics collection initialized");
    Ok(Some(handle))
}

fn result_label(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "failure"
    }
}

/// Record Telegram message processing metrics
pub fn record_telegram_message(message_type: &str) {
    let message_type = message_type.to_string();
    metrics::counter!("telegram_messages_total", "type" => message_type).increment(1);
}

/// Record how long a Telegram update took to handle
pub fn record_request_metrics(kind: &str, success: bool, duration: Duration) {
    let kind = kind.to_string();
    metrics::counter!("requests_total", "kind" => kind.clone(), "result" => result_label(success))
        .increment(1);
    metrics::histogram!("request_duration_seconds", "kind" => kind)
        .record(duration.as_secs_f64());
}

/// Record which menu action a message was dispatched to
pub fn record_menu_action(action: &str) {
    let action = action.to_string();
    metrics::counter!("menu_actions_total", "action" => action).increment(1);
}

/// Record a completion API round trip
pub fn record_completion_metrics(success: bool, duration: Duration) {
    metrics::counter!("completion_requests_total", "result" => result_label(success)).increment(1);
    metrics::histogram!("completion_duration_seconds").record(duration.as_secs_f64());
}

/// Record a speech synthesis attempt
pub fn record_tts_metrics(success: bool, duration: Duration, audio_bytes: usize) {
    metrics::counter!("tts_requests_total", "result" => result_label(success)).increment(1);
    metrics::histogram!("tts_duration_seconds").record(duration.as_secs_f64());
    if success {
        metrics::histogram!("tts_audio_size_bytes").record(audio_bytes as f64);
    }
}

/// Record reminders delivered on a scheduler tick
pub fn record_reminders_fired(delivered: usize, failed: usize) {
    metrics::counter!("reminders_fired_total").increment(delivered as u64);
    metrics::counter!("reminder_delivery_failures_total").increment(failed as u64);
}

/// Record a reminder accepted from a user
pub fn record_reminder_created() {
    metrics::counter!("reminders_created_total").increment(1);
}

/// Record a state store read or write failure
pub fn record_storage_error(document: &str, operation: &str) {
    let document = document.to_string();
    let operation = operation.to_string();
    metrics::counter!("storage_errors_total", "document" => document, "operation" => operation)
        .increment(1);
}

/// Record application uptime
pub fn record_uptime(uptime_secs: f64) {
    metrics::gauge!("application_uptime_seconds").set(uptime_secs);
}
