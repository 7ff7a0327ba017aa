use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder};

// Prometheus metrics (default registry)
pub static GUIA_STATUS_UPDATES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "clinica_guia_status_updates_total",
        "Total guide status updates applied"
    )
    .expect("register guia_status_updates_total")
});

pub static TRANSITIONS_REJECTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "clinica_transitions_rejected_total",
        "Status transitions rejected by the workflow rules",
        &["entity"]
    )
    .expect("register transitions_rejected_total")
});

pub static DIVERGENCIAS_DETECTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "clinica_divergencias_detected_total",
        "Divergences found by reconciliation runs",
        &["tipo"]
    )
    .expect("register divergencias_detected_total")
});

pub static DIVERGENCIAS_REGISTERED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "clinica_divergencias_registered_total",
        "Divergences persisted by reconciliation runs"
    )
    .expect("register divergencias_registered_total")
});

pub fn encode_metrics() -> (axum::http::StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {e}"),
        );
    }
    (
        axum::http::StatusCode::OK,
        String::from_utf8(buffer).unwrap_or_default(),
    )
}
