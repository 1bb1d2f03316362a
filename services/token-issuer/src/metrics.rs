//! Prometheus metrics for the token issuer.
//!
//! Provides counters, histograms, and gauges for observability.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_gauge, CounterVec, HistogramVec,
    IntGauge,
};

/// Certificate refresh cycles by outcome.
pub static CERTIFICATE_REFRESHES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "token_issuer_certificate_refreshes_total",
        "Total number of certificate refresh cycles",
        &["outcome"]
    )
    .unwrap_or_else(|e| panic!("Failed to register certificate_refreshes metric: {e}"))
});

/// Credentials in the live signing set.
pub static INSTALLED_CREDENTIALS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "token_issuer_installed_credentials",
        "Number of signing credentials currently accepted for validation"
    )
    .unwrap_or_else(|e| panic!("Failed to register installed_credentials metric: {e}"))
});

/// Tokens issued counter.
pub static TOKENS_ISSUED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "token_issuer_tokens_issued_total",
        "Total number of tokens issued",
        &["grant_type", "token_type", "algorithm"]
    )
    .unwrap_or_else(|e| panic!("Failed to register tokens_issued metric: {e}"))
});

/// Rejected token requests counter.
pub static REQUEST_REJECTIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "token_issuer_request_rejections_total",
        "Total number of rejected token requests",
        &["error"]
    )
    .unwrap_or_else(|e| panic!("Failed to register request_rejections metric: {e}"))
});

/// Token exchange latency histogram.
pub static EXCHANGE_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "token_issuer_exchange_latency_seconds",
        "Token exchange latency in seconds",
        &["grant_type"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .unwrap_or_else(|e| panic!("Failed to register exchange_latency metric: {e}"))
});

/// Record a certificate refresh cycle.
pub fn record_certificate_refresh(outcome: &str) {
    CERTIFICATE_REFRESHES.with_label_values(&[outcome]).inc();
}

/// Record the size of the installed credential set.
pub fn set_installed_credentials(count: usize) {
    INSTALLED_CREDENTIALS.set(i64::try_from(count).unwrap_or(i64::MAX));
}

/// Record a token issuance.
pub fn record_token_issued(grant_type: &str, token_type: &str, algorithm: &str) {
    TOKENS_ISSUED
        .with_label_values(&[grant_type, token_type, algorithm])
        .inc();
}

/// Record a rejected request.
pub fn record_rejection(error: &str) {
    REQUEST_REJECTIONS.with_label_values(&[error]).inc();
}

/// Record token exchange latency.
pub fn record_exchange_latency(grant_type: &str, duration_secs: f64) {
    EXCHANGE_LATENCY
        .with_label_values(&[grant_type])
        .observe(duration_secs);
}
