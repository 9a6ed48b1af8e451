//! Prometheus metrics for statement-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter, CounterVec, Encoder,
    HistogramVec, IntCounter, TextEncoder,
};

/// Preview requests by outcome (`ok`, `quota`, `no_text`, `unsupported`, `empty`).
pub static PREVIEWS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "statement_previews_total",
        "Total number of statement previews",
        &["outcome"]
    )
    .expect("Failed to register PREVIEWS")
});

/// Rows produced per extraction tier (`fast`, `strong`, `regex`).
pub static EXTRACTION_ROWS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "statement_extraction_rows_total",
        "Candidate rows produced by extraction",
        &["tier"]
    )
    .expect("Failed to register EXTRACTION_ROWS")
});

pub static ESCALATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "statement_escalations_total",
        "Fast-tier results re-run on the strong tier",
        &["reason"]
    )
    .expect("Failed to register ESCALATIONS")
});

pub static CATEGORIZATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "statement_categorizations_total",
        "Category assignments by source",
        &["source"]
    )
    .expect("Failed to register CATEGORIZATIONS")
});

pub static PROVIDER_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "statement_provider_latency_seconds",
        "LLM provider call latency in seconds",
        &["tier"],
        vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]
    )
    .expect("Failed to register PROVIDER_LATENCY")
});

pub static TRANSACTIONS_INSERTED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "statement_transactions_inserted_total",
        "Transactions persisted by confirm"
    )
    .expect("Failed to register TRANSACTIONS_INSERTED")
});

pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "statement_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&PREVIEWS);
    Lazy::force(&EXTRACTION_ROWS);
    Lazy::force(&ESCALATIONS);
    Lazy::force(&CATEGORIZATIONS);
    Lazy::force(&PROVIDER_LATENCY);
    Lazy::force(&TRANSACTIONS_INSERTED);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get all metrics as Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub fn record_preview(outcome: &str) {
    PREVIEWS.with_label_values(&[outcome]).inc();
}

pub fn record_extraction_rows(tier: &str, rows: usize) {
    EXTRACTION_ROWS
        .with_label_values(&[tier])
        .inc_by(rows as f64);
}

pub fn record_escalation(reason: &str) {
    ESCALATIONS.with_label_values(&[reason]).inc();
}

pub fn record_categorization(source: &str) {
    CATEGORIZATIONS.with_label_values(&[source]).inc();
}

pub fn record_provider_latency(tier: &str, duration_secs: f64) {
    PROVIDER_LATENCY
        .with_label_values(&[tier])
        .observe(duration_secs);
}

pub fn record_transactions_inserted(count: u64) {
    TRANSACTIONS_INSERTED.inc_by(count);
}

pub fn record_db_query(operation: &str, duration_secs: f64) {
    DB_QUERY_DURATION
        .with_label_values(&[operation])
        .observe(duration_secs);
}
