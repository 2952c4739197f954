use std::time::Duration;

use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, TextEncoder,
};

static RECORDS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "leaderboard_records_total",
            "Stream records handled by the ingestion pipeline",
        ),
        &["outcome"],
    )
    .expect("failed to create leaderboard_records_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register leaderboard_records_total");
    counter
});

static STORE_WRITE_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "leaderboard_store_write_failures_total",
            "Failed store writes from the ingestion pipeline",
        ),
        &["store"],
    )
    .expect("failed to create leaderboard_store_write_failures_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register leaderboard_store_write_failures_total");
    counter
});

static COMMIT_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "leaderboard_commit_failures_total",
        "Failed stream offset commits",
    )
    .expect("failed to create leaderboard_commit_failures_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register leaderboard_commit_failures_total");
    counter
});

static FETCH_ERRORS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "leaderboard_fetch_errors_total",
        "Errors while fetching the next stream record",
    )
    .expect("failed to create leaderboard_fetch_errors_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register leaderboard_fetch_errors_total");
    counter
});

static RECONCILE_PASSES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "leaderboard_reconcile_passes_total",
            "Rank reconciliation passes by result",
        ),
        &["result"],
    )
    .expect("failed to create leaderboard_reconcile_passes_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register leaderboard_reconcile_passes_total");
    counter
});

static RECONCILE_ROW_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "leaderboard_reconcile_row_failures_total",
        "Rank writes that failed during reconciliation",
    )
    .expect("failed to create leaderboard_reconcile_row_failures_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register leaderboard_reconcile_row_failures_total");
    counter
});

static RECONCILE_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    let histogram = Histogram::with_opts(
        HistogramOpts::new(
            "leaderboard_reconcile_duration_seconds",
            "Wall time of a reconciliation pass",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
    )
    .expect("failed to create leaderboard_reconcile_duration_seconds");
    prometheus::default_registry()
        .register(Box::new(histogram.clone()))
        .expect("failed to register leaderboard_reconcile_duration_seconds");
    histogram
});

pub fn record_applied() {
    RECORDS_TOTAL.with_label_values(&["applied"]).inc();
}

pub fn record_poison() {
    RECORDS_TOTAL.with_label_values(&["poison"]).inc();
}

/// `store` is `fast` or `durable`
pub fn record_store_write_failure(store: &str) {
    STORE_WRITE_FAILURES_TOTAL.with_label_values(&[store]).inc();
}

pub fn record_commit_failure() {
    COMMIT_FAILURES_TOTAL.inc();
}

pub fn record_fetch_error() {
    FETCH_ERRORS_TOTAL.inc();
}

pub fn observe_reconcile_pass(elapsed: Duration, failed_rows: u64) {
    RECONCILE_PASSES_TOTAL.with_label_values(&["ok"]).inc();
    RECONCILE_ROW_FAILURES_TOTAL.inc_by(failed_rows);
    RECONCILE_DURATION_SECONDS.observe(elapsed.as_secs_f64());
}

pub fn record_reconcile_scan_failure() {
    RECONCILE_PASSES_TOTAL.with_label_values(&["scan_failed"]).inc();
}

pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
