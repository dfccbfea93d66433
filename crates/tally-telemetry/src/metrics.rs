//! Prometheus metrics for the watcher and ledger.
//!
//! All metrics follow the naming convention: `tc_<component>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Events applied to the ledger, by kind
    pub static ref WATCHER_EVENTS_APPLIED: CounterVec = CounterVec::new(
        Opts::new("tc_watcher_events_applied_total", "Events applied to the ledger"),
        &["kind"]
    ).expect("metric creation failed");

    /// Fire-and-forget persistence failures, by store operation
    pub static ref WATCHER_PERSISTENCE_FAILURES: CounterVec = CounterVec::new(
        Opts::new(
            "tc_watcher_persistence_failures_total",
            "Store writes that failed during live processing"
        ),
        &["operation"]
    ).expect("metric creation failed");

    /// Chain reorganisations observed (each one halts the watcher)
    pub static ref WATCHER_REORGS: Counter = Counter::new(
        "tc_watcher_reorgs_total",
        "Retractions of already-applied events"
    ).expect("metric creation failed");

    /// Block watermark
    pub static ref WATCHER_LAST_PROCESSED_BLOCK: Gauge = Gauge::new(
        "tc_watcher_last_processed_block",
        "Highest block whose events have been applied"
    ).expect("metric creation failed");

    /// Members by status
    pub static ref LEDGER_MEMBERS: GaugeVec = GaugeVec::new(
        Opts::new("tc_ledger_members", "Ledger members by status"),
        &["status"]
    ).expect("metric creation failed");

    /// Checkpoints created
    pub static ref LEDGER_CHECKPOINTS: Counter = Counter::new(
        "tc_ledger_checkpoints_total",
        "Checkpoints created from confirmed commitments"
    ).expect("metric creation failed");
}

/// Register every metric with [`REGISTRY`]. Safe to call more than once.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(WATCHER_EVENTS_APPLIED.clone()),
        Box::new(WATCHER_PERSISTENCE_FAILURES.clone()),
        Box::new(WATCHER_REORGS.clone()),
        Box::new(WATCHER_LAST_PROCESSED_BLOCK.clone()),
        Box::new(LEDGER_MEMBERS.clone()),
        Box::new(LEDGER_CHECKPOINTS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all registered metrics as Prometheus text format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Count one applied event.
pub fn record_event_applied(kind: &str) {
    WATCHER_EVENTS_APPLIED.with_label_values(&[kind]).inc();
}

/// Count one failed store write.
pub fn record_persistence_failure(operation: &str) {
    WATCHER_PERSISTENCE_FAILURES
        .with_label_values(&[operation])
        .inc();
}

/// Count one reorg.
pub fn record_reorg() {
    WATCHER_REORGS.inc();
}

/// Publish the block watermark.
pub fn set_last_processed_block(block_number: u64) {
    WATCHER_LAST_PROCESSED_BLOCK.set(block_number as f64);
}

/// Publish member counts.
pub fn set_member_counts(active: usize, inactive: usize) {
    LEDGER_MEMBERS
        .with_label_values(&["active"])
        .set(active as f64);
    LEDGER_MEMBERS
        .with_label_values(&["inactive"])
        .set(inactive as f64);
}

/// Count one checkpoint.
pub fn record_checkpoint() {
    LEDGER_CHECKPOINTS.inc();
}
