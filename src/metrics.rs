//! Lightweight metrics helpers for Fulcrum.
//!
//! Thin wrappers over the `metrics` crate macros. No concrete exporter is
//! embedded; the application can install any compatible recorder. Metric
//! families:
//! * `fulcrum_reloads_total` (counter, label `result`)
//! * `fulcrum_publish_retries_total` (counter, label `node_id`)
//! * `fulcrum_snapshot_version` (gauge, label `node_id`)
//! * `fulcrum_authz_checks_total` (counter, label `decision`)
use metrics::{Unit, counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::Lazy;

// Fulcrum-specific metric names
pub const FULCRUM_RELOADS_TOTAL: &str = "fulcrum_reloads_total";
pub const FULCRUM_PUBLISH_RETRIES_TOTAL: &str = "fulcrum_publish_retries_total";
pub const FULCRUM_SNAPSHOT_VERSION: &str = "fulcrum_snapshot_version";
pub const FULCRUM_AUTHZ_CHECKS_TOTAL: &str = "fulcrum_authz_checks_total";

static DESCRIBE: Lazy<()> = Lazy::new(|| {
    describe_counter!(
        FULCRUM_RELOADS_TOTAL,
        Unit::Count,
        "Total reload cycles processed, by result."
    );
    describe_counter!(
        FULCRUM_PUBLISH_RETRIES_TOTAL,
        Unit::Count,
        "Snapshot publish attempts that failed and were retried."
    );
    describe_gauge!(
        FULCRUM_SNAPSHOT_VERSION,
        "Version of the last snapshot published per node."
    );
    describe_counter!(
        FULCRUM_AUTHZ_CHECKS_TOTAL,
        Unit::Count,
        "Authorization check requests evaluated, by decision."
    );
});

/// Register metric descriptions with the installed recorder.
pub fn describe_metrics() {
    Lazy::force(&DESCRIBE);
}

pub fn record_reload(success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!(FULCRUM_RELOADS_TOTAL, "result" => result).increment(1);
}

pub fn record_publish_retry(node_id: &str) {
    counter!(FULCRUM_PUBLISH_RETRIES_TOTAL, "node_id" => node_id.to_string()).increment(1);
}

pub fn record_snapshot_version(node_id: &str, version: u64) {
    gauge!(FULCRUM_SNAPSHOT_VERSION, "node_id" => node_id.to_string()).set(version as f64);
}

pub fn record_authz_check(decision: &'static str) {
    counter!(FULCRUM_AUTHZ_CHECKS_TOTAL, "decision" => decision).increment(1);
}
