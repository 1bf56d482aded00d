//! Instrumentation for the pipeline, built on the `metrics` facade crate
//! (the teacher workspace pins the same `metrics = "0.21.1"`). Recording
//! is a cheap no-op until [`install_recorder`] installs an exporter, so
//! every crate can call these helpers unconditionally.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Highest raw block/transaction/log number observed per topic, mirroring
/// the upstream `MaxBlockNumber*RawGauge` metrics.
pub fn set_max_block_number_raw(topic: &str, block_number: i64) {
    metrics::gauge!("icon_addresses_max_block_number_raw", block_number as f64, "topic" => topic.to_owned());
}

/// Depth of a loader's bounded input queue, used to watch for the
/// backpressure described in §5.
pub fn set_loader_queue_depth(loader: &'static str, depth: usize) {
    metrics::gauge!("icon_addresses_loader_queue_depth", depth as f64, "loader" => loader);
}

/// One upsert committed by a loader.
pub fn record_upsert(table: &'static str) {
    metrics::counter!("icon_addresses_upserts_total", 1, "table" => table);
}

/// One duplicate-key swallowed on an insert-only index table (§4.3.1, §7).
pub fn record_duplicate_key(table: &'static str) {
    metrics::counter!("icon_addresses_duplicate_keys_total", 1, "table" => table);
}

/// One re-enrichment message handed from one loader to another (§4.3.2).
pub fn record_enrichment_trigger(from: &'static str, to: &'static str) {
    metrics::counter!("icon_addresses_enrichment_triggers_total", 1, "from" => from, "to" => to);
}

/// The balance builder's current cursor `B` (§4.4).
pub fn set_balance_builder_cursor(block_number: i64) {
    metrics::gauge!("icon_addresses_balance_builder_cursor", block_number as f64);
}

/// One reconciliation pass completed, with the number of rows corrected.
pub fn record_reconciliation_pass(routine: &'static str, corrected: u64) {
    metrics::counter!("icon_addresses_reconciliation_passes_total", 1, "routine" => routine);
    metrics::counter!("icon_addresses_reconciliation_rows_corrected_total", corrected, "routine" => routine);
}

/// Installs the process-wide Prometheus recorder and returns a handle that
/// renders the current registry as text (serve this behind the
/// configured metrics endpoint).
pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("only one metrics recorder may be installed per process")
}
