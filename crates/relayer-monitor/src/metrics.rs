//! Prometheus instrumentation for the event monitor.

#[derive(prometheus_metric_storage::MetricStorage)]
pub struct Metrics {
    /// Highest block height the monitor has processed, per chain.
    #[metric(labels("chain"))]
    cursor_height: prometheus::IntGaugeVec,

    /// Escrow lifecycle events emitted, by kind.
    #[metric(labels("kind"))]
    events_emitted: prometheus::IntCounterVec,

    /// Reorgs detected, per chain.
    #[metric(labels("chain"))]
    reorgs_detected: prometheus::IntCounterVec,

    /// Transactions currently tracked awaiting confirmation.
    retry_queue_depth: prometheus::IntGauge,
}

impl Metrics {
    pub fn get() -> &'static Metrics {
        Self::instance(relayer_observe::metrics::get_storage_registry())
            .expect("monitor metric registration never fails with a fresh registry")
    }

    pub fn set_cursor(&self, chain: &str, height: u64) {
        self.cursor_height.with_label_values(&[chain]).set(height as i64);
    }

    pub fn record_event(&self, kind: &str) {
        self.events_emitted.with_label_values(&[kind]).inc();
    }

    pub fn record_reorg(&self, chain: &str) {
        self.reorgs_detected.with_label_values(&[chain]).inc();
    }

    pub fn set_retry_queue_depth(&self, depth: usize) {
        self.retry_queue_depth.set(depth as i64);
    }
}
