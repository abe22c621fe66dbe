//! Prometheus instrumentation for the auction engine, registered lazily on
//! first use so a caller that never wires up `relayer_observe::metrics` pays
//! nothing for it.

#[derive(prometheus_metric_storage::MetricStorage)]
pub struct Metrics {
    /// Auctions currently accepting bids.
    active_auctions: prometheus::IntGauge,

    /// Auctions that have reached a terminal status, by outcome.
    #[metric(labels("outcome"))]
    settled_auctions: prometheus::IntCounterVec,

    /// Wall-clock time from `start` to `settle`, in seconds.
    settlement_duration_seconds: prometheus::Histogram,
}

impl Metrics {
    pub fn get() -> &'static Metrics {
        Self::instance(relayer_observe::metrics::get_storage_registry())
            .expect("auction metric registration never fails with a fresh registry")
    }

    pub fn set_active(&self, count: i64) {
        self.active_auctions.set(count);
    }

    pub fn record_settlement(&self, winner: Option<&relayer_model::Address>, duration: std::time::Duration) {
        let outcome = if winner.is_some() { "settled" } else { "no_bids" };
        self.settled_auctions.with_label_values(&[outcome]).inc();
        self.settlement_duration_seconds.observe(duration.as_secs_f64());
    }
}
