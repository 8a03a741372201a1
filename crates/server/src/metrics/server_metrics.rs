use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use vigil_engine::wire::ErrorType;

#[derive(Debug, Default)]
pub struct ServerMetrics {
    rule_requests_total: AtomicU64,
    alert_requests_total: AtomicU64,
    bad_data_total: AtomicU64,
    server_errors_total: AtomicU64,
    rule_latency_sum_us: AtomicU64,
    rule_latency_count: AtomicU64,
}

impl ServerMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_rule_requests(&self) {
        self.rule_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_alert_requests(&self) {
        self.alert_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_errors(&self, kind: ErrorType) {
        let counter = match kind {
            ErrorType::BadData => &self.bad_data_total,
            ErrorType::Server => &self.server_errors_total,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rule_latency(&self, start: Instant) {
        let us = start.elapsed().as_micros() as u64;
        self.rule_latency_sum_us.fetch_add(us, Ordering::Relaxed);
        self.rule_latency_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rule_requests_total(&self) -> u64 {
        self.rule_requests_total.load(Ordering::Relaxed)
    }

    pub fn alert_requests_total(&self) -> u64 {
        self.alert_requests_total.load(Ordering::Relaxed)
    }

    pub fn bad_data_total(&self) -> u64 {
        self.bad_data_total.load(Ordering::Relaxed)
    }

    pub fn server_errors_total(&self) -> u64 {
        self.server_errors_total.load(Ordering::Relaxed)
    }

    pub fn rule_latency_vals(&self) -> (u64, u64) {
        (
            self.rule_latency_sum_us.load(Ordering::Relaxed),
            self.rule_latency_count.load(Ordering::Relaxed),
        )
    }
}
