//! # Prometheus Metrics
//!
//! Operational counters for payment ledgers. All metrics are registered in a
//! dedicated [`prometheus::Registry`] so they do not collide with whatever
//! else the host process exports; one [`LedgerMetrics`] may be shared by any
//! number of issuer kits, which are told apart by the `brand` label.

use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::config::METRICS_NAMESPACE;

/// Metric handles for one or more ledgers. Cheap to clone.
#[derive(Clone)]
pub struct LedgerMetrics {
    registry: Registry,
    /// Successful operations, by brand and operation name.
    pub operations_total: IntCounterVec,
    /// Rejected operations, by brand and error kind.
    pub failures_total: IntCounterVec,
    /// Payments currently live in each ledger.
    pub live_payments: IntGaugeVec,
    /// Commits that failed after mutation began.
    pub fatal_failures_total: IntCounterVec,
}

impl LedgerMetrics {
    /// Creates a fresh registry and registers every metric in it.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some(METRICS_NAMESPACE.into()), None)?;
        Self::with_registry(registry)
    }

    /// Registers every metric in an existing registry.
    pub fn with_registry(registry: Registry) -> Result<Self, prometheus::Error> {
        let operations_total = IntCounterVec::new(
            Opts::new(
                "ledger_operations_total",
                "Ledger operations that completed successfully",
            ),
            &["brand", "op"],
        )?;
        registry.register(Box::new(operations_total.clone()))?;

        let failures_total = IntCounterVec::new(
            Opts::new(
                "ledger_failures_total",
                "Ledger operations rejected, by error kind",
            ),
            &["brand", "kind"],
        )?;
        registry.register(Box::new(failures_total.clone()))?;

        let live_payments = IntGaugeVec::new(
            Opts::new("ledger_live_payments", "Payments currently live"),
            &["brand"],
        )?;
        registry.register(Box::new(live_payments.clone()))?;

        let fatal_failures_total = IntCounterVec::new(
            Opts::new(
                "ledger_fatal_failures_total",
                "Commits that failed after the table started to change",
            ),
            &["brand"],
        )?;
        registry.register(Box::new(fatal_failures_total.clone()))?;

        Ok(Self {
            registry,
            operations_total,
            failures_total,
            live_payments,
            fatal_failures_total,
        })
    }

    /// The registry backing these metrics.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all registered metrics into the Prometheus text exposition
    /// format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    pub(crate) fn record_success(&self, brand: &str, op: &str) {
        self.operations_total.with_label_values(&[brand, op]).inc();
    }

    pub(crate) fn record_failure(&self, brand: &str, kind: &str) {
        self.failures_total.with_label_values(&[brand, kind]).inc();
    }

    pub(crate) fn record_fatal(&self, brand: &str) {
        self.fatal_failures_total.with_label_values(&[brand]).inc();
    }

    pub(crate) fn set_live_payments(&self, brand: &str, live: usize) {
        self.live_payments
            .with_label_values(&[brand])
            .set(i64::try_from(live).unwrap_or(i64::MAX));
    }
}
