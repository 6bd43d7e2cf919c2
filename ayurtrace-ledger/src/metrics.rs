//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `ayurtrace_blocks_appended_total` - Blocks appended after genesis
//! - `ayurtrace_transactions_rejected_total` - Submissions refused by the contract
//! - `ayurtrace_mining_failures_total` - Accepted submissions that failed to hash or append
//! - `ayurtrace_mining_duration_seconds` - Histogram of delay + build + append latency
//! - `ayurtrace_chain_length` - Current number of blocks, genesis included

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Registry};
use std::sync::Arc;

/// Metrics collector
///
/// Every collector registers into its own [`Registry`], so several ledgers
/// can live in one process.
#[derive(Clone)]
pub struct Metrics {
    /// Blocks appended
    pub blocks_appended: IntCounter,

    /// Contract rejections
    pub rejections: IntCounter,

    /// Mining failures
    pub mining_failures: IntCounter,

    /// Mining latency
    pub mining_duration: Histogram,

    /// Chain length
    pub chain_length: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("blocks_appended", &self.blocks_appended.get())
            .field("rejections", &self.rejections.get())
            .field("chain_length", &self.chain_length.get())
            .finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let blocks_appended = IntCounter::new(
            "ayurtrace_blocks_appended_total",
            "Blocks appended after genesis",
        )?;
        registry.register(Box::new(blocks_appended.clone()))?;

        let rejections = IntCounter::new(
            "ayurtrace_transactions_rejected_total",
            "Submissions refused by the contract",
        )?;
        registry.register(Box::new(rejections.clone()))?;

        let mining_failures = IntCounter::new(
            "ayurtrace_mining_failures_total",
            "Accepted submissions that failed to hash or append",
        )?;
        registry.register(Box::new(mining_failures.clone()))?;

        let mining_duration = Histogram::with_opts(
            HistogramOpts::new(
                "ayurtrace_mining_duration_seconds",
                "Histogram of delay + build + append latency",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 1.5, 2.0, 5.0]),
        )?;
        registry.register(Box::new(mining_duration.clone()))?;

        let chain_length = IntGauge::new(
            "ayurtrace_chain_length",
            "Current number of blocks, genesis included",
        )?;
        registry.register(Box::new(chain_length.clone()))?;
        chain_length.set(1);

        Ok(Self {
            blocks_appended,
            rejections,
            mining_failures,
            mining_duration,
            chain_length,
            registry,
        })
    }

    /// Record a block append
    pub fn record_block_appended(&self, chain_length: usize) {
        self.blocks_appended.inc();
        self.chain_length.set(chain_length as i64);
    }

    /// Record a contract rejection
    pub fn record_rejection(&self) {
        self.rejections.inc();
    }

    /// Record a failed mine
    pub fn record_mining_failure(&self) {
        self.mining_failures.inc();
    }

    /// Record mining duration
    pub fn record_mining_duration(&self, duration_seconds: f64) {
        self.mining_duration.observe(duration_seconds);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
