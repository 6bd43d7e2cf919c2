//! Main ledger orchestration layer
//!
//! This module ties together the contract validator, the block builder and
//! the single-writer actor into the API the portals use.
//!
//! A submission ends in exactly one of two ways: the contract rejects it, or
//! a block carrying it is appended. `Err` is reserved for exceptional
//! failures (digest unavailable, actor gone).
//!
//! # Example
//!
//! ```no_run
//! use ayurtrace_ledger::{Config, Ledger};
//!
//! #[tokio::main]
//! async fn main() -> ayurtrace_ledger::Result<()> {
//!     let ledger = Ledger::open(Config::default()).await?;
//!
//!     // let outcome = ledger.submit(event).await?;
//!     let trace = ledger.trace("COL-1700000000000");
//!     assert!(trace.is_empty());
//!
//!     ledger.shutdown().await
//! }
//! ```

use crate::{
    actor::{spawn_ledger_actor, LedgerHandle},
    builder::BlockBuilder,
    chain::{self, ChainSnapshot, Trace},
    metrics::Metrics,
    types::{Block, Event},
    validation::{ContractValidator, Rejection, Verdict},
    Config, Result,
};
use tokio::sync::watch;
use tokio::time::Duration;

/// Terminal outcome of a submission
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// The contract refused the event; the chain is unchanged
    Rejected(Rejection),
    /// The event was mined into this block
    Appended(Block),
}

impl Submission {
    /// Whether a block was appended
    pub fn is_appended(&self) -> bool {
        matches!(self, Submission::Appended(_))
    }

    /// The appended block, if any
    pub fn block(&self) -> Option<&Block> {
        match self {
            Submission::Appended(block) => Some(block),
            Submission::Rejected(_) => None,
        }
    }

    /// The rejection, if any
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Submission::Rejected(rejection) => Some(rejection),
            Submission::Appended(_) => None,
        }
    }
}

/// Main ledger interface
#[derive(Debug)]
pub struct Ledger {
    /// Actor handle
    handle: LedgerHandle,

    /// Smart contract
    validator: ContractValidator,

    /// Metrics
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl Ledger {
    /// Open a ledger seeded with the genesis block
    pub async fn open(config: Config) -> Result<Self> {
        Self::open_with_builder(config, BlockBuilder::new()).await
    }

    /// Open a ledger with a custom block builder (clock, digest, signatures)
    pub async fn open_with_builder(config: Config, builder: BlockBuilder) -> Result<Self> {
        config.validate()?;
        let metrics = Metrics::new()?;

        let handle = spawn_ledger_actor(
            builder,
            Duration::from_millis(config.mining.delay_ms),
            config.mining.mailbox_capacity,
            metrics.clone(),
        );

        tracing::info!(
            service = %config.service_name,
            version = %config.service_version,
            mining_delay_ms = config.mining.delay_ms,
            "Ledger opened with genesis block"
        );

        Ok(Self {
            handle,
            validator: ContractValidator::new(config.contract.clone()),
            metrics,
            config,
        })
    }

    /// Submit an event
    ///
    /// Validates it against the contract; if accepted, waits out the mining
    /// delay and returns the appended block.
    pub async fn submit(&self, event: Event) -> Result<Submission> {
        if let Verdict::Rejected(rejection) = self.validator.validate(&event) {
            self.metrics.record_rejection();
            tracing::warn!(
                event_id = %event.id(),
                kind = %event.kind(),
                actor = %event.actor().id,
                "Transaction rejected: {}",
                rejection
            );
            return Ok(Submission::Rejected(rejection));
        }

        tracing::debug!(event_id = %event.id(), kind = %event.kind(), "Transaction accepted");
        let block = self.handle.mine(event).await?;
        Ok(Submission::Appended(block))
    }

    /// Validate without submitting
    pub fn validate(&self, event: &Event) -> Verdict {
        self.validator.validate(event)
    }

    /// Current chain snapshot
    pub fn chain(&self) -> ChainSnapshot {
        self.handle.chain()
    }

    /// Chain snapshot after every queued submission has settled
    pub async fn sync_chain(&self) -> Result<ChainSnapshot> {
        self.handle.sync_chain().await
    }

    /// Current tip
    pub fn tip(&self) -> Block {
        let chain = self.chain();
        // Snapshots always contain at least the genesis block.
        chain[chain.len() - 1].clone()
    }

    /// Provenance trace over the current snapshot
    pub fn trace(&self, identifier: &str) -> Trace {
        chain::trace(&self.chain(), identifier)
    }

    /// Harvest batches available for testing or processing
    pub fn collection_batches(&self) -> Vec<crate::types::CollectionEvent> {
        chain::collection_batches(&self.chain())
            .into_iter()
            .cloned()
            .collect()
    }

    /// Receiver notified whenever a block is appended
    pub fn subscribe(&self) -> watch::Receiver<ChainSnapshot> {
        self.handle.subscribe()
    }

    /// Verify the integrity of the current snapshot
    pub fn verify(&self) -> Result<()> {
        chain::verify_blocks(&self.chain())
    }

    /// Whether a submission is being mined
    pub fn is_mining(&self) -> bool {
        self.handle.is_mining()
    }

    /// Metrics
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shutdown ledger after queued submissions complete
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await
    }
}
