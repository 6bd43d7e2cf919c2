//! Actor-based single writer for the chain
//!
//! The chain is owned by exactly one Tokio task. Every mutation travels
//! through its mailbox, so "read tip → build block → append" never
//! interleaves and the chain cannot fork even when many callers submit at
//! once.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │        Portals (farmer, lab, processor, consumer)     │
//! └─────────────────────┬────────────────────────────────┘
//!                       │ submit(event)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                    │
//! │   mpsc → mailbox          watch ← chain snapshots     │
//! └─────────────────────┬────────────────────────────────┘
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)                │
//! │  sleep(mining delay) → BlockBuilder::create_block     │
//! │                      → Chain::append                  │
//! │                      → publish snapshot               │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! A mine cannot be cancelled once it is in the mailbox: dropping the
//! caller's future only discards the response. A caller dropped while still
//! waiting for mailbox space never enqueues its event.

use crate::{
    builder::BlockBuilder,
    chain::{Chain, ChainSnapshot},
    metrics::Metrics,
    types::{Block, Event},
    Error, Result,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Duration;

/// Message sent to the ledger actor
#[derive(Debug)]
pub enum LedgerMessage {
    /// Wait out the mining delay, then build and append a block
    Mine {
        event: Event,
        response: oneshot::Sender<Result<Block>>,
    },

    /// Snapshot taken after every earlier message has been handled
    GetChain {
        response: oneshot::Sender<ChainSnapshot>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that owns the chain
pub struct LedgerActor {
    /// The chain itself
    chain: Chain,

    /// Block builder
    builder: BlockBuilder,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,

    /// Simulated network/consensus latency
    mining_delay: Duration,

    /// Mines queued or in flight
    pending: Arc<AtomicUsize>,

    /// Snapshot publisher
    snapshots: watch::Sender<ChainSnapshot>,

    /// Metrics
    metrics: Metrics,
}

impl std::fmt::Debug for LedgerActor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerActor")
            .field("chain_len", &self.chain.len())
            .field("mining_delay", &self.mining_delay)
            .finish_non_exhaustive()
    }
}

impl LedgerActor {
    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                LedgerMessage::Mine { event, response } => {
                    let result = self.mine(event).await;
                    self.pending.fetch_sub(1, Ordering::SeqCst);
                    if response.send(result).is_err() {
                        tracing::debug!("Submitter went away before the block was mined");
                    }
                }

                LedgerMessage::GetChain { response } => {
                    let _ = response.send(self.chain.snapshot());
                }

                LedgerMessage::Shutdown => break,
            }
        }

        tracing::info!(blocks = self.chain.len(), "Ledger actor stopped");
    }

    async fn mine(&mut self, event: Event) -> Result<Block> {
        let started = Instant::now();
        let event_id = event.id().to_string();

        tokio::time::sleep(self.mining_delay).await;
        let result = self.build_and_append(event).await;
        self.metrics
            .record_mining_duration(started.elapsed().as_secs_f64());

        match &result {
            Ok(block) => {
                self.metrics.record_block_appended(self.chain.len());
                self.snapshots.send_replace(self.chain.snapshot());
                tracing::info!(
                    index = block.index,
                    event_id = %event_id,
                    hash = %block.hash,
                    signature = %block.validator_signature,
                    "Block appended"
                );
            }
            Err(e) => {
                self.metrics.record_mining_failure();
                tracing::error!(event_id = %event_id, "Mining failed: {}", e);
            }
        }

        result
    }

    async fn build_and_append(&mut self, event: Event) -> Result<Block> {
        let block = self.builder.create_block(self.chain.tip(), event).await?;
        self.chain.append(block.clone())?;
        Ok(block)
    }
}

/// Handle for sending messages to the actor
#[derive(Clone, Debug)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
    snapshots: watch::Receiver<ChainSnapshot>,
    pending: Arc<AtomicUsize>,
}

impl LedgerHandle {
    /// Queue an already-validated event and wait for its block
    pub async fn mine(&self, event: Event) -> Result<Block> {
        let (tx, rx) = oneshot::channel();

        // No await between counting the mine and enqueueing it.
        let permit = self
            .sender
            .reserve()
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        self.pending.fetch_add(1, Ordering::SeqCst);
        permit.send(LedgerMessage::Mine {
            event,
            response: tx,
        });

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Latest published snapshot
    pub fn chain(&self) -> ChainSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Snapshot ordered after every message sent so far
    pub async fn sync_chain(&self) -> Result<ChainSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LedgerMessage::GetChain { response: tx })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }

    /// Receiver notified whenever a block is appended
    pub fn subscribe(&self) -> watch::Receiver<ChainSnapshot> {
        self.snapshots.clone()
    }

    /// Whether any submission is queued or being mined
    pub fn is_mining(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }

    /// Shutdown actor once queued messages are handled
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor over a fresh genesis chain
pub fn spawn_ledger_actor(
    builder: BlockBuilder,
    mining_delay: Duration,
    mailbox_capacity: usize,
    metrics: Metrics,
) -> LedgerHandle {
    let chain = Chain::new();
    let (tx, rx) = mpsc::channel(mailbox_capacity.max(1));
    let (snapshot_tx, snapshot_rx) = watch::channel(chain.snapshot());
    let pending = Arc::new(AtomicUsize::new(0));

    let actor = LedgerActor {
        chain,
        builder,
        mailbox: rx,
        mining_delay,
        pending: pending.clone(),
        snapshots: snapshot_tx,
        metrics,
    };

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle {
        sender: tx,
        snapshots: snapshot_rx,
        pending,
    }
}
