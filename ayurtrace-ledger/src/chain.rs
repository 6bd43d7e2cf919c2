//! Append-only hash chain and provenance queries
//!
//! # Invariants
//!
//! - `blocks[0]` is the genesis block (`previousHash = "0"`, fixed hash)
//! - `blocks[i].index == i`
//! - `blocks[i].previous_hash == blocks[i - 1].hash`
//! - Blocks are never modified or removed; every parent has at most one child

use crate::{
    crypto::is_block_hash,
    types::{
        Block, CollectionEvent, Event, ProcessingEvent, QualityTestEvent, GENESIS_HASH,
        GENESIS_PREVIOUS_HASH,
    },
    Error, Result,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Read-only view of the chain at one moment
pub type ChainSnapshot = Arc<[Block]>;

/// The ordered block sequence
#[derive(Debug, Clone)]
pub struct Chain {
    blocks: Vec<Block>,
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl Chain {
    /// Chain holding only the genesis block
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::genesis()],
        }
    }

    /// Last block
    pub fn tip(&self) -> &Block {
        // The genesis block is pushed in `new` and nothing ever pops.
        &self.blocks[self.blocks.len() - 1]
    }

    /// Number of blocks, genesis included
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false: the genesis block is present from the start
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Block at `index`
    pub fn get(&self, index: u64) -> Option<&Block> {
        usize::try_from(index).ok().and_then(|i| self.blocks.get(i))
    }

    /// All blocks in order
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Copy of the current blocks for readers
    pub fn snapshot(&self) -> ChainSnapshot {
        Arc::from(self.blocks.as_slice())
    }

    /// Append a block that extends the tip
    ///
    /// A block that names an earlier block as its parent, or reuses an
    /// existing index, is a fork and is refused.
    pub fn append(&mut self, block: Block) -> Result<()> {
        let tip = self.tip();

        let reuses_parent = block.previous_hash != tip.hash
            && self.blocks.iter().any(|b| b.hash == block.previous_hash);
        if block.index <= tip.index || reuses_parent {
            return Err(Error::Fork {
                index: block.index,
                parent: block.previous_hash,
            });
        }

        if block.previous_hash != tip.hash {
            return Err(Error::InvalidBlock(format!(
                "previous hash {} does not match tip {}",
                block.previous_hash, tip.hash
            )));
        }

        if block.index != tip.index + 1 {
            return Err(Error::InvalidBlock(format!(
                "index {} does not follow tip index {}",
                block.index, tip.index
            )));
        }

        if !is_block_hash(&block.hash) {
            return Err(Error::InvalidBlock(format!(
                "hash {:?} is not 64 lowercase hex characters",
                block.hash
            )));
        }

        self.blocks.push(block);
        Ok(())
    }

    /// Full integrity walk
    pub fn verify(&self) -> Result<()> {
        verify_blocks(&self.blocks)
    }

    /// Every harvest batch recorded so far, genesis excluded
    pub fn collection_batches(&self) -> Vec<&CollectionEvent> {
        collection_batches(&self.blocks)
    }

    /// Provenance trace for `identifier`
    pub fn trace(&self, identifier: &str) -> Trace {
        trace(&self.blocks, identifier)
    }
}

/// Check genesis constants, index continuity, linkage and recomputed hashes
pub fn verify_blocks(blocks: &[Block]) -> Result<()> {
    let genesis = blocks.first().ok_or_else(|| Error::Integrity {
        index: 0,
        reason: "chain has no genesis block".to_string(),
    })?;

    if genesis.index != 0
        || genesis.previous_hash != GENESIS_PREVIOUS_HASH
        || genesis.hash != GENESIS_HASH
    {
        return Err(Error::Integrity {
            index: genesis.index,
            reason: "genesis block does not match the fixed constants".to_string(),
        });
    }

    for (position, pair) in blocks.windows(2).enumerate() {
        let (previous, block) = (&pair[0], &pair[1]);
        let expected_index = position as u64 + 1;

        if block.index != expected_index {
            return Err(Error::Integrity {
                index: block.index,
                reason: format!("expected index {}", expected_index),
            });
        }

        if block.previous_hash != previous.hash {
            return Err(Error::Integrity {
                index: block.index,
                reason: "previous hash does not match predecessor".to_string(),
            });
        }

        if block.compute_hash()? != block.hash {
            return Err(Error::Integrity {
                index: block.index,
                reason: "stored hash does not match block contents".to_string(),
            });
        }
    }

    Ok(())
}

/// Every harvest batch in `blocks`, genesis excluded
pub fn collection_batches(blocks: &[Block]) -> Vec<&CollectionEvent> {
    blocks
        .iter()
        .filter(|b| !b.is_genesis())
        .filter_map(|b| match &b.data {
            Event::Collection(collection) => Some(collection),
            _ => None,
        })
        .collect()
}

/// Blocks whose payload is `identifier` or links to it, in chain order
///
/// Linear scan; an empty trace means the identifier is not on the ledger.
pub fn trace(blocks: &[Block], identifier: &str) -> Trace {
    let matches = blocks
        .iter()
        .filter(|b| b.data.concerns(identifier))
        .cloned()
        .collect();

    Trace {
        identifier: identifier.to_string(),
        blocks: matches,
    }
}

/// Ordered subsequence of blocks relevant to one physical batch
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    identifier: String,
    blocks: Vec<Block>,
}

impl Trace {
    /// Identifier that was traced
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Matching blocks in chain order
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Whether nothing matched
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of matching blocks
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// The harvest that started the batch
    pub fn origin(&self) -> Option<&CollectionEvent> {
        self.blocks.iter().find_map(|b| match &b.data {
            Event::Collection(collection) => Some(collection),
            _ => None,
        })
    }

    /// First quality certificate issued for the batch
    pub fn quality_test(&self) -> Option<&QualityTestEvent> {
        self.blocks.iter().find_map(|b| match &b.data {
            Event::QualityTest(test) => Some(test),
            _ => None,
        })
    }

    /// Processing steps applied to the batch
    pub fn processing_steps(&self) -> Vec<&ProcessingEvent> {
        self.blocks
            .iter()
            .filter_map(|b| match &b.data {
                Event::Processing(step) => Some(step),
                _ => None,
            })
            .collect()
    }

    /// Simplified projection handed to the narrative summary service
    pub fn projection(&self) -> Vec<TraceEntry> {
        self.blocks
            .iter()
            .map(|b| TraceEntry {
                kind: b.data.kind().resource_type().to_string(),
                date: b.timestamp,
                details: b.data.clone(),
            })
            .collect()
    }
}

/// One projected trace step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// `resourceType` of the payload
    #[serde(rename = "type")]
    pub kind: String,
    /// Block timestamp
    pub date: DateTime<Utc>,
    /// Full payload
    pub details: Event,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::tests::{harvest, SteppingClock};
    use crate::builder::BlockBuilder;
    use crate::types::{Actor, QualityParameters, UserRole};
    use std::sync::Arc;

    fn lab_test(id: &str, batch_id: &str) -> Event {
        QualityTestEvent::new(
            Actor::new("u2", "Dr. Priya Singh", UserRole::LabTechnician),
            batch_id,
            QualityParameters {
                moisture_content: 10.5,
                pesticides_detected: false,
                heavy_metals_passed: true,
                dna_verified: true,
            },
        )
        .with_id(id)
        .into()
    }

    async fn extend(chain: &mut Chain, builder: &BlockBuilder, event: Event) -> Block {
        let block = builder.create_block(chain.tip(), event).await.unwrap();
        chain.append(block.clone()).unwrap();
        block
    }

    #[test]
    fn test_new_chain_has_genesis() {
        let chain = Chain::new();
        assert_eq!(chain.len(), 1);
        assert!(!chain.is_empty());
        assert_eq!(chain.tip().hash, GENESIS_HASH);
        assert!(chain.verify().is_ok());
        assert!(chain.collection_batches().is_empty());
    }

    #[tokio::test]
    async fn test_append_links_blocks() {
        let mut chain = Chain::new();
        let builder = BlockBuilder::new();

        for i in 0..5 {
            extend(&mut chain, &builder, harvest(&format!("COL-{}", i))).await;
        }

        assert_eq!(chain.len(), 6);
        for pair in chain.blocks().windows(2) {
            assert_eq!(pair[1].previous_hash, pair[0].hash);
            assert_eq!(pair[1].index, pair[0].index + 1);
        }
        assert!(chain.verify().is_ok());
        assert_eq!(chain.get(3).unwrap().data.id(), "COL-2");
    }

    #[tokio::test]
    async fn test_second_child_is_a_fork() {
        let mut chain = Chain::new();
        let builder =
            BlockBuilder::new().with_clock(Arc::new(SteppingClock::starting_at(Utc::now())));
        let genesis = chain.tip().clone();

        let first = builder.create_block(&genesis, harvest("COL-1")).await.unwrap();
        let second = builder.create_block(&genesis, harvest("COL-1")).await.unwrap();
        assert_ne!(first.hash, second.hash);

        chain.append(first).unwrap();
        let err = chain.append(second).unwrap_err();
        assert!(matches!(err, Error::Fork { index: 1, .. }));
        assert_eq!(chain.len(), 2);
    }

    #[tokio::test]
    async fn test_reused_index_on_tip_is_a_fork() {
        let mut chain = Chain::new();
        let builder = BlockBuilder::new();
        extend(&mut chain, &builder, harvest("COL-1")).await;

        let mut stale = builder
            .create_block(chain.tip(), harvest("COL-2"))
            .await
            .unwrap();
        stale.index = 1;

        let err = chain.append(stale).unwrap_err();
        assert!(matches!(err, Error::Fork { index: 1, .. }));
        assert_eq!(chain.len(), 2);
    }

    #[tokio::test]
    async fn test_skipped_index_rejected() {
        let mut chain = Chain::new();
        let mut block = BlockBuilder::new()
            .create_block(chain.tip(), harvest("COL-1"))
            .await
            .unwrap();
        block.index = 2;

        assert!(matches!(chain.append(block), Err(Error::InvalidBlock(_))));
    }

    #[tokio::test]
    async fn test_unlinked_block_rejected() {
        let mut chain = Chain::new();
        let builder = BlockBuilder::new();
        let mut orphan = builder
            .create_block(chain.tip(), harvest("COL-1"))
            .await
            .unwrap();
        orphan.previous_hash = "f".repeat(64);
        orphan.index = 7;

        assert!(matches!(
            chain.append(orphan),
            Err(Error::InvalidBlock(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_hash_rejected() {
        let mut chain = Chain::new();
        let mut block = BlockBuilder::new()
            .create_block(chain.tip(), harvest("COL-1"))
            .await
            .unwrap();
        block.hash = block.hash.to_uppercase();

        assert!(matches!(chain.append(block), Err(Error::InvalidBlock(_))));
    }

    #[tokio::test]
    async fn test_verify_detects_tampering() {
        let mut chain = Chain::new();
        let builder = BlockBuilder::new();
        extend(&mut chain, &builder, harvest("COL-1")).await;
        extend(&mut chain, &builder, harvest("COL-2")).await;

        let mut blocks = chain.blocks().to_vec();
        if let Event::Collection(collection) = &mut blocks[1].data {
            collection.quantity_kg = 499.0;
        }

        let err = verify_blocks(&blocks).unwrap_err();
        assert!(matches!(err, Error::Integrity { index: 1, .. }));
    }

    #[tokio::test]
    async fn test_trace_collects_batch_in_chain_order() {
        let mut chain = Chain::new();
        let builder = BlockBuilder::new();

        extend(&mut chain, &builder, harvest("COL-123")).await;
        extend(&mut chain, &builder, harvest("COL-999")).await;
        extend(&mut chain, &builder, lab_test("LAB-1", "COL-123")).await;
        extend(&mut chain, &builder, lab_test("LAB-2", "COL-999")).await;
        extend(&mut chain, &builder, lab_test("LAB-3", "COL-123")).await;

        let trace = chain.trace("COL-123");
        let ids: Vec<&str> = trace.blocks().iter().map(|b| b.data.id()).collect();
        assert_eq!(ids, vec!["COL-123", "LAB-1", "LAB-3"]);
        assert!(trace
            .blocks()
            .windows(2)
            .all(|pair| pair[0].index < pair[1].index));

        assert_eq!(trace.origin().unwrap().id, "COL-123");
        assert_eq!(trace.quality_test().unwrap().id, "LAB-1");
        assert!(trace.processing_steps().is_empty());
        assert_eq!(chain.collection_batches().len(), 2);
    }

    #[test]
    fn test_trace_unknown_identifier_is_empty() {
        let chain = Chain::new();
        let trace = chain.trace("COL-404");
        assert!(trace.is_empty());
        assert!(trace.origin().is_none());
        assert_eq!(trace.identifier(), "COL-404");
    }

    #[tokio::test]
    async fn test_projection_shape() {
        let mut chain = Chain::new();
        let builder = BlockBuilder::new();
        extend(&mut chain, &builder, harvest("COL-1")).await;

        let projection = chain.trace("COL-1").projection();
        assert_eq!(projection.len(), 1);

        let json = serde_json::to_value(&projection[0]).unwrap();
        assert_eq!(json["type"], "CollectionEvent");
        assert_eq!(json["details"]["id"], "COL-1");
    }
}
