//! Block construction
//!
//! Given the chain tip and an already-validated payload, the builder stamps
//! the next block: `index = tip.index + 1`, a fresh timestamp, the SHA-256 of
//! `index ‖ tip.hash ‖ timestamp ‖ payload-json`, and a placeholder
//! validator signature. The builder never touches the chain; appending is the
//! caller's job.

use crate::{
    crypto::{DigestService, RandomSignature, Sha256Digest, SignatureSource},
    types::{canonical_string, Block, Event},
    Result,
};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

/// Wall clock
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current time
    fn now(&self) -> DateTime<Utc>;
}

/// System clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Builds successor blocks
#[derive(Debug, Clone)]
pub struct BlockBuilder {
    clock: Arc<dyn Clock>,
    digest: Arc<dyn DigestService>,
    signer: Arc<dyn SignatureSource>,
}

impl Default for BlockBuilder {
    fn default() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            digest: Arc::new(Sha256Digest),
            signer: Arc::new(RandomSignature::default()),
        }
    }
}

impl BlockBuilder {
    /// Builder with the system clock, SHA-256 and random signature tokens
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the digest primitive
    pub fn with_digest(mut self, digest: Arc<dyn DigestService>) -> Self {
        self.digest = digest;
        self
    }

    /// Replace the signature token source
    pub fn with_signature_source(mut self, signer: Arc<dyn SignatureSource>) -> Self {
        self.signer = signer;
        self
    }

    /// Build the block that follows `previous`
    ///
    /// Fails with [`crate::Error::Hashing`] when the digest primitive is
    /// unavailable; no partially populated block is ever returned.
    pub async fn create_block(&self, previous: &Block, data: Event) -> Result<Block> {
        let index = previous.index + 1;
        let timestamp = self.clock.now();

        let canonical = canonical_string(index, &previous.hash, &timestamp, &data)?;
        let hash = self.digest.digest_hex(canonical.as_bytes())?;

        tracing::debug!(
            index,
            event_id = %data.id(),
            hash = %hash,
            "Block built"
        );

        Ok(Block {
            index,
            timestamp,
            data,
            previous_hash: previous.hash.clone(),
            hash,
            validator_signature: self.signer.token(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::crypto::{is_block_hash, UnavailableDigest};
    use crate::types::{Actor, CollectionEvent, GeoLocation, HarvestMethod, UserRole};
    use crate::Error;
    use chrono::Duration;
    use std::sync::Mutex;

    /// Clock that advances one second per reading
    #[derive(Debug)]
    pub(crate) struct SteppingClock {
        next: Mutex<DateTime<Utc>>,
    }

    impl SteppingClock {
        pub(crate) fn starting_at(start: DateTime<Utc>) -> Self {
            Self {
                next: Mutex::new(start),
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let mut next = self.next.lock().unwrap();
            let now = *next;
            *next = now + Duration::seconds(1);
            now
        }
    }

    pub(crate) fn harvest(id: &str) -> Event {
        CollectionEvent::new(
            Actor::new("u1", "Ramesh Gupta", UserRole::Farmer),
            "Withania somnifera (Ashwagandha)",
            "Root",
            100.0,
            GeoLocation::new(23.47, 77.94),
            HarvestMethod::Cultivated,
        )
        .with_id(id)
        .into()
    }

    #[tokio::test]
    async fn test_create_block_links_to_previous() {
        let genesis = Block::genesis();
        let event = harvest("COL-1");
        let block = BlockBuilder::new()
            .create_block(&genesis, event.clone())
            .await
            .unwrap();

        assert_eq!(block.index, 1);
        assert_eq!(block.previous_hash, genesis.hash);
        assert!(is_block_hash(&block.hash));
        assert!(block.validator_signature.starts_with("SIG_"));
        assert_eq!(block.data, event);
    }

    #[tokio::test]
    async fn test_hash_matches_recomputation() {
        let genesis = Block::genesis();
        let block = BlockBuilder::new()
            .create_block(&genesis, harvest("COL-1"))
            .await
            .unwrap();

        assert_eq!(block.compute_hash().unwrap(), block.hash);
    }

    #[tokio::test]
    async fn test_timestamp_changes_hash() {
        let genesis = Block::genesis();
        let builder = BlockBuilder::new()
            .with_clock(Arc::new(SteppingClock::starting_at(Utc::now())));
        let event = harvest("COL-1");

        let first = builder.create_block(&genesis, event.clone()).await.unwrap();
        let second = builder.create_block(&genesis, event).await.unwrap();

        assert_eq!(first.index, second.index);
        assert_eq!(first.previous_hash, second.previous_hash);
        assert_ne!(first.hash, second.hash);
    }

    #[tokio::test]
    async fn test_unavailable_digest_surfaces() {
        let genesis = Block::genesis();
        let builder = BlockBuilder::new().with_digest(Arc::new(UnavailableDigest));

        let err = builder
            .create_block(&genesis, harvest("COL-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Hashing(_)));
    }
}
