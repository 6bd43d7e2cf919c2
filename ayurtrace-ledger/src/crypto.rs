//! Hashing and signature-token primitives
//!
//! This module provides:
//! - SHA-256 digests encoded as lowercase hex
//! - A pluggable digest service used by the block builder
//! - Placeholder validator signature tokens (random, not cryptographic)

use crate::{Error, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::fmt;

/// Prefix of every generated validator signature token
pub const SIGNATURE_PREFIX: &str = "SIG_";

/// Hash arbitrary bytes using SHA-256
pub fn hash_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-256 of `data` as 64 lowercase hex characters
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(hash_bytes(data))
}

/// Whether `value` looks like a block hash (64 lowercase hex characters)
pub fn is_block_hash(value: &str) -> bool {
    value.len() == 64
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// 256-bit one-way digest
///
/// Implementations must be deterministic. A failure means the primitive is
/// unavailable and aborts the block being built.
pub trait DigestService: Send + Sync + fmt::Debug {
    /// Digest `data`
    fn digest(&self, data: &[u8]) -> Result<[u8; 32]>;

    /// Digest `data` and encode as lowercase hex
    fn digest_hex(&self, data: &[u8]) -> Result<String> {
        self.digest(data).map(hex::encode)
    }
}

/// Default SHA-256 digest
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Digest;

impl DigestService for Sha256Digest {
    fn digest(&self, data: &[u8]) -> Result<[u8; 32]> {
        Ok(hash_bytes(data))
    }
}

/// Digest that is never available
///
/// Stands in for a missing platform primitive.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableDigest;

impl DigestService for UnavailableDigest {
    fn digest(&self, _data: &[u8]) -> Result<[u8; 32]> {
        Err(Error::Hashing("digest primitive unavailable".to_string()))
    }
}

/// Source of opaque validator signature tokens
pub trait SignatureSource: Send + Sync + fmt::Debug {
    /// Produce a fresh token
    fn token(&self) -> String;
}

/// `SIG_` followed by random uppercase alphanumerics
#[derive(Debug, Clone, Copy)]
pub struct RandomSignature {
    length: usize,
}

impl RandomSignature {
    /// Token body length used when none is configured
    pub const DEFAULT_LENGTH: usize = 6;

    /// Create a source with the given body length
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl Default for RandomSignature {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LENGTH)
    }
}

impl SignatureSource for RandomSignature {
    fn token(&self) -> String {
        let body: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(|b| char::from(b).to_ascii_uppercase())
            .collect();
        format!("{}{}", SIGNATURE_PREFIX, body)
    }
}
