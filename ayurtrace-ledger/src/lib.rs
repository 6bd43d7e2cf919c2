//! AyurTrace Ledger
//!
//! Hash-linked provenance ledger for Ayurvedic herb supply chains.
//!
//! # Architecture
//!
//! - **Smart Contract**: Every submission is checked against harvest,
//!   geo-fence and quality thresholds before it may be mined
//! - **Single Writer**: One actor task owns the chain, so appends never fork
//! - **Hash Linking**: Each block commits to its predecessor through SHA-256
//! - **Provenance**: Any batch or event id can be traced back to its harvest
//!
//! # Invariants
//!
//! - The genesis block is fixed and always at index 0
//! - Indices are contiguous and every block links to its predecessor's hash
//! - A rejected submission never changes the chain
//! - Blocks are never modified or removed once appended

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod crypto;
pub mod validation;
pub mod builder;
pub mod chain;
pub mod actor;
pub mod ledger;
pub mod summary;
pub mod error;
pub mod config;
pub mod metrics;

// Re-exports
pub use error::{Error, Result};
pub use types::{
    Actor, Block, CollectionEvent, Event, EventKind, GeoLocation, HarvestMethod, ProcessType,
    ProcessingEvent, QualityParameters, QualityTestEvent, TestResult, UserRole,
};
pub use validation::{validate_transaction, ContractConfig, ContractValidator, Rejection, Verdict};
pub use builder::BlockBuilder;
pub use chain::{Chain, ChainSnapshot, Trace, TraceEntry};
pub use ledger::{Ledger, Submission};
pub use summary::{summarize_or_fallback, HttpSummarizer, OfflineSummarizer, Summarizer, Summary};
pub use config::Config;
