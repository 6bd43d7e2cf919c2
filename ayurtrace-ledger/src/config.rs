//! Configuration for the ledger

use crate::validation::ContractConfig;
use serde::{Deserialize, Serialize};

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Mining configuration
    pub mining: MiningConfig,

    /// Smart-contract thresholds
    pub contract: ContractConfig,

    /// Narrative summary service
    pub summary: SummaryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "ayurtrace-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            mining: MiningConfig::default(),
            contract: ContractConfig::default(),
            summary: SummaryConfig::default(),
        }
    }
}

/// Mining configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Simulated network/consensus latency before a block is built (milliseconds)
    pub delay_ms: u64,

    /// Ledger actor mailbox capacity
    pub mailbox_capacity: usize,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            delay_ms: 1500,
            mailbox_capacity: 64,
        }
    }
}

/// Narrative summary service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// HTTP endpoint; the offline summarizer is used when unset
    pub endpoint: Option<String>,

    /// Request timeout (seconds)
    pub timeout_secs: u64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: 10,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load from `AYURTRACE_*` variables resolved through `lookup`
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> crate::Result<Self> {
        let mut config = Config::default();

        if let Some(delay) = lookup("AYURTRACE_MINING_DELAY_MS") {
            config.mining.delay_ms = delay.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid AYURTRACE_MINING_DELAY_MS: {}", e))
            })?;
        }

        if let Some(capacity) = lookup("AYURTRACE_MAILBOX_CAPACITY") {
            config.mining.mailbox_capacity = capacity.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid AYURTRACE_MAILBOX_CAPACITY: {}", e))
            })?;
        }

        if let Some(endpoint) = lookup("AYURTRACE_SUMMARY_ENDPOINT") {
            config.summary.endpoint = Some(endpoint).filter(|e| !e.is_empty());
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the ledger cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.mining.mailbox_capacity == 0 {
            return Err(crate::Error::Config(
                "mining.mailbox_capacity must be at least 1".to_string(),
            ));
        }

        let fence = &self.contract.geo_fence;
        if fence.min_latitude > fence.max_latitude || fence.min_longitude > fence.max_longitude {
            return Err(crate::Error::Config(
                "contract.geo_fence edges are inverted".to_string(),
            ));
        }

        Ok(())
    }
}
