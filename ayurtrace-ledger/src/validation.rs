//! Smart-contract checks gating admission to the chain
//!
//! Rules, first failure wins:
//! - Collection: sustainable harvest limit, then the cultivation geo-fence
//! - Quality test: moisture threshold, then DNA authenticity
//! - Anything else is accepted
//!
//! All comparisons are strict "greater than" so boundary values pass.
//! Pesticide detection only affects the PASS/FAIL label, never admission.

use crate::types::{CollectionEvent, Event, GeoLocation, QualityTestEvent};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Authorized cultivation zone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFence {
    /// Southern edge
    pub min_latitude: f64,
    /// Northern edge
    pub max_latitude: f64,
    /// Western edge
    pub min_longitude: f64,
    /// Eastern edge
    pub max_longitude: f64,
}

impl GeoFence {
    /// Whether the location lies inside the fence, edges included
    pub fn contains(&self, location: &GeoLocation) -> bool {
        !(location.latitude < self.min_latitude
            || location.latitude > self.max_latitude
            || location.longitude < self.min_longitude
            || location.longitude > self.max_longitude)
    }
}

impl Default for GeoFence {
    fn default() -> Self {
        Self {
            min_latitude: 8.0,
            max_latitude: 37.0,
            min_longitude: 68.0,
            max_longitude: 97.0,
        }
    }
}

/// Contract thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractConfig {
    /// Sustainable harvest limit per collection (kg)
    pub max_harvest_kg: f64,

    /// Authorized cultivation zone
    pub geo_fence: GeoFence,

    /// Moisture threshold (%)
    pub max_moisture_pct: f64,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            max_harvest_kg: 500.0,
            geo_fence: GeoFence::default(),
            max_moisture_pct: 12.0,
        }
    }
}

/// Why a transaction was refused
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Rejection {
    /// Collection above the sustainable harvest limit
    #[error("harvest quantity exceeds sustainable limit.")]
    HarvestLimitExceeded {
        /// Submitted quantity
        quantity_kg: f64,
        /// Configured limit
        limit_kg: f64,
    },

    /// Collection outside the cultivation geo-fence
    #[error("GPS coordinates outside authorized zones.")]
    OutsideGeoFence {
        /// Submitted location
        location: GeoLocation,
    },

    /// Quality test above the moisture threshold
    #[error("moisture content exceeds threshold, risk of fungal growth.")]
    MoistureExceeded {
        /// Measured moisture
        moisture_pct: f64,
        /// Configured threshold
        limit_pct: f64,
    },

    /// DNA barcoding did not confirm the species
    #[error("DNA authenticity not verified.")]
    DnaNotVerified,
}

impl Rejection {
    /// Message shown to the submitting participant
    pub fn user_message(&self) -> String {
        format!("SC_ERR: {}", self)
    }
}

/// Outcome of contract validation
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Transaction may be built into a block
    Accepted,
    /// Transaction refused
    Rejected(Rejection),
}

impl Verdict {
    /// Whether the transaction was accepted
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }

    /// The rejection, if any
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Verdict::Accepted => None,
            Verdict::Rejected(rejection) => Some(rejection),
        }
    }

    /// Human-readable reason, if rejected
    pub fn error(&self) -> Option<String> {
        self.rejection().map(ToString::to_string)
    }
}

/// Transaction validator
#[derive(Debug, Clone, Default)]
pub struct ContractValidator {
    config: ContractConfig,
}

impl ContractValidator {
    /// Create a validator with the given thresholds
    pub fn new(config: ContractConfig) -> Self {
        Self { config }
    }

    /// Thresholds in force
    pub fn config(&self) -> &ContractConfig {
        &self.config
    }

    /// Validate a transaction payload
    ///
    /// Pure: no side effects, identical input yields identical output.
    pub fn validate(&self, event: &Event) -> Verdict {
        let outcome = match event {
            Event::Collection(collection) => self.check_collection(collection),
            Event::QualityTest(test) => self.check_quality_test(test),
            Event::Processing(_) => Ok(()),
        };

        match outcome {
            Ok(()) => Verdict::Accepted,
            Err(rejection) => Verdict::Rejected(rejection),
        }
    }

    fn check_collection(&self, event: &CollectionEvent) -> Result<(), Rejection> {
        if event.quantity_kg > self.config.max_harvest_kg {
            return Err(Rejection::HarvestLimitExceeded {
                quantity_kg: event.quantity_kg,
                limit_kg: self.config.max_harvest_kg,
            });
        }

        if !self.config.geo_fence.contains(&event.location) {
            return Err(Rejection::OutsideGeoFence {
                location: event.location,
            });
        }

        Ok(())
    }

    fn check_quality_test(&self, event: &QualityTestEvent) -> Result<(), Rejection> {
        let params = &event.parameters;

        if params.moisture_content > self.config.max_moisture_pct {
            return Err(Rejection::MoistureExceeded {
                moisture_pct: params.moisture_content,
                limit_pct: self.config.max_moisture_pct,
            });
        }

        if !params.dna_verified {
            return Err(Rejection::DnaNotVerified);
        }

        Ok(())
    }
}

/// Validate against the default contract thresholds
pub fn validate_transaction(event: &Event) -> Verdict {
    ContractValidator::default().validate(event)
}
