//! Core types for the ledger
//!
//! Events follow a FHIR-like resource layout: every payload carries a
//! `resourceType` discriminator, an id, an authoring timestamp and the actor.
//! All types serialize to camelCase JSON so the canonical block string is
//! stable within a process.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// Hash of the pre-seeded genesis block
pub const GENESIS_HASH: &str = "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f";

/// Previous-hash marker carried by the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Validator signature carried by the genesis block
pub const GENESIS_SIGNATURE: &str = "SYSTEM_INIT";

/// Payload id of the genesis sentinel event
pub const GENESIS_EVENT_ID: &str = "GENESIS";

/// Participant role
///
/// Roles decide which forms and views a participant uses. The ledger core
/// itself does not enforce them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// Harvests and records collection events
    Farmer,
    /// Issues quality certificates
    LabTechnician,
    /// Dries, grinds, extracts and packages batches
    Processor,
    /// Traces products
    Consumer,
    /// System operator
    Admin,
}

impl UserRole {
    /// Whether this role authors events of the given kind in the portal
    pub fn can_record(&self, kind: EventKind) -> bool {
        match self {
            UserRole::Farmer => kind == EventKind::Collection,
            UserRole::LabTechnician => kind == EventKind::QualityTest,
            UserRole::Processor => kind == EventKind::Processing,
            UserRole::Consumer => false,
            UserRole::Admin => true,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UserRole::Farmer => "FARMER",
            UserRole::LabTechnician => "LAB_TECHNICIAN",
            UserRole::Processor => "PROCESSOR",
            UserRole::Consumer => "CONSUMER",
            UserRole::Admin => "ADMIN",
        };
        f.write_str(label)
    }
}

/// Authoring identity attached to every event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Participant id
    pub id: String,
    /// Display name
    pub name: String,
    /// Role
    pub role: UserRole,
}

impl Actor {
    /// Create a new actor
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: UserRole) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
        }
    }

    /// The system identity that authors the genesis block
    pub fn system() -> Self {
        Self::new("000", "System", UserRole::Admin)
    }
}

/// GPS position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    /// Latitude
    pub latitude: f64,
    /// Longitude
    pub longitude: f64,
}

impl GeoLocation {
    /// Create a new location
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// How the herb was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HarvestMethod {
    /// Gathered from the wild
    WildCrafted,
    /// Farmed
    Cultivated,
}

/// Event discriminator without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Harvest collection
    Collection,
    /// Laboratory quality test
    QualityTest,
    /// Processing step
    Processing,
}

impl EventKind {
    /// Wire value of the `resourceType` discriminator
    pub fn resource_type(&self) -> &'static str {
        match self {
            EventKind::Collection => "CollectionEvent",
            EventKind::QualityTest => "QualityTest",
            EventKind::Processing => "ProcessingStep",
        }
    }

    fn id_prefix(&self) -> &'static str {
        match self {
            EventKind::Collection => "COL",
            EventKind::QualityTest => "LAB",
            EventKind::Processing => "PRC",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource_type())
    }
}

static LAST_ID_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Generate a `<PREFIX>-<millis>` event id
///
/// The millisecond stamp is forced to be strictly increasing within the
/// process so two events authored in the same millisecond never share an id.
pub fn next_event_id(kind: EventKind) -> String {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_ID_MILLIS.load(Ordering::Relaxed);
    let stamp = loop {
        let candidate = now.max(last + 1);
        match LAST_ID_MILLIS.compare_exchange_weak(
            last,
            candidate,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break candidate,
            Err(current) => last = current,
        }
    };
    format!("{}-{}", kind.id_prefix(), stamp)
}

/// Harvest collection recorded by a farmer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionEvent {
    /// Batch id (`COL-...`)
    pub id: String,
    /// When the farmer recorded the harvest
    pub timestamp: DateTime<Utc>,
    /// Author
    pub actor: Actor,
    /// Botanical species
    pub species: String,
    /// Plant part used (root, leaf, ...)
    pub part_used: String,
    /// Harvested quantity in kilograms
    pub quantity_kg: f64,
    /// Where the harvest happened
    pub location: GeoLocation,
    /// Harvesting method
    pub method: HarvestMethod,
}

impl CollectionEvent {
    /// Record a new harvest authored now
    pub fn new(
        actor: Actor,
        species: impl Into<String>,
        part_used: impl Into<String>,
        quantity_kg: f64,
        location: GeoLocation,
        method: HarvestMethod,
    ) -> Self {
        Self {
            id: next_event_id(EventKind::Collection),
            timestamp: Utc::now(),
            actor,
            species: species.into(),
            part_used: part_used.into(),
            quantity_kg,
            location,
            method,
        }
    }

    /// Override the generated id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    fn genesis() -> Self {
        Self {
            id: GENESIS_EVENT_ID.to_string(),
            timestamp: Utc::now(),
            actor: Actor::system(),
            species: "Ayurveda Protocol Init".to_string(),
            part_used: "N/A".to_string(),
            quantity_kg: 0.0,
            location: GeoLocation::new(0.0, 0.0),
            method: HarvestMethod::Cultivated,
        }
    }
}

/// Laboratory measurements for a batch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityParameters {
    /// Moisture content in percent
    pub moisture_content: f64,
    /// Pesticide residue detected
    pub pesticides_detected: bool,
    /// Heavy-metal screen passed
    pub heavy_metals_passed: bool,
    /// DNA barcoding confirmed the species
    pub dna_verified: bool,
}

/// Classification label stored on a quality test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestResult {
    /// Batch passed
    Pass,
    /// Batch failed
    Fail,
}

impl TestResult {
    /// Moisture above this percentage fails the classification
    pub const MAX_MOISTURE_PCT: f64 = 12.0;

    /// Derive the label from the raw parameters
    ///
    /// PASS iff moisture ≤ 12 %, DNA verified and no pesticides detected.
    /// This label is informational and does not gate admission to the chain.
    pub fn derive(params: &QualityParameters) -> Self {
        if params.moisture_content <= Self::MAX_MOISTURE_PCT
            && params.dna_verified
            && !params.pesticides_detected
        {
            TestResult::Pass
        } else {
            TestResult::Fail
        }
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestResult::Pass => f.write_str("PASS"),
            TestResult::Fail => f.write_str("FAIL"),
        }
    }
}

/// Quality certificate issued by a lab technician
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityTestEvent {
    /// Certificate id (`LAB-...`)
    pub id: String,
    /// When the test was recorded
    pub timestamp: DateTime<Utc>,
    /// Author
    pub actor: Actor,
    /// Collection batch this test refers to
    pub batch_id: String,
    /// Issuing laboratory
    pub lab_name: String,
    /// Measurements
    pub parameters: QualityParameters,
    /// Derived classification
    pub result: TestResult,
}

impl QualityTestEvent {
    /// Record a new test authored now; the lab name is the actor's name
    pub fn new(actor: Actor, batch_id: impl Into<String>, parameters: QualityParameters) -> Self {
        Self {
            id: next_event_id(EventKind::QualityTest),
            timestamp: Utc::now(),
            lab_name: actor.name.clone(),
            actor,
            batch_id: batch_id.into(),
            result: TestResult::derive(&parameters),
            parameters,
        }
    }

    /// Override the generated id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// Processing operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessType {
    /// Drying
    Drying,
    /// Grinding
    Grinding,
    /// Extraction
    Extraction,
    /// Packaging
    Packaging,
}

/// Processing step applied to a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingEvent {
    /// Step id (`PRC-...`)
    pub id: String,
    /// When the step was recorded
    pub timestamp: DateTime<Utc>,
    /// Author
    pub actor: Actor,
    /// Collection batch being processed
    pub batch_id: String,
    /// Operation
    pub process_type: ProcessType,
    /// Facility name or address
    pub facility_location: String,
    /// Process temperature in °C
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

impl ProcessingEvent {
    /// Record a new processing step authored now
    pub fn new(
        actor: Actor,
        batch_id: impl Into<String>,
        process_type: ProcessType,
        facility_location: impl Into<String>,
        temperature: Option<f64>,
    ) -> Self {
        Self {
            id: next_event_id(EventKind::Processing),
            timestamp: Utc::now(),
            actor,
            batch_id: batch_id.into(),
            process_type,
            facility_location: facility_location.into(),
            temperature,
        }
    }
}

/// Transaction payload carried by a block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resourceType")]
pub enum Event {
    /// Harvest collection
    #[serde(rename = "CollectionEvent")]
    Collection(CollectionEvent),
    /// Quality test
    #[serde(rename = "QualityTest")]
    QualityTest(QualityTestEvent),
    /// Processing step
    #[serde(rename = "ProcessingStep")]
    Processing(ProcessingEvent),
}

impl Event {
    /// Discriminator
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Collection(_) => EventKind::Collection,
            Event::QualityTest(_) => EventKind::QualityTest,
            Event::Processing(_) => EventKind::Processing,
        }
    }

    /// Event id
    pub fn id(&self) -> &str {
        match self {
            Event::Collection(e) => &e.id,
            Event::QualityTest(e) => &e.id,
            Event::Processing(e) => &e.id,
        }
    }

    /// Authoring timestamp
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Event::Collection(e) => e.timestamp,
            Event::QualityTest(e) => e.timestamp,
            Event::Processing(e) => e.timestamp,
        }
    }

    /// Author
    pub fn actor(&self) -> &Actor {
        match self {
            Event::Collection(e) => &e.actor,
            Event::QualityTest(e) => &e.actor,
            Event::Processing(e) => &e.actor,
        }
    }

    /// Batch this event links to, if it is not itself a batch
    pub fn batch_id(&self) -> Option<&str> {
        match self {
            Event::Collection(_) => None,
            Event::QualityTest(e) => Some(&e.batch_id),
            Event::Processing(e) => Some(&e.batch_id),
        }
    }

    /// Whether this event is, or refers to, the given identifier
    pub fn concerns(&self, identifier: &str) -> bool {
        self.id() == identifier || self.batch_id() == Some(identifier)
    }
}

impl From<CollectionEvent> for Event {
    fn from(event: CollectionEvent) -> Self {
        Event::Collection(event)
    }
}

impl From<QualityTestEvent> for Event {
    fn from(event: QualityTestEvent) -> Self {
        Event::QualityTest(event)
    }
}

impl From<ProcessingEvent> for Event {
    fn from(event: ProcessingEvent) -> Self {
        Event::Processing(event)
    }
}

/// Immutable chain entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Position in the chain (genesis = 0)
    pub index: u64,
    /// When the block was built
    pub timestamp: DateTime<Utc>,
    /// Transaction payload
    pub data: Event,
    /// Hash of the preceding block
    pub previous_hash: String,
    /// SHA-256 of the canonical block string, lowercase hex
    pub hash: String,
    /// Placeholder validator signature
    pub validator_signature: String,
}

impl Block {
    /// The pre-seeded first block
    pub fn genesis() -> Self {
        Self {
            index: 0,
            timestamp: Utc::now(),
            data: Event::Collection(CollectionEvent::genesis()),
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
            hash: GENESIS_HASH.to_string(),
            validator_signature: GENESIS_SIGNATURE.to_string(),
        }
    }

    /// Whether this is the genesis block
    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }

    /// Canonical string hashed into [`Block::hash`]
    pub fn canonical_string(&self) -> crate::Result<String> {
        canonical_string(self.index, &self.previous_hash, &self.timestamp, &self.data)
    }

    /// Recompute the content hash from the block's fields
    pub fn compute_hash(&self) -> crate::Result<String> {
        let canonical = self.canonical_string()?;
        Ok(crate::crypto::sha256_hex(canonical.as_bytes()))
    }
}

/// Format a timestamp the way it enters the canonical string
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `index ‖ previous_hash ‖ timestamp ‖ payload-json`
pub fn canonical_string(
    index: u64,
    previous_hash: &str,
    timestamp: &DateTime<Utc>,
    data: &Event,
) -> crate::Result<String> {
    let payload = serde_json::to_string(data)?;
    Ok(format!(
        "{}{}{}{}",
        index,
        previous_hash,
        format_timestamp(timestamp),
        payload
    ))
}
