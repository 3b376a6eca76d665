//! Vehicle records and the vehicle-data shape returned by search endpoints

use serde::{Deserialize, Serialize};

use crate::Vrm;

/// One row of the listing feed
///
/// Consumed exactly once by the orchestrator, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleRecord {
    /// Registration mark (natural key)
    pub identifier: Vrm,

    /// Company the listing attributes the vehicle to
    pub source_company: String,
}

impl VehicleRecord {
    pub fn new(identifier: impl Into<Vrm>, source_company: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            source_company: source_company.into(),
        }
    }
}

/// Decoded search endpoint response
///
/// Missing fields decode to their zero value, so an endpoint that omits
/// `is_hirer_vehicle` is treated as a non-match rather than a decode failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleData {
    /// Registration mark echoed by the endpoint
    #[serde(default)]
    pub vrm: String,

    /// Context date echoed by the endpoint
    #[serde(default)]
    pub contravention_date: String,

    /// Match flag
    #[serde(default)]
    pub is_hirer_vehicle: bool,

    /// Company details, shape owned by each endpoint
    #[serde(default)]
    pub lease_company: serde_json::Value,
}
