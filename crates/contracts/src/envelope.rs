//! MatchEnvelope - the single message published per accepted match

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::VehicleData;

/// Reference minted once per search, independent of any endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Mint a fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Accepted match, owned by the publisher until acknowledged
///
/// Serializes as `{"reference": ..., <vehicle fields>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEnvelope {
    /// Search reference
    #[serde(rename = "reference")]
    pub correlation_id: CorrelationId,

    /// Matched vehicle payload
    #[serde(flatten)]
    pub vehicle: VehicleData,

    /// Endpoint that produced the match (diagnostics only, not published)
    #[serde(skip)]
    pub source_endpoint: Option<String>,
}

impl MatchEnvelope {
    pub fn new(correlation_id: CorrelationId, vehicle: VehicleData) -> Self {
        Self {
            correlation_id,
            vehicle,
            source_endpoint: None,
        }
    }

    /// Attach the winning endpoint
    pub fn with_source(mut self, endpoint: impl Into<String>) -> Self {
        self.source_endpoint = Some(endpoint.into());
        self
    }

    /// Encode the published form
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decode the published form
    pub fn from_json(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}
