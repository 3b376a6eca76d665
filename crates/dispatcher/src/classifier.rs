//! Classifier - decides whether an endpoint response is a qualifying match

use contracts::VehicleData;
use tracing::warn;

/// Classification of one raw endpoint payload
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Decoded and `is_hirer_vehicle` is true
    Match(VehicleData),
    /// Decoded, flag false or absent
    NoMatch,
    /// Not decodable as vehicle data
    Undecodable(String),
}

impl Classification {
    pub fn qualifies(&self) -> bool {
        matches!(self, Self::Match(_))
    }
}

/// Classify a raw payload
///
/// Never fails: a payload that cannot be decoded is a non-match, reported
/// with the endpoint that produced it.
pub fn classify(endpoint: &str, payload: &[u8]) -> Classification {
    match serde_json::from_slice::<VehicleData>(payload) {
        Ok(data) if data.is_hirer_vehicle => Classification::Match(data),
        Ok(_) => Classification::NoMatch,
        Err(e) => {
            warn!(endpoint = %endpoint, error = %e, "Invalid JSON from endpoint");
            Classification::Undecodable(e.to_string())
        }
    }
}
