//! Search query and per-endpoint results

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

use crate::{EndpointError, Vrm};

/// Body posted to every search endpoint
///
/// Scoped to one dispatch; discarded when the dispatch returns.
#[derive(Debug, Clone, Serialize)]
pub struct SearchQuery {
    /// Registration mark being searched
    #[serde(rename = "vrm")]
    pub identifier: Vrm,

    /// Issue time, sent as an RFC 3339 timestamp
    #[serde(rename = "contravention_date", serialize_with = "serialize_rfc3339")]
    pub issued_at: DateTime<Utc>,
}

impl SearchQuery {
    /// Build a query stamped with the current time
    pub fn new(identifier: Vrm) -> Self {
        Self::at(identifier, Utc::now())
    }

    /// Build a query with an explicit issue time
    pub fn at(identifier: Vrm, issued_at: DateTime<Utc>) -> Self {
        Self {
            identifier,
            issued_at,
        }
    }
}

fn serialize_rfc3339<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// What happened at one endpoint during one search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointOutcome {
    /// Classified as a match and won the search
    Matched,
    /// Answered, but not a qualifying match
    NotMatched,
    /// Never requested because the search had already stopped
    Skipped,
    /// Classified as a match after another endpoint had already won
    Discarded,
    /// Dropped out of the search
    Failed(EndpointError),
}

impl EndpointOutcome {
    /// Short label used for metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::NotMatched => "not_matched",
            Self::Skipped => "skipped",
            Self::Discarded => "discarded",
            Self::Failed(e) => e.kind(),
        }
    }
}

/// Result of one request attempt, attributable to exactly one endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointResult {
    /// Endpoint URL
    pub endpoint: String,
    /// Endpoint-local outcome
    pub outcome: EndpointOutcome,
}

impl EndpointResult {
    pub fn new(endpoint: impl Into<String>, outcome: EndpointOutcome) -> Self {
        Self {
            endpoint: endpoint.into(),
            outcome,
        }
    }
}
