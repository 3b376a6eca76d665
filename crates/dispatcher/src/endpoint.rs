//! Search endpoint validation

use std::fmt;
use std::sync::Arc;

use contracts::EndpointError;
use tracing::warn;
use url::Url;

/// A configured endpoint that has both a scheme and a host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchEndpoint {
    url: Url,
    label: Arc<str>,
}

impl SearchEndpoint {
    /// Validate a configured endpoint string
    pub fn parse(raw: &str) -> Result<Self, EndpointError> {
        let malformed = |reason: String| EndpointError::MalformedTarget {
            target: raw.to_string(),
            reason,
        };

        let url = Url::parse(raw).map_err(|e| malformed(e.to_string()))?;
        if url.host_str().map_or(true, str::is_empty) {
            return Err(malformed("missing host".to_string()));
        }

        Ok(Self {
            url,
            label: Arc::from(raw),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The endpoint exactly as configured
    pub fn as_str(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for SearchEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Keep well-formed endpoints, logging and skipping the rest
pub fn parse_endpoints(raw: &[String]) -> Vec<SearchEndpoint> {
    raw.iter()
        .filter_map(|entry| match SearchEndpoint::parse(entry) {
            Ok(endpoint) => Some(endpoint),
            Err(e) => {
                warn!(endpoint = %entry, error = %e, "Invalid URL, skipping endpoint");
                None
            }
        })
        .collect()
}
