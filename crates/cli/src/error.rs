//! Error types for CLI operations.

use contracts::ContractError;
use ingestion::IngestionError;
use publisher::PublishError;
use thiserror::Error;

/// Process-level failures; each one ends the run
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration could not be resolved or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ContractError),

    /// Listing feed unavailable, no work possible
    #[error("Failed to fetch vehicle list: {0}")]
    Listing(#[from] IngestionError),

    /// Destination topic never became ready
    #[error("Publish destination unavailable: {0}")]
    Destination(#[source] PublishError),

    /// Shared HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl CliError {
    pub fn destination(error: PublishError) -> Self {
        Self::Destination(error)
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
