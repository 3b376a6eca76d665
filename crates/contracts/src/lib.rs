//! # Contracts
//!
//! Shared data model for the hirer lookup pipeline.
//! All business crates depend on this crate; it depends on none of them.
//!
//! ## Flow
//! - `VehicleRecord` comes from the listing feed, one per job
//! - `SearchQuery` is built per dispatch and posted to every search endpoint
//! - `EndpointResult` records what happened at each endpoint
//! - `MatchEnvelope` carries the single winning vehicle to the publisher

mod envelope;
mod error;
mod search;
mod settings;
mod vehicle;
mod vrm;

pub use envelope::*;
pub use error::*;
pub use search::*;
pub use settings::*;
pub use vehicle::*;
pub use vrm::Vrm;
