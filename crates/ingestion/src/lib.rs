//! # Ingestion
//!
//! Vehicle listing ingestion module.
//!
//! Responsibilities:
//! - Fetch the vehicle listing page and scrape its table into `VehicleRecord`s
//! - Expose the listing behind the `ListingSource` trait
//! - Build the preloaded job queue consumed by the worker pool
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{HtmlListingSource, JobQueue, ListingSource};
//!
//! let source = HtmlListingSource::new(client, &settings.vehicle_list_url);
//! let records = source.fetch().await?;
//! let jobs = JobQueue::preloaded(records);
//! while let Ok(record) = jobs.recv().await {
//!     // search record.identifier
//! }
//! ```

mod error;
mod listing;
mod mock;
mod queue;

// Re-exports
pub use contracts::VehicleRecord;
pub use error::{IngestionError, Result};
pub use listing::{parse_listing, HtmlListingSource, ListingSource, LocalListingSource};
pub use mock::StaticListingSource;
pub use queue::{JobQueue, JobReceiver};
