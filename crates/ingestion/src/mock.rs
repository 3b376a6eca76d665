//! Static listing source for tests

use contracts::VehicleRecord;

use crate::error::Result;
use crate::listing::ListingSource;

/// Listing source that returns a fixed set of records
#[derive(Debug, Clone, Default)]
pub struct StaticListingSource {
    records: Vec<VehicleRecord>,
}

impl StaticListingSource {
    pub fn new(records: Vec<VehicleRecord>) -> Self {
        Self { records }
    }
}

impl ListingSource for StaticListingSource {
    async fn fetch(&self) -> Result<Vec<VehicleRecord>> {
        Ok(self.records.clone())
    }
}
