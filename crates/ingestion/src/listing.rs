//! Listing feed - scrapes the vehicle table from the listing page

use contracts::VehicleRecord;
use scraper::{Html, Selector};
use tracing::{info, instrument, warn};

use crate::error::{IngestionError, Result};

const ROW_SELECTOR: &str = "table tbody tr";
const CELL_SELECTOR: &str = "td";

/// Source of the vehicles to search
///
/// Returns the full ordered list up front; the orchestrator never pages.
#[trait_variant::make(ListingSource: Send)]
pub trait LocalListingSource {
    /// Fetch every vehicle record
    ///
    /// # Errors
    /// Any failure here is fatal to the run
    async fn fetch(&self) -> Result<Vec<VehicleRecord>>;
}

/// Listing page served as an HTML table
///
/// Each `table tbody tr` with at least two cells is one vehicle:
/// registration mark in the first cell, company in the second.
#[derive(Debug, Clone)]
pub struct HtmlListingSource {
    client: reqwest::Client,
    url: String,
}

impl HtmlListingSource {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch_body(&self) -> Result<String> {
        let request_error = |e: reqwest::Error| IngestionError::Request {
            url: self.url.clone(),
            message: e.to_string(),
        };

        let response = self.client.get(&self.url).send().await.map_err(request_error)?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(IngestionError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(request_error)
    }
}

impl ListingSource for HtmlListingSource {
    #[instrument(name = "listing_fetch", skip(self), fields(url = %self.url))]
    async fn fetch(&self) -> Result<Vec<VehicleRecord>> {
        let body = self.fetch_body().await?;
        let vehicles = parse_listing(&body)?;

        if vehicles.is_empty() {
            warn!("No vehicles found in the listing page");
        }
        info!(count = vehicles.len(), "Fetched vehicles");

        Ok(vehicles)
    }
}

/// Extract vehicle rows from the listing page markup
pub fn parse_listing(html: &str) -> Result<Vec<VehicleRecord>> {
    let rows = selector(ROW_SELECTOR)?;
    let cells = selector(CELL_SELECTOR)?;
    let document = Html::parse_document(html);

    let vehicles = document
        .select(&rows)
        .filter_map(|row| {
            let columns: Vec<String> = row
                .select(&cells)
                .map(|cell| cell.text().collect::<String>().trim().to_string())
                .collect();

            match columns.as_slice() {
                [vrm, company, ..] => Some(VehicleRecord::new(vrm.as_str(), company.as_str())),
                _ => None,
            }
        })
        .collect();

    Ok(vehicles)
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| IngestionError::Selector {
        selector: css.to_string(),
        message: e.to_string(),
    })
}
