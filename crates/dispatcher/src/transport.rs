//! Search transport - posts a query to one endpoint

use bytes::Bytes;
use contracts::{EndpointError, SearchQuery};
use reqwest::StatusCode;
use tracing::debug;

use crate::endpoint::SearchEndpoint;

/// Issues one search request and returns the raw 200 response body
///
/// Implementations do not enforce the search deadline; the dispatcher
/// bounds every call and drops the future when the search stops.
#[trait_variant::make(SearchTransport: Send)]
pub trait LocalSearchTransport {
    async fn search(
        &self,
        endpoint: &SearchEndpoint,
        query: &SearchQuery,
    ) -> Result<Bytes, EndpointError>;
}

/// HTTP transport: JSON POST, 200 only
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl SearchTransport for HttpTransport {
    async fn search(
        &self,
        endpoint: &SearchEndpoint,
        query: &SearchQuery,
    ) -> Result<Bytes, EndpointError> {
        let response = self
            .client
            .post(endpoint.url().clone())
            .json(query)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status != StatusCode::OK {
            debug!(endpoint = %endpoint, status = status.as_u16(), "Non-200 response");
            return Err(EndpointError::Status(status.as_u16()));
        }

        response.bytes().await.map_err(transport_error)
    }
}

/// Flatten the reqwest error chain into one line
fn transport_error(e: reqwest::Error) -> EndpointError {
    let mut message = e.to_string();
    let mut source = std::error::Error::source(&e);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    EndpointError::Transport(message)
}
