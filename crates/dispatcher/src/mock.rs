//! Scripted transport for tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use contracts::{EndpointError, SearchQuery};
use serde_json::json;

use crate::endpoint::SearchEndpoint;
use crate::transport::SearchTransport;

/// What a scripted endpoint answers
#[derive(Debug, Clone)]
pub enum MockReply {
    /// 200 with `is_hirer_vehicle: true`
    Hirer,
    /// 200 with `is_hirer_vehicle: false`
    NotHirer,
    /// 200 with an arbitrary body
    Body(String),
    /// Non-200 status
    Status(u16),
    /// Connection failure
    Unreachable,
}

/// A reply and how long the endpoint takes to produce it
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub reply: MockReply,
    pub delay: Duration,
    /// Answer on the first poll without yielding to other tasks
    pub eager: bool,
}

impl MockResponse {
    pub fn hirer() -> Self {
        Self::immediate(MockReply::Hirer)
    }

    pub fn not_hirer() -> Self {
        Self::immediate(MockReply::NotHirer)
    }

    pub fn unreachable() -> Self {
        Self::immediate(MockReply::Unreachable)
    }

    pub fn immediate(reply: MockReply) -> Self {
        Self {
            reply,
            delay: Duration::ZERO,
            eager: false,
        }
    }

    /// Answer on the first poll, before sibling tasks get to run
    pub fn eager(reply: MockReply) -> Self {
        Self {
            eager: true,
            ..Self::immediate(reply)
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Transport answering from a per-endpoint script
///
/// Counts requests started and requests that ran to completion, so tests
/// can tell whether a slow endpoint was cancelled. Unscripted endpoints
/// are unreachable.
#[derive(Debug, Default)]
pub struct MockTransport {
    script: HashMap<String, MockResponse>,
    started: AtomicU64,
    completed: AtomicU64,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the reply for one endpoint
    pub fn respond(mut self, endpoint: impl Into<String>, response: MockResponse) -> Self {
        self.script.insert(endpoint.into(), response);
        self
    }

    pub fn started(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }
}

impl SearchTransport for MockTransport {
    async fn search(
        &self,
        endpoint: &SearchEndpoint,
        query: &SearchQuery,
    ) -> Result<Bytes, EndpointError> {
        self.started.fetch_add(1, Ordering::SeqCst);

        let response = self
            .script
            .get(endpoint.as_str())
            .cloned()
            .unwrap_or_else(MockResponse::unreachable);

        if !response.delay.is_zero() {
            tokio::time::sleep(response.delay).await;
        } else if !response.eager {
            tokio::task::yield_now().await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);

        let vehicle = |flag: bool| {
            json!({
                "vrm": query.identifier.as_str(),
                "contravention_date": query.issued_at.to_rfc3339(),
                "is_hirer_vehicle": flag,
                "lease_company": { "companyname": endpoint.as_str() },
            })
            .to_string()
        };

        match response.reply {
            MockReply::Hirer => Ok(Bytes::from(vehicle(true))),
            MockReply::NotHirer => Ok(Bytes::from(vehicle(false))),
            MockReply::Body(body) => Ok(Bytes::from(body)),
            MockReply::Status(code) => Err(EndpointError::Status(code)),
            MockReply::Unreachable => Err(EndpointError::Transport(format!(
                "connection refused: {endpoint}"
            ))),
        }
    }
}
