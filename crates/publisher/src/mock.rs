//! Scripted topic client for tests

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use contracts::MatchEnvelope;

use crate::client::TopicClient;
use crate::error::{PublishError, Result};

/// Topic that appears after a given number of existence checks
#[derive(Debug, Default)]
pub struct MockTopicClient {
    /// 1-based check on which the topic exists; `None` = never
    ready_on: Option<u32>,
    /// Leading checks that fail outright instead of answering
    failing_checks: u32,
    reject: bool,
    publish_delay: Duration,
    checks: AtomicU32,
    sequence: AtomicU64,
    messages: Mutex<Vec<Vec<u8>>>,
}

impl MockTopicClient {
    pub fn ready_on(attempt: u32) -> Self {
        Self {
            ready_on: Some(attempt),
            ..Default::default()
        }
    }

    pub fn never_ready() -> Self {
        Self::default()
    }

    pub fn failing_checks(mut self, count: u32) -> Self {
        self.failing_checks = count;
        self
    }

    /// Refuse every publish
    pub fn rejecting(mut self) -> Self {
        self.reject = true;
        self
    }

    /// Hold every publish for `delay` before answering
    pub fn slow_publish(mut self, delay: Duration) -> Self {
        self.publish_delay = delay;
        self
    }

    pub fn checks(&self) -> u32 {
        self.checks.load(Ordering::SeqCst)
    }

    /// Messages accepted so far, decoded
    pub fn published(&self) -> Vec<MatchEnvelope> {
        self.messages
            .lock()
            .map(|list| {
                list.iter()
                    .filter_map(|data| MatchEnvelope::from_json(data).ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl TopicClient for MockTopicClient {
    fn topic(&self) -> &str {
        "projects/mock/topics/mock"
    }

    async fn topic_exists(&self) -> Result<bool> {
        let attempt = self.checks.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.failing_checks {
            return Err(PublishError::TopicCheck("connection reset".into()));
        }
        Ok(self.ready_on.is_some_and(|k| attempt >= k))
    }

    async fn publish(&self, data: Vec<u8>) -> Result<String> {
        if !self.publish_delay.is_zero() {
            tokio::time::sleep(self.publish_delay).await;
        }
        if self.reject {
            return Err(PublishError::Rejected {
                status: 403,
                body: "permission denied".into(),
            });
        }
        if let Ok(mut list) = self.messages.lock() {
            list.push(data);
        }
        let id = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("mock-{id}"))
    }
}
