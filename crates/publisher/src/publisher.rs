//! MatchPublisher - readiness gate plus one publish per accepted match

use std::sync::Arc;

use contracts::{MatchEnvelope, TopicReadiness};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use crate::client::TopicClient;
use crate::error::{PublishError, Result};

/// Publishes accepted matches to one topic
///
/// Readiness is confirmed once per publisher and memoised; concurrent
/// callers share a single polling sequence. There is no retry on publish.
#[derive(Debug)]
pub struct MatchPublisher<C> {
    client: Arc<C>,
    readiness: TopicReadiness,
    ready: OnceCell<u32>,
}

impl<C: TopicClient + Sync> MatchPublisher<C> {
    pub fn new(client: C, readiness: TopicReadiness) -> Self {
        Self::with_shared(Arc::new(client), readiness)
    }

    pub fn with_shared(client: Arc<C>, readiness: TopicReadiness) -> Self {
        Self {
            client,
            readiness,
            ready: OnceCell::new(),
        }
    }

    pub fn topic(&self) -> &str {
        self.client.topic()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.initialized()
    }

    /// Confirm the topic exists, polling up to `max_attempts` times
    ///
    /// Returns the attempt on which the topic was found. Failure here means
    /// nothing can be published safely and the run must stop.
    pub async fn ensure_ready(&self) -> Result<u32> {
        self.ready
            .get_or_try_init(|| self.poll_topic())
            .await
            .copied()
    }

    #[instrument(name = "topic_readiness", skip(self), fields(topic = %self.client.topic()))]
    async fn poll_topic(&self) -> Result<u32> {
        let TopicReadiness {
            max_attempts,
            delay,
        } = self.readiness;

        for attempt in 1..=max_attempts {
            match self.client.topic_exists().await {
                Ok(true) => {
                    info!(attempt, "Pub/Sub topic is ready");
                    return Ok(attempt);
                }
                Ok(false) => info!(attempt, max_attempts, "Waiting for Pub/Sub topic"),
                Err(e) => warn!(attempt, max_attempts, error = %e, "Topic check failed"),
            }
            if attempt < max_attempts {
                tokio::time::sleep(delay).await;
            }
        }

        Err(PublishError::TopicUnavailable {
            topic: self.client.topic().to_string(),
            attempts: max_attempts,
        })
    }

    /// Publish one envelope and wait for the acknowledgement
    ///
    /// Returns the destination message id.
    #[instrument(
        name = "publish",
        skip(self, envelope),
        fields(reference = %envelope.correlation_id, vrm = %envelope.vehicle.vrm)
    )]
    pub async fn publish(&self, envelope: &MatchEnvelope) -> Result<String> {
        self.ensure_ready().await?;

        let data = envelope.to_json()?;
        debug!(payload = %String::from_utf8_lossy(&data), "Publishing message");

        let message_id = self.client.publish(data).await?;
        info!(message_id = %message_id, "Published message");
        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTopicClient;
    use contracts::{CorrelationId, VehicleData};
    use std::time::Duration;
    use tokio::time::Instant;

    fn readiness(max_attempts: u32, secs: u64) -> TopicReadiness {
        TopicReadiness {
            max_attempts,
            delay: Duration::from_secs(secs),
        }
    }

    fn envelope() -> MatchEnvelope {
        MatchEnvelope::new(
            CorrelationId::new(),
            VehicleData {
                vrm: "AB12CDE".into(),
                contravention_date: "2026-10-16T08:30:00Z".into(),
                is_hirer_vehicle: true,
                lease_company: serde_json::json!({ "companyname": "Acme Lease" }),
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_on_attempt_k() {
        let client = Arc::new(MockTopicClient::ready_on(3));
        let publisher = MatchPublisher::with_shared(client.clone(), readiness(10, 2));

        let started = Instant::now();
        assert_eq!(publisher.ensure_ready().await.unwrap(), 3);
        assert_eq!(client.checks(), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_ready_polls_exactly_n_times() {
        let client = Arc::new(MockTopicClient::never_ready());
        let publisher = MatchPublisher::with_shared(client.clone(), readiness(4, 2));

        let started = Instant::now();
        let err = publisher.ensure_ready().await.unwrap_err();

        assert!(err.is_fatal());
        assert!(matches!(err, PublishError::TopicUnavailable { attempts: 4, .. }));
        assert_eq!(client.checks(), 4);
        // no pause after the final attempt
        assert_eq!(started.elapsed(), Duration::from_secs(6));
        assert!(!publisher.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_errors_count_as_not_ready() {
        let client = Arc::new(MockTopicClient::ready_on(2).failing_checks(1));
        let publisher = MatchPublisher::with_shared(client.clone(), readiness(3, 1));

        assert_eq!(publisher.ensure_ready().await.unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_readiness_memoised_across_publishes() {
        let client = Arc::new(MockTopicClient::ready_on(2));
        let publisher = MatchPublisher::with_shared(client.clone(), readiness(10, 2));

        publisher.publish(&envelope()).await.unwrap();
        publisher.publish(&envelope()).await.unwrap();

        assert_eq!(client.checks(), 2);
        assert_eq!(client.published().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_poll() {
        let client = Arc::new(MockTopicClient::ready_on(3));
        let publisher = Arc::new(MatchPublisher::with_shared(client.clone(), readiness(10, 2)));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..5 {
            let publisher = publisher.clone();
            tasks.spawn(async move { publisher.ensure_ready().await });
        }
        while let Some(joined) = tasks.join_next().await {
            assert_eq!(joined.unwrap().unwrap(), 3);
        }
        assert_eq!(client.checks(), 3);
    }

    #[tokio::test]
    async fn test_published_envelope_round_trips() {
        let client = Arc::new(MockTopicClient::ready_on(1));
        let publisher = MatchPublisher::with_shared(client.clone(), readiness(1, 1));
        let sent = envelope();

        let id = publisher.publish(&sent).await.unwrap();
        assert_eq!(id, "mock-1");

        let received = client.published();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].correlation_id, sent.correlation_id);
        assert_eq!(received[0].vehicle, sent.vehicle);
    }

    #[tokio::test]
    async fn test_rejection_is_job_level() {
        let client = Arc::new(MockTopicClient::ready_on(1).rejecting());
        let publisher = MatchPublisher::with_shared(client, readiness(1, 1));

        let err = publisher.publish(&envelope()).await.unwrap_err();
        assert!(!err.is_fatal());
        assert_eq!(err.kind(), "rejected");
    }
}
