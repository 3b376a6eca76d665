//! Pipeline orchestrator - a bounded worker pool over the preloaded job queue.
//!
//! Each worker takes the next vehicle, runs one search, publishes the match
//! (if any) under its own deadline and moves on. Job-level failures are
//! logged and counted; only a destination that never becomes ready ends
//! the run.

use std::sync::Arc;
use std::time::Duration;

use contracts::{MatchEnvelope, PipelineSettings, VehicleRecord};
use dispatcher::{SearchDispatcher, SearchReport, SearchTransport};
use ingestion::{JobQueue, JobReceiver};
use publisher::{MatchPublisher, PublishError, TopicClient};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, instrument, warn, Instrument};

use super::PipelineStats;
use crate::error::{CliError, Result};

/// Pipeline configuration
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Shared deadline for one search fan-out
    pub search_timeout: Duration,

    /// Deadline for one publish, independent of the search deadline
    pub publish_timeout: Duration,
}

impl From<&PipelineSettings> for PipelineConfig {
    fn from(settings: &PipelineSettings) -> Self {
        Self {
            search_timeout: settings.search_timeout,
            publish_timeout: settings.publish_timeout,
        }
    }
}

/// Main pipeline orchestrator
pub struct Pipeline<T, C> {
    config: PipelineConfig,
    dispatcher: SearchDispatcher<T>,
    publisher: Arc<MatchPublisher<C>>,
    shutdown: CancellationToken,
}

impl<T, C> Pipeline<T, C>
where
    T: SearchTransport + Send + Sync + 'static,
    C: TopicClient + Send + Sync + 'static,
{
    /// Create a new pipeline
    ///
    /// Cancelling `shutdown` stops workers from taking further jobs;
    /// jobs already in progress run to completion.
    pub fn new(
        config: PipelineConfig,
        dispatcher: SearchDispatcher<T>,
        publisher: Arc<MatchPublisher<C>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            dispatcher,
            publisher,
            shutdown,
        }
    }

    /// Process every record on `worker_count` workers and wait for all of them
    #[instrument(name = "pipeline", skip(self, records), fields(vehicles = records.len()))]
    pub async fn run(&self, records: Vec<VehicleRecord>, worker_count: usize) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let vehicles_total = records.len();

        // Confirmed once, before any job and outside every job deadline
        let attempts = self
            .publisher
            .ensure_ready()
            .await
            .map_err(CliError::destination)?;
        observability::record_topic_ready_attempts(attempts);

        let jobs = JobQueue::preloaded(records);

        let mut workers = JoinSet::new();
        for id in 1..=worker_count.max(1) {
            let worker = Worker {
                id,
                jobs: jobs.clone(),
                config: self.config,
                dispatcher: self.dispatcher.clone(),
                publisher: self.publisher.clone(),
                shutdown: self.shutdown.clone(),
            };
            workers.spawn(worker.run().instrument(info_span!("worker", worker = id)));
        }
        drop(jobs);
        info!(workers = worker_count.max(1), vehicles_total, "Workers started");

        let mut stats = PipelineStats {
            vehicles_total,
            ..Default::default()
        };
        let mut fatal = None;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(Ok(worker_stats)) => stats.merge(&worker_stats),
                Ok(Err((worker_stats, e))) => {
                    stats.merge(&worker_stats);
                    if fatal.is_none() {
                        fatal = Some(e);
                    }
                }
                Err(e) => error!(error = %e, "Worker task panicked"),
            }
        }
        stats.duration = start_time.elapsed();

        if let Some(e) = fatal {
            return Err(CliError::destination(e));
        }

        info!(
            processed = stats.vehicles_processed,
            matches = stats.matches,
            published = stats.published,
            publish_failures = stats.publish_failures,
            duration_secs = stats.duration.as_secs_f64(),
            "All workers finished"
        );
        Ok(stats)
    }
}

struct Worker<T, C> {
    id: usize,
    jobs: JobReceiver,
    config: PipelineConfig,
    dispatcher: SearchDispatcher<T>,
    publisher: Arc<MatchPublisher<C>>,
    shutdown: CancellationToken,
}

impl<T, C> Worker<T, C>
where
    T: SearchTransport + Send + Sync + 'static,
    C: TopicClient + Send + Sync + 'static,
{
    async fn run(self) -> std::result::Result<PipelineStats, (PipelineStats, PublishError)> {
        let mut stats = PipelineStats::default();

        loop {
            let record = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested, worker stopping");
                    break;
                }
                next = self.jobs.recv() => match next {
                    Ok(record) => record,
                    Err(_) => break,
                },
            };

            let span = info_span!(
                "job",
                vrm = %record.identifier,
                company = %record.source_company
            );
            if let Err(e) = self.process(&record, &mut stats).instrument(span).await {
                error!(worker = self.id, error = %e, "Destination unavailable, stopping run");
                self.shutdown.cancel();
                return Err((stats, e));
            }
        }

        info!(worker = self.id, processed = stats.vehicles_processed, "Worker finished");
        Ok(stats)
    }

    /// One job. Only a fatal publish error is returned.
    async fn process(
        &self,
        record: &VehicleRecord,
        stats: &mut PipelineStats,
    ) -> std::result::Result<(), PublishError> {
        info!(worker = self.id, "Processing vehicle");

        let report = self
            .dispatcher
            .search(&record.identifier, self.config.search_timeout)
            .await;
        self.record_search(&report, stats);

        let Some(envelope) = report.envelope else {
            stats.no_match += 1;
            if report.timed_out {
                warn!(worker = self.id, reference = %report.correlation_id, "No hirer match before deadline");
            } else {
                info!(worker = self.id, reference = %report.correlation_id, "No hirer match");
            }
            return Ok(());
        };
        stats.matches += 1;

        match self.publish(&envelope).await {
            Ok(message_id) => {
                stats.published += 1;
                observability::record_publish(true);
                info!(
                    worker = self.id,
                    reference = %envelope.correlation_id,
                    message_id = %message_id,
                    "Hirer match published"
                );
                Ok(())
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                stats.publish_failures += 1;
                observability::record_publish(false);
                error!(
                    worker = self.id,
                    reference = %envelope.correlation_id,
                    endpoint = envelope.source_endpoint.as_deref().unwrap_or("unknown"),
                    error = %e,
                    "Failed to publish message"
                );
                Ok(())
            }
        }
    }

    async fn publish(&self, envelope: &MatchEnvelope) -> std::result::Result<String, PublishError> {
        self.publisher.ensure_ready().await?;

        let limit = self.config.publish_timeout;
        tokio::time::timeout(limit, self.publisher.publish(envelope))
            .await
            .unwrap_or(Err(PublishError::Timeout(limit)))
    }

    fn record_search(&self, report: &SearchReport, stats: &mut PipelineStats) {
        let latency_ms = report.elapsed.as_secs_f64() * 1000.0;
        observability::record_search(report.matched(), report.timed_out, latency_ms);
        for result in &report.results {
            observability::record_endpoint_result(result);
        }
        stats
            .search_metrics
            .update(report.matched(), report.timed_out, latency_ms, &report.results);
        stats.vehicles_processed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::TopicReadiness;
    use dispatcher::{MockResponse, MockTransport};
    use publisher::MockTopicClient;

    const A: &str = "http://a.test/test_search/acme";
    const B: &str = "http://b.test/test_search/fleet";

    fn config() -> PipelineConfig {
        PipelineConfig {
            search_timeout: Duration::from_secs(5),
            publish_timeout: Duration::from_secs(15),
        }
    }

    fn readiness() -> TopicReadiness {
        TopicReadiness {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }

    fn records(count: usize) -> Vec<VehicleRecord> {
        (0..count)
            .map(|i| VehicleRecord::new(format!("AB{i:02}CDE"), "Acme Lease"))
            .collect()
    }

    fn pipeline(
        transport: MockTransport,
        client: Arc<MockTopicClient>,
        config: PipelineConfig,
    ) -> Pipeline<MockTransport, MockTopicClient> {
        let endpoints = vec![A.to_string(), B.to_string()];
        Pipeline::new(
            config,
            SearchDispatcher::new(transport, &endpoints),
            Arc::new(MatchPublisher::with_shared(client, readiness())),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_every_match_published_once() {
        let transport = MockTransport::new()
            .respond(A, MockResponse::not_hirer())
            .respond(B, MockResponse::hirer());
        let client = Arc::new(MockTopicClient::ready_on(1));

        let stats = pipeline(transport, client.clone(), config())
            .run(records(6), 3)
            .await
            .unwrap();

        assert_eq!(stats.vehicles_processed, 6);
        assert_eq!(stats.matches, 6);
        assert_eq!(stats.published, 6);

        let published = client.published();
        let mut vrms: Vec<&str> = published.iter().map(|e| e.vehicle.vrm.as_str()).collect();
        vrms.sort();
        vrms.dedup();
        assert_eq!(vrms.len(), 6);
    }

    #[tokio::test]
    async fn test_no_match_publishes_nothing() {
        let transport = MockTransport::new()
            .respond(A, MockResponse::not_hirer())
            .respond(B, MockResponse::not_hirer());
        let client = Arc::new(MockTopicClient::ready_on(1));

        let stats = pipeline(transport, client.clone(), config())
            .run(records(4), 2)
            .await
            .unwrap();

        assert_eq!(stats.no_match, 4);
        assert_eq!(stats.published, 0);
        assert!(client.published().is_empty());
        assert_eq!(client.checks(), 1);
    }

    #[tokio::test]
    async fn test_publish_failure_does_not_stop_pipeline() {
        let transport = MockTransport::new().respond(A, MockResponse::hirer());
        let client = Arc::new(MockTopicClient::ready_on(1).rejecting());

        let stats = pipeline(transport, client, config())
            .run(records(5), 2)
            .await
            .unwrap();

        assert_eq!(stats.vehicles_processed, 5);
        assert_eq!(stats.publish_failures, 5);
        assert_eq!(stats.published, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_timeout_is_job_level() {
        let transport = MockTransport::new().respond(A, MockResponse::hirer());
        let client = Arc::new(MockTopicClient::ready_on(1).slow_publish(Duration::from_secs(20)));

        let stats = pipeline(transport, client, config())
            .run(records(2), 1)
            .await
            .unwrap();

        assert_eq!(stats.publish_failures, 2);
        assert!(stats.duration < Duration::from_secs(40));
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_deadline_does_not_stall_workers() {
        let transport = MockTransport::new()
            .respond(A, MockResponse::hirer().after(Duration::from_secs(30)))
            .respond(B, MockResponse::hirer().after(Duration::from_secs(30)));
        let client = Arc::new(MockTopicClient::ready_on(1));
        let config = PipelineConfig {
            search_timeout: Duration::from_secs(1),
            ..config()
        };

        let stats = pipeline(transport, client, config)
            .run(records(4), 2)
            .await
            .unwrap();

        assert_eq!(stats.vehicles_processed, 4);
        assert_eq!(stats.no_match, 4);
        assert_eq!(stats.search_metrics.timed_out, 4);
        assert!(stats.duration < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unready_topic_aborts_run() {
        let transport = MockTransport::new().respond(A, MockResponse::hirer());
        let client = Arc::new(MockTopicClient::never_ready());

        let result = pipeline(transport, client.clone(), config())
            .run(records(10), 2)
            .await;

        assert!(matches!(result, Err(CliError::Destination(_))));
        assert!(client.published().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_readiness_poll_outlasting_publish_timeout_is_fatal() {
        let transport = Arc::new(MockTransport::new().respond(A, MockResponse::hirer()));
        let client = Arc::new(MockTopicClient::never_ready());
        let config = PipelineConfig {
            search_timeout: Duration::from_secs(5),
            publish_timeout: Duration::from_secs(15),
        };

        let pipeline = Pipeline::new(
            config,
            SearchDispatcher::with_shared(transport.clone(), &[A.to_string()]),
            Arc::new(MatchPublisher::with_shared(client.clone(), TopicReadiness::default())),
            CancellationToken::new(),
        );
        let result = pipeline.run(records(3), 1).await;

        assert!(matches!(result, Err(CliError::Destination(_))));
        assert_eq!(client.checks(), 10);
        assert_eq!(transport.started(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_readiness_confirmed_once_per_run() {
        let transport = MockTransport::new().respond(A, MockResponse::hirer());
        let client = Arc::new(MockTopicClient::ready_on(3));

        let stats = pipeline(transport, client.clone(), config())
            .run(records(6), 3)
            .await
            .unwrap();

        assert_eq!(stats.published, 6);
        assert_eq!(client.checks(), 3);
    }

    #[tokio::test]
    async fn test_shutdown_before_start_takes_no_jobs() {
        let transport = Arc::new(MockTransport::new().respond(A, MockResponse::hirer()));
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let pipeline = Pipeline::new(
            config(),
            SearchDispatcher::with_shared(transport.clone(), &[A.to_string()]),
            Arc::new(MatchPublisher::new(MockTopicClient::ready_on(1), readiness())),
            shutdown,
        );
        let stats = pipeline.run(records(3), 2).await.unwrap();

        assert_eq!(stats.vehicles_processed, 0);
        assert_eq!(stats.unprocessed(), 3);
        assert_eq!(transport.started(), 0);
    }

    #[tokio::test]
    async fn test_empty_listing() {
        let client = Arc::new(MockTopicClient::ready_on(1));
        let stats = pipeline(MockTransport::new(), client, config())
            .run(Vec::new(), 4)
            .await
            .unwrap();

        assert_eq!(stats.vehicles_total, 0);
        assert_eq!(stats.vehicles_processed, 0);
    }
}
