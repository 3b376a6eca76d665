//! SearchDispatcher - fans one search out to every endpoint, first match wins

use std::sync::Arc;
use std::time::Duration;

use contracts::{
    CorrelationId, EndpointError, EndpointOutcome, EndpointResult, MatchEnvelope, SearchQuery, Vrm,
};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, info_span, instrument, warn, Instrument, Span};

use crate::classifier::{classify, Classification};
use crate::endpoint::{parse_endpoints, SearchEndpoint};
use crate::metrics::{MetricsSnapshot, SearchMetrics};
use crate::stop::StopSignal;
use crate::transport::SearchTransport;

/// Stand-in deadline when `started + search_timeout` is not representable
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Everything one search produced
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub correlation_id: CorrelationId,
    pub identifier: Vrm,
    /// The single accepted match, if any
    pub envelope: Option<MatchEnvelope>,
    /// One result per well-formed endpoint, in configured order
    pub results: Vec<EndpointResult>,
    pub elapsed: Duration,
    /// The shared deadline elapsed before a match was found
    pub timed_out: bool,
}

impl SearchReport {
    pub fn matched(&self) -> bool {
        self.envelope.is_some()
    }

    /// Endpoint that produced the accepted match
    pub fn winner(&self) -> Option<&str> {
        self.envelope
            .as_ref()
            .and_then(|e| e.source_endpoint.as_deref())
    }
}

/// State shared by the units of a single search
struct SearchContext {
    correlation_id: CorrelationId,
    query: SearchQuery,
    stop: StopSignal,
    deadline: Instant,
    search_timeout: Duration,
}

impl SearchContext {
    fn past_deadline(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Why an in-flight unit was stopped
    fn stop_reason(&self) -> EndpointError {
        if self.past_deadline() {
            EndpointError::DeadlineExceeded(self.search_timeout)
        } else {
            EndpointError::Cancelled
        }
    }
}

/// Concurrent search across all configured endpoints
///
/// Cheap to clone; workers share the transport, the validated endpoint
/// list and the counters.
pub struct SearchDispatcher<T> {
    transport: Arc<T>,
    endpoints: Arc<[SearchEndpoint]>,
    metrics: Arc<SearchMetrics>,
}

impl<T> Clone for SearchDispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            endpoints: self.endpoints.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl<T> SearchDispatcher<T>
where
    T: SearchTransport + Send + Sync + 'static,
{
    /// Build a dispatcher, dropping malformed endpoints with a warning
    pub fn new(transport: T, endpoints: &[String]) -> Self {
        Self::with_shared(Arc::new(transport), endpoints)
    }

    pub fn with_shared(transport: Arc<T>, endpoints: &[String]) -> Self {
        let valid = parse_endpoints(endpoints);
        if valid.is_empty() {
            warn!(configured = endpoints.len(), "No valid search endpoints, every search will miss");
        }
        Self {
            transport,
            endpoints: valid.into(),
            metrics: Arc::new(SearchMetrics::new()),
        }
    }

    /// Well-formed endpoints searched on every dispatch
    pub fn endpoints(&self) -> &[SearchEndpoint] {
        &self.endpoints
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Search every endpoint for `identifier`, returning the accepted match
    pub async fn dispatch(&self, identifier: &Vrm, search_timeout: Duration) -> Option<MatchEnvelope> {
        self.search(identifier, search_timeout).await.envelope
    }

    /// Search every endpoint and report what each one did
    ///
    /// Returns only after every unit has finished, so nothing from this
    /// search outlives the call.
    #[instrument(
        name = "search",
        skip(self, identifier, search_timeout),
        fields(vrm = %identifier, reference = tracing::field::Empty)
    )]
    pub async fn search(&self, identifier: &Vrm, search_timeout: Duration) -> SearchReport {
        let started = Instant::now();
        let correlation_id = CorrelationId::new();
        Span::current().record("reference", tracing::field::display(correlation_id));
        self.metrics.inc_searches();

        let ctx = Arc::new(SearchContext {
            correlation_id,
            query: SearchQuery::new(identifier.clone()),
            stop: StopSignal::new(),
            deadline: deadline_after(started, search_timeout),
            search_timeout,
        });

        // capacity 1: only the unit that wins the stop signal sends
        let (winner_tx, mut winner_rx) = mpsc::channel(1);
        let mut units = JoinSet::new();
        for (index, endpoint) in self.endpoints.iter().enumerate() {
            let span = info_span!("endpoint", endpoint = %endpoint);
            let unit = run_unit(
                self.transport.clone(),
                endpoint.clone(),
                ctx.clone(),
                winner_tx.clone(),
            );
            units.spawn(async move { (index, unit.await) }.instrument(span));
        }
        drop(winner_tx);

        let (mut envelope, timed_out) = tokio::select! {
            found = winner_rx.recv() => (found, false),
            _ = tokio::time::sleep_until(ctx.deadline) => (None, true),
        };

        ctx.stop.abort();
        let mut indexed = Vec::with_capacity(self.endpoints.len());
        while let Some(joined) = units.join_next().await {
            match joined {
                Ok(result) => indexed.push(result),
                Err(e) => error!(error = %e, "Search unit panicked"),
            }
        }
        indexed.sort_by_key(|(index, _)| *index);
        let results: Vec<EndpointResult> = indexed.into_iter().map(|(_, r)| r).collect();

        // a winner may have sent in the same instant the deadline fired
        if envelope.is_none() {
            envelope = winner_rx.try_recv().ok();
        }
        let timed_out = timed_out && envelope.is_none();

        let elapsed = started.elapsed();
        for result in &results {
            self.metrics.record_outcome(&result.outcome);
        }
        match &envelope {
            Some(found) => {
                self.metrics.inc_matches();
                info!(
                    endpoint = found.source_endpoint.as_deref().unwrap_or("unknown"),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Hirer match accepted"
                );
            }
            None if timed_out => {
                self.metrics.inc_timeouts();
                warn!(
                    timeout_ms = search_timeout.as_millis() as u64,
                    "Timeout reached, no match found"
                );
            }
            None => info!(endpoints = results.len(), "No hirer match found"),
        }

        SearchReport {
            correlation_id,
            identifier: identifier.clone(),
            envelope,
            results,
            elapsed,
            timed_out,
        }
    }
}

fn deadline_after(started: Instant, search_timeout: Duration) -> Instant {
    started
        .checked_add(search_timeout)
        .or_else(|| started.checked_add(FAR_FUTURE))
        .unwrap_or(started)
}

/// One endpoint's share of a search
async fn run_unit<T>(
    transport: Arc<T>,
    endpoint: SearchEndpoint,
    ctx: Arc<SearchContext>,
    winner_tx: mpsc::Sender<MatchEnvelope>,
) -> EndpointResult
where
    T: SearchTransport + Send + Sync,
{
    let outcome = unit_outcome(transport.as_ref(), &endpoint, &ctx, &winner_tx).await;

    match &outcome {
        EndpointOutcome::Matched => info!("Hirer vehicle found"),
        EndpointOutcome::NotMatched => debug!("Not a hirer vehicle"),
        EndpointOutcome::Skipped => debug!("Skipping request, match already found"),
        EndpointOutcome::Discarded => debug!("Late match discarded"),
        EndpointOutcome::Failed(EndpointError::Cancelled) => {
            debug!("Request cancelled, match found elsewhere")
        }
        EndpointOutcome::Failed(e @ EndpointError::DeadlineExceeded(_)) => {
            warn!(error = %e, "Request timed out")
        }
        EndpointOutcome::Failed(e) => warn!(error = %e, kind = e.kind(), "Endpoint request failed"),
    }

    EndpointResult::new(endpoint.as_str(), outcome)
}

async fn unit_outcome<T>(
    transport: &T,
    endpoint: &SearchEndpoint,
    ctx: &SearchContext,
    winner_tx: &mpsc::Sender<MatchEnvelope>,
) -> EndpointOutcome
where
    T: SearchTransport + Send + Sync,
{
    if ctx.stop.is_stopped() {
        return EndpointOutcome::Skipped;
    }

    let request = tokio::time::timeout_at(ctx.deadline, transport.search(endpoint, &ctx.query));
    let response = tokio::select! {
        biased;
        answered = request => answered
            .unwrap_or_else(|_| Err(EndpointError::DeadlineExceeded(ctx.search_timeout))),
        _ = ctx.stop.stopped() => Err(ctx.stop_reason()),
    };

    let payload = match response {
        Ok(payload) => payload,
        Err(e) => return EndpointOutcome::Failed(e),
    };

    match classify(endpoint.as_str(), &payload) {
        Classification::Match(vehicle) => {
            if ctx.past_deadline() {
                return EndpointOutcome::Failed(EndpointError::DeadlineExceeded(ctx.search_timeout));
            }
            if !ctx.stop.trigger() {
                return EndpointOutcome::Discarded;
            }
            let envelope =
                MatchEnvelope::new(ctx.correlation_id, vehicle).with_source(endpoint.as_str());
            if winner_tx.try_send(envelope).is_err() {
                error!("Winning match could not be delivered");
            }
            EndpointOutcome::Matched
        }
        Classification::NoMatch => EndpointOutcome::NotMatched,
        Classification::Undecodable(reason) => EndpointOutcome::Failed(EndpointError::Decode(reason)),
    }
}
