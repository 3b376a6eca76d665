//! Pipeline statistics and metrics.

use std::time::Duration;

use observability::SearchMetricsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Vehicles in the listing
    pub vehicles_total: usize,

    /// Vehicles searched to completion
    pub vehicles_processed: u64,

    /// Searches that produced a match
    pub matches: u64,

    /// Searches with no match (including timeouts)
    pub no_match: u64,

    /// Matches acknowledged by the destination
    pub published: u64,

    /// Matches whose publish failed or timed out
    pub publish_failures: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Per-search metrics aggregator
    pub search_metrics: SearchMetricsAggregator,
}

impl PipelineStats {
    /// Fold one worker's counters into the run totals
    pub fn merge(&mut self, other: &PipelineStats) {
        self.vehicles_processed += other.vehicles_processed;
        self.matches += other.matches;
        self.no_match += other.no_match;
        self.published += other.published;
        self.publish_failures += other.publish_failures;
        self.search_metrics.merge(&other.search_metrics);
    }

    /// Vehicles left in the queue when the run stopped early
    pub fn unprocessed(&self) -> u64 {
        (self.vehicles_total as u64).saturating_sub(self.vehicles_processed)
    }

    /// Vehicles searched per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.vehicles_processed as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Pipeline Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Vehicles: {}/{}", self.vehicles_processed, self.vehicles_total);
        println!("   ├─ Throughput: {:.2} vehicles/s", self.throughput());
        println!("   ├─ Matches: {}", self.matches);
        println!("   ├─ No match: {}", self.no_match);
        println!("   ├─ Published: {}", self.published);
        println!("   └─ Publish failures: {}", self.publish_failures);

        let summary = self.search_metrics.summary();

        println!("\n📈 Search Metrics");
        println!("   ├─ Match rate: {:.2}%", summary.match_rate);
        println!("   ├─ Timed out: {}", summary.timed_out);
        println!("   └─ Latency (ms): {}", summary.latency_ms);

        if !summary.endpoint_failures.is_empty() {
            let mut failures: Vec<_> = summary.endpoint_failures.iter().collect();
            failures.sort();
            println!("\n⚠️  Endpoint Failures");
            for (endpoint, count) in failures {
                println!("   ├─ {}: {}", endpoint, count);
            }
        }

        if self.unprocessed() > 0 {
            println!("\n⏹  Stopped early, {} vehicles not searched", self.unprocessed());
        }

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_worker_stats() {
        let mut total = PipelineStats {
            vehicles_total: 5,
            ..Default::default()
        };
        let worker = PipelineStats {
            vehicles_processed: 2,
            matches: 1,
            no_match: 1,
            published: 1,
            ..Default::default()
        };

        total.merge(&worker);
        total.merge(&worker);

        assert_eq!(total.vehicles_processed, 4);
        assert_eq!(total.published, 2);
        assert_eq!(total.unprocessed(), 1);
    }
}
