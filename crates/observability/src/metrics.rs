//! 搜索与发布指标收集模块
//!
//! 每次搜索、每个 endpoint 结果、每次发布各记录一次。

use std::collections::HashMap;

use contracts::{EndpointOutcome, EndpointResult};
use metrics::{counter, gauge, histogram};

/// 记录一次搜索
///
/// outcome 标签: `matched` / `timeout` / `no_match`
pub fn record_search(matched: bool, timed_out: bool, latency_ms: f64) {
    counter!("hirer_lookup_searches_total", "outcome" => search_label(matched, timed_out))
        .increment(1);
    histogram!("hirer_lookup_search_latency_ms").record(latency_ms);
}

/// 记录单个 endpoint 的结果
pub fn record_endpoint_result(result: &EndpointResult) {
    counter!(
        "hirer_lookup_endpoint_results_total",
        "endpoint" => result.endpoint.clone(),
        "outcome" => result.outcome.label()
    )
    .increment(1);
}

/// 记录一次发布
pub fn record_publish(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("hirer_lookup_publish_total", "status" => status).increment(1);
}

/// 记录 topic 就绪所用的轮询次数
pub fn record_topic_ready_attempts(attempts: u32) {
    gauge!("hirer_lookup_topic_ready_attempts").set(attempts as f64);
}

fn search_label(matched: bool, timed_out: bool) -> &'static str {
    match (matched, timed_out) {
        (true, _) => "matched",
        (false, true) => "timeout",
        (false, false) => "no_match",
    }
}

/// 搜索指标聚合器
///
/// 在内存中聚合指标，便于运行结束时输出摘要。
#[derive(Debug, Clone, Default)]
pub struct SearchMetricsAggregator {
    /// 总搜索次数
    pub total_searches: u64,

    /// 命中次数
    pub matched: u64,

    /// 超时次数
    pub timed_out: u64,

    /// 搜索耗时统计 (毫秒)
    pub latency_stats: RunningStats,

    /// 各 endpoint 失败次数
    pub endpoint_failures: HashMap<String, u64>,
}

impl SearchMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, matched: bool, timed_out: bool, latency_ms: f64, results: &[EndpointResult]) {
        self.total_searches += 1;
        if matched {
            self.matched += 1;
        } else if timed_out {
            self.timed_out += 1;
        }
        self.latency_stats.push(latency_ms);

        for result in results {
            if let EndpointOutcome::Failed(e) = &result.outcome {
                if e.kind() != "cancelled" {
                    *self.endpoint_failures.entry(result.endpoint.clone()).or_insert(0) += 1;
                }
            }
        }
    }

    /// 合并另一个聚合器 (每个 worker 各持有一个)
    pub fn merge(&mut self, other: &SearchMetricsAggregator) {
        self.total_searches += other.total_searches;
        self.matched += other.matched;
        self.timed_out += other.timed_out;
        self.latency_stats.merge(&other.latency_stats);
        for (endpoint, count) in &other.endpoint_failures {
            *self.endpoint_failures.entry(endpoint.clone()).or_insert(0) += count;
        }
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_searches: self.total_searches,
            matched: self.matched,
            timed_out: self.timed_out,
            match_rate: if self.total_searches > 0 {
                self.matched as f64 / self.total_searches as f64 * 100.0
            } else {
                0.0
            },
            latency_ms: StatsSummary::from(&self.latency_stats),
            endpoint_failures: self.endpoint_failures.clone(),
        }
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_searches: u64,
    pub matched: u64,
    pub timed_out: u64,
    pub match_rate: f64,
    pub latency_ms: StatsSummary,
    pub endpoint_failures: HashMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Search Metrics Summary ===")?;
        writeln!(f, "Total searches: {}", self.total_searches)?;
        writeln!(f, "Matched: {} ({:.2}%)", self.matched, self.match_rate)?;
        writeln!(f, "Timed out: {}", self.timed_out)?;
        writeln!(f, "Search latency (ms): {}", self.latency_ms)?;

        if !self.endpoint_failures.is_empty() {
            let mut failures: Vec<_> = self.endpoint_failures.iter().collect();
            failures.sort();
            writeln!(f, "Endpoint failures:")?;
            for (endpoint, count) in failures {
                writeln!(f, "  {}: {}", endpoint, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.1}, std={:.1} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 合并 (Chan 并行算法)
    pub fn merge(&mut self, other: &RunningStats) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }

        let count = self.count + other.count;
        let delta = other.mean - self.mean;
        self.m2 += other.m2 + delta * delta * (self.count * other.count) as f64 / count as f64;
        self.mean += delta * other.count as f64 / count as f64;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.count = count;
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}
