//! Statistics collection and reporting for simulation runs.
//!
//! The [`StatsCollector`] keeps two sets of running [`Counters`]: a window
//! that is zeroed once at the warm-up reset, and lifetime totals that are
//! never reset. Snapshots of the window are emitted on a progress cadence
//! and at termination.

use crate::request::Request;
use crate::server::ServerSummary;
use serde::{Deserialize, Serialize};

/// Running totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    /// Requests generated (and offered to a server).
    pub generated: u64,
    /// Requests that completed service.
    pub accepted: u64,
    /// Requests dropped at a full queue.
    pub dropped: u64,
    /// Completed requests that were cache hits.
    pub cache_hits: u64,
    /// Sum of `accepted - sent` over completed requests.
    pub total_queue_delay: u64,
    /// Sum of `completed - sent` over completed requests.
    pub total_latency: u64,
}

impl Counters {
    fn record(&mut self, request: &Request) {
        self.accepted += 1;
        self.total_queue_delay += request.queue_delay();
        self.total_latency += request.latency();
        if request.cached {
            self.cache_hits += 1;
        }
    }
}

/// Derived view of the window counters at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub tick: u64,
    pub generated: u64,
    pub accepted: u64,
    pub dropped: u64,
    /// `accepted / generated`.
    pub accept_rate: f64,
    /// `cache_hits / accepted`.
    pub hit_rate: f64,
    /// Mean queueing delay in ticks.
    pub avg_queue_delay: f64,
    /// Mean generation-to-completion latency in ticks.
    pub avg_latency: f64,
    /// Completed requests per tick since the last reset.
    pub throughput: f64,
}

/// Collector that accumulates counters during a run.
#[derive(Debug, Clone, Default)]
pub struct StatsCollector {
    window: Counters,
    lifetime: Counters,
    /// Ticks since start or since the last reset.
    elapsed_ticks: u64,
    resets: u32,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a generated request.
    pub fn record_generated(&mut self) {
        self.window.generated += 1;
        self.lifetime.generated += 1;
    }

    /// Count a request dropped at a full queue.
    pub fn record_dropped(&mut self) {
        self.window.dropped += 1;
        self.lifetime.dropped += 1;
    }

    /// Record a completed request.
    pub fn record(&mut self, request: &Request) {
        self.window.record(request);
        self.lifetime.record(request);
    }

    /// Count one elapsed tick.
    pub fn tick(&mut self) {
        self.elapsed_ticks += 1;
    }

    /// Zero the window counters and the elapsed-tick base.
    pub fn reset(&mut self) {
        self.window = Counters::default();
        self.elapsed_ticks = 0;
        self.resets += 1;
    }

    pub fn window(&self) -> &Counters {
        &self.window
    }

    pub fn lifetime(&self) -> &Counters {
        &self.lifetime
    }

    pub fn elapsed_ticks(&self) -> u64 {
        self.elapsed_ticks
    }

    pub fn resets(&self) -> u32 {
        self.resets
    }

    /// Derived read of the window counters. Ratios over zero are zero.
    pub fn snapshot(&self, tick: u64) -> StatsSnapshot {
        let w = &self.window;
        StatsSnapshot {
            tick,
            generated: w.generated,
            accepted: w.accepted,
            dropped: w.dropped,
            accept_rate: ratio(w.accepted, w.generated),
            hit_rate: ratio(w.cache_hits, w.accepted),
            avg_queue_delay: ratio(w.total_queue_delay, w.accepted),
            avg_latency: ratio(w.total_latency, w.accepted),
            throughput: ratio(w.accepted, self.elapsed_ticks),
        }
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}

/// Decides when a progress snapshot is due.
///
/// A snapshot is due once at least `threshold` requests completed in the
/// current window and the run has entered a new tenth of the horizon, and
/// always at termination.
#[derive(Debug, Clone)]
pub struct ReportCadence {
    threshold: u64,
    last_decile: Option<u64>,
}

impl ReportCadence {
    pub fn new(threshold: u64) -> Self {
        Self {
            threshold,
            last_decile: None,
        }
    }

    pub fn should_report(&mut self, accepted: u64, decile: u64, finished: bool) -> bool {
        let due = finished || (accepted >= self.threshold && self.last_decile != Some(decile));
        if due {
            self.last_decile = Some(decile);
        }
        due
    }
}

/// Aggregated result of an entire run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Label of the run.
    pub name: String,
    /// Dispatch policy name.
    pub policy: String,
    /// Seed of the random stream, for replaying the run.
    pub seed: u64,
    /// Mean arrivals per tick.
    pub arrival_rate: f64,
    /// Ticks simulated until termination.
    pub ticks: u64,
    /// Progress snapshots in emission order; the last one is the final one.
    pub reports: Vec<StatsSnapshot>,
    /// Window statistics at termination.
    pub final_stats: StatsSnapshot,
    /// Totals over the whole run, warm-up included.
    pub lifetime: Counters,
    /// Coefficient of variation of requests served per server.
    pub load_cv: f64,
    /// Jain's fairness index of requests served per server.
    pub jains_fairness_index: f64,
    pub per_server: Vec<ServerSummary>,
}

/// Coefficient of variation (std / mean).
pub fn coefficient_of_variation(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<u64>() as f64 / n;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = values
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    variance.sqrt() / mean
}

/// Jain's fairness index: (sum(x_i))^2 / (n * sum(x_i^2)).
pub fn jains_fairness_index(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 1.0;
    }
    let n = values.len() as f64;
    let sum: f64 = values.iter().map(|&v| v as f64).sum();
    let sum_sq: f64 = values.iter().map(|&v| (v as f64).powi(2)).sum();
    if sum_sq == 0.0 {
        return 1.0;
    }
    (sum * sum) / (n * sum_sq)
}

/// One progress line, as printed while a run is going.
pub fn format_progress_line(s: &StatsSnapshot) -> String {
    format!(
        "tm={} Requests: {}, Accepted {} ({:.2}%), Throughput {:.6}, Cache Hit {:.2}%, Avg Q: {:.2}, Avg Tm: {:.2}",
        s.tick,
        s.generated,
        s.accepted,
        s.accept_rate * 100.0,
        s.throughput,
        s.hit_rate * 100.0,
        s.avg_queue_delay,
        s.avg_latency,
    )
}

/// Format a run summary as a pretty-printed table string.
pub fn format_table(summary: &RunSummary) -> String {
    let s = &summary.final_stats;
    let mut out = String::new();
    out.push_str(&format!(
        "\n{:=<70}\n",
        format!("  {} / {} Results  ", summary.name, summary.policy)
    ));
    out.push_str(&format!(
        "  Ticks: {} | Rate: {:.2}/tick | Seed: {}\n",
        summary.ticks, summary.arrival_rate, summary.seed
    ));
    out.push_str(&format!("{:-<70}\n", "  Steady state  "));
    out.push_str(&format!(
        "  Requests: {}  Accepted: {} ({:.2}%)  Dropped: {}\n",
        s.generated,
        s.accepted,
        s.accept_rate * 100.0,
        s.dropped
    ));
    out.push_str(&format!(
        "  Throughput: {:.4}/tick  Cache hit: {:.2}%\n",
        s.throughput,
        s.hit_rate * 100.0
    ));
    out.push_str(&format!(
        "  Avg queue delay: {:.2}  Avg latency: {:.2}\n",
        s.avg_queue_delay, s.avg_latency
    ));
    out.push_str(&format!("{:-<70}\n", "  Fairness  "));
    out.push_str(&format!(
        "  Load CV: {:.3}  Jain's index: {:.4}\n",
        summary.load_cv, summary.jains_fairness_index
    ));
    out.push_str(&format!("{:=<70}\n", ""));
    out
}

/// Format the per-server breakdown of a run, busiest servers first.
pub fn format_server_table(servers: &[ServerSummary], limit: usize) -> String {
    let mut sorted: Vec<&ServerSummary> = servers.iter().collect();
    sorted.sort_by(|a, b| b.served.cmp(&a.served).then(a.id.cmp(&b.id)));

    let mut out = String::new();
    out.push_str(&format!(
        "{:>6} {:>10} {:>10} {:>12} {:>8} {:>10}\n",
        "Server", "Served", "Dropped", "Busy ticks", "Hit%", "Evictions"
    ));
    out.push_str(&format!("{:-<61}\n", ""));
    for s in sorted.into_iter().take(limit) {
        out.push_str(&format!(
            "{:>6} {:>10} {:>10} {:>12} {:>7.1}% {:>10}\n",
            s.id,
            s.served,
            s.dropped,
            s.busy_ticks,
            s.cache.hit_rate * 100.0,
            s.cache.evictions,
        ));
    }
    out
}

/// Format a comparison table of several runs.
pub fn format_comparison_table(results: &[RunSummary]) -> String {
    if results.is_empty() {
        return String::from("No results to compare.\n");
    }

    let mut out = String::new();
    out.push_str(&format!("\n{:=<92}\n", "  Policy Comparison  "));
    out.push_str(&format!(
        "{:<18} {:>8} {:>9} {:>10} {:>8} {:>9} {:>9} {:>8} {:>8}\n",
        "Policy", "Rate", "Accept%", "Tput/tick", "Cache%", "Avg Q", "Avg Tm", "Load CV", "Jain's"
    ));
    out.push_str(&format!("{:-<92}\n", ""));

    for r in results {
        let s = &r.final_stats;
        out.push_str(&format!(
            "{:<18} {:>8.2} {:>8.2}% {:>10.4} {:>7.2}% {:>9.2} {:>9.2} {:>8.3} {:>8.4}\n",
            r.policy,
            r.arrival_rate,
            s.accept_rate * 100.0,
            s.throughput,
            s.hit_rate * 100.0,
            s.avg_queue_delay,
            s.avg_latency,
            r.load_cv,
            r.jains_fairness_index,
        ));
    }
    out.push_str(&format!("{:=<92}\n", ""));
    out
}
