//! Metrics aggregation for simulation runs.
//!
//! The aggregator keeps running admission counters and cumulative
//! revenue/cost, and appends a [`Snapshot`] of the derived metrics at a
//! configurable cadence (every N simulated ticks or every N processed
//! events). The snapshot series, ordered by time, is the artifact external
//! analysis consumes.

use crate::substrate::ResourceLedger;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to write results: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize results: {0}")]
    Json(#[from] serde_json::Error),
}

/// Snapshot cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportInterval {
    /// Snapshot whenever at least this many simulated ticks have elapsed
    /// since the previous snapshot.
    Time(u64),
    /// Snapshot after every N processed events.
    Events(u64),
}

/// One point of the running-metrics series.
///
/// `revenue` and `cost` are cumulative-so-far; downstream readers divide by
/// `time` for long-term averages (the text export keeps that convention).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub time: u64,
    pub acceptance_ratio: f64,
    pub revenue: f64,
    pub cost: f64,
    pub revenue_cost_ratio: f64,
    pub node_utilization: f64,
    pub link_utilization: f64,
}

/// Final results of one simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub strategy: String,
    /// Simulated time at which the last event was processed.
    pub duration: u64,
    pub total_requests: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub acceptance_ratio: f64,
    pub revenue: f64,
    pub cost: f64,
    pub revenue_cost_ratio: f64,
    pub node_utilization: f64,
    pub link_utilization: f64,
    pub events_processed: u64,
    pub snapshots: Vec<Snapshot>,
}

/// Accumulates admission outcomes and emits periodic snapshots.
#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    interval: ReportInterval,
    accepted: u64,
    rejected: u64,
    revenue: f64,
    cost: f64,
    snapshots: Vec<Snapshot>,
    last_snapshot_time: u64,
    events_since_snapshot: u64,
}

impl MetricsAggregator {
    pub fn new(interval: ReportInterval) -> Self {
        Self {
            interval,
            accepted: 0,
            rejected: 0,
            revenue: 0.0,
            cost: 0.0,
            snapshots: Vec::new(),
            last_snapshot_time: 0,
            events_since_snapshot: 0,
        }
    }

    /// Record an admission outcome.
    pub fn record_admission(&mut self, accepted: bool, revenue: f64, cost: f64) {
        if accepted {
            self.accepted += 1;
            self.revenue += revenue;
            self.cost += cost;
        } else {
            self.rejected += 1;
        }
    }

    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Accepted over all decided requests; zero before any decision.
    pub fn acceptance_ratio(&self) -> f64 {
        let total = self.accepted + self.rejected;
        if total == 0 {
            return 0.0;
        }
        self.accepted as f64 / total as f64
    }

    /// Cumulative revenue divided by elapsed time; zero at time zero.
    pub fn avg_revenue_per_time(&self, now: u64) -> f64 {
        if now == 0 {
            return 0.0;
        }
        self.revenue / now as f64
    }

    /// Cumulative cost divided by elapsed time; zero at time zero.
    pub fn avg_cost_per_time(&self, now: u64) -> f64 {
        if now == 0 {
            return 0.0;
        }
        self.cost / now as f64
    }

    fn revenue_cost_ratio(&self) -> f64 {
        if self.cost == 0.0 {
            return 0.0;
        }
        self.revenue / self.cost
    }

    /// Called by the engine after each processed event; appends a snapshot
    /// when the configured cadence is due.
    pub fn after_event(&mut self, now: u64, ledger: &ResourceLedger) {
        self.events_since_snapshot += 1;
        let due = match self.interval {
            ReportInterval::Time(dt) => now >= self.last_snapshot_time + dt,
            ReportInterval::Events(n) => self.events_since_snapshot >= n,
        };
        if due {
            self.take_snapshot(now, ledger);
        }
    }

    /// Append a snapshot at `now` unconditionally.
    pub fn take_snapshot(&mut self, now: u64, ledger: &ResourceLedger) {
        let (node_utilization, link_utilization) = ledger.utilization();
        self.snapshots.push(Snapshot {
            time: now,
            acceptance_ratio: self.acceptance_ratio(),
            revenue: self.revenue,
            cost: self.cost,
            revenue_cost_ratio: self.revenue_cost_ratio(),
            node_utilization,
            link_utilization,
        });
        self.last_snapshot_time = now;
        self.events_since_snapshot = 0;
    }

    /// The snapshot series so far, ordered by time.
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Close out the run: take a final snapshot and build the summary.
    pub fn finalize(
        mut self,
        strategy: &str,
        duration: u64,
        events_processed: u64,
        ledger: &ResourceLedger,
    ) -> RunSummary {
        self.take_snapshot(duration, ledger);
        let (node_utilization, link_utilization) = ledger.utilization();
        RunSummary {
            strategy: strategy.to_string(),
            duration,
            total_requests: self.accepted + self.rejected,
            accepted: self.accepted,
            rejected: self.rejected,
            acceptance_ratio: self.acceptance_ratio(),
            revenue: self.revenue,
            cost: self.cost,
            revenue_cost_ratio: self.revenue_cost_ratio(),
            node_utilization,
            link_utilization,
            events_processed,
            snapshots: self.snapshots,
        }
    }
}

/// Write the snapshot series as whitespace-aligned text, one line per
/// snapshot: `time acceptance revenue cost rc_ratio node_util link_util`.
/// Revenue and cost are cumulative; readers divide by the time column.
pub fn write_snapshots(snapshots: &[Snapshot], path: &Path) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    for s in snapshots {
        writeln!(
            writer,
            "{:<10}\t{:<20}\t{:<20}\t{:<20}\t{:<20}\t{:<20}\t{:<20}",
            s.time,
            s.acceptance_ratio,
            s.revenue,
            s.cost,
            s.revenue_cost_ratio,
            s.node_utilization,
            s.link_utilization,
        )?;
    }
    Ok(())
}

/// Write the full run summary as pretty JSON.
pub fn write_summary_json(summary: &RunSummary, path: &Path) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Format a run summary as a pretty-printed table string.
pub fn format_table(summary: &RunSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "\n{:=<66}\n",
        format!("  {} Results  ", summary.strategy)
    ));
    out.push_str(&format!(
        "  Duration: {} ticks | Requests: {} ({} accepted, {} rejected)\n",
        summary.duration, summary.total_requests, summary.accepted, summary.rejected,
    ));
    out.push_str(&format!(
        "  Acceptance ratio:   {:.4}\n",
        summary.acceptance_ratio
    ));
    out.push_str(&format!(
        "  Revenue (cum):      {:.1}   ({:.4}/tick)\n",
        summary.revenue,
        if summary.duration > 0 {
            summary.revenue / summary.duration as f64
        } else {
            0.0
        },
    ));
    out.push_str(&format!(
        "  Cost (cum):         {:.1}   ({:.4}/tick)\n",
        summary.cost,
        if summary.duration > 0 {
            summary.cost / summary.duration as f64
        } else {
            0.0
        },
    ));
    out.push_str(&format!(
        "  Revenue/cost:       {:.4}\n",
        summary.revenue_cost_ratio
    ));
    out.push_str(&format!(
        "  Utilization:        node {:.4} | link {:.4}\n",
        summary.node_utilization, summary.link_utilization,
    ));
    out.push_str(&format!("{:=<66}\n", ""));
    out
}

/// Format a comparison table of multiple strategy results.
pub fn format_comparison_table(results: &[RunSummary]) -> String {
    if results.is_empty() {
        return String::from("No results to compare.\n");
    }

    let mut out = String::new();
    out.push_str(&format!("\n{:=<78}\n", "  Strategy Comparison  "));
    out.push_str(&format!(
        "{:<14} {:>10} {:>12} {:>12} {:>8} {:>8} {:>8}\n",
        "Strategy", "Accept", "Revenue", "Cost", "R/C", "NodeU", "LinkU"
    ));
    out.push_str(&format!("{:-<78}\n", ""));
    for r in results {
        out.push_str(&format!(
            "{:<14} {:>10.4} {:>12.1} {:>12.1} {:>8.4} {:>8.4} {:>8.4}\n",
            r.strategy,
            r.acceptance_ratio,
            r.revenue,
            r.cost,
            r.revenue_cost_ratio,
            r.node_utilization,
            r.link_utilization,
        ));
    }
    out.push_str(&format!("{:=<78}\n", ""));
    out
}
