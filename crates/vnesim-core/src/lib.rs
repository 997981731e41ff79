//! vnesim — Discrete-event simulator for virtual network embedding.
//!
//! This crate provides the core simulation engine that models a substrate
//! network with finite node compute and link bandwidth, a stream of virtual
//! network requests with lifetimes, and the admission bookkeeping between
//! them. Embedding strategies from `vnesim-strategies` are plugged in to
//! decide where each request's nodes and links land.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐     ┌───────────┐     ┌──────────────┐
//! │ Network  │────▶│  Engine   │────▶│   Metrics    │
//! │  Files   │     │ (Events)  │     │  Snapshots   │
//! └──────────┘     └─────┬─────┘     └──────────────┘
//!                        │
//!                ┌───────┴───────┐
//!                │   Strategy    │
//!                │  (Embedding)  │
//!                └───────┬───────┘
//!                        │
//!                ┌───────┴───────┐
//!                │ ResourceLedger│
//!                │  cpu  /  bw   │
//!                └───────────────┘
//! ```

pub mod clock;
pub mod config;
pub mod engine;
pub mod lifecycle;
pub mod metrics;
pub mod netfile;
pub mod request;
pub mod scheduler;
pub mod substrate;

// Re-export key types for convenience.
pub use clock::SimClock;
pub use config::SimConfig;
pub use engine::SimulationEngine;
pub use lifecycle::{AdmissionResult, RequestState, RequestTable, SimError};
pub use metrics::{MetricsAggregator, ReportInterval, RunSummary, Snapshot};
pub use netfile::{load_requests, load_substrate};
pub use request::{Embedding, VirtualLink, VirtualNode, VirtualRequest};
pub use scheduler::{Event, EventKind, EventScheduler};
pub use substrate::{ResourceLedger, SubstrateGraph, SubstrateLink, SubstrateNode};

/// Run a complete simulation with the given substrate, requests, and
/// strategy.
pub fn run_simulation(
    substrate: SubstrateGraph,
    requests: Vec<VirtualRequest>,
    strategy: Box<dyn vnesim_strategies::EmbeddingStrategy>,
    report_interval: ReportInterval,
) -> Result<RunSummary, SimError> {
    SimulationEngine::new(substrate, requests, strategy, report_interval).run()
}

/// Run the same substrate and request stream under several strategies.
pub fn compare_strategies(
    substrate: &SubstrateGraph,
    requests: &[VirtualRequest],
    strategy_names: &[&str],
    seed: u64,
    report_interval: ReportInterval,
) -> Result<Vec<RunSummary>, SimError> {
    let mut results = Vec::new();
    for name in strategy_names {
        let Some(strategy) = vnesim_strategies::strategy_by_name(name, seed) else {
            continue;
        };
        results.push(run_simulation(
            substrate.clone(),
            requests.to_vec(),
            strategy,
            report_interval,
        )?);
    }
    Ok(results)
}
