//! Discrete-event simulation engine.
//!
//! The engine pops events from the [`EventScheduler`] in total order,
//! advances the virtual clock, and dispatches each event: arrivals run the
//! embedding strategy and commit or reject against the ledger, departures
//! release whatever the request held. The loop is single-threaded and the
//! strategy call is synchronous, so for a fixed input and a deterministic
//! strategy the run is bit-identical every time.

use crate::clock::SimClock;
use crate::lifecycle::{RequestTable, SimError};
use crate::metrics::{MetricsAggregator, ReportInterval, RunSummary};
use crate::request::VirtualRequest;
use crate::scheduler::{Event, EventKind, EventScheduler};
use crate::substrate::{ResourceLedger, SubstrateGraph};
use std::collections::HashMap;
use tracing::{debug, error};
use vnesim_strategies::EmbeddingStrategy;

/// The main simulation engine.
pub struct SimulationEngine {
    /// Virtual clock.
    pub clock: SimClock,
    /// Pre-seeded event queue.
    scheduler: EventScheduler,
    /// Owner of all substrate capacity state.
    ledger: ResourceLedger,
    /// Requests by id, for arrival lookups.
    requests: HashMap<u64, VirtualRequest>,
    /// Per-request admission records.
    records: RequestTable,
    /// Metrics accumulator.
    metrics: MetricsAggregator,
    /// Embedding strategy.
    strategy: Box<dyn EmbeddingStrategy>,
    /// Total events processed.
    pub events_processed: u64,
}

impl SimulationEngine {
    /// Create an engine over a substrate and a fixed set of requests.
    ///
    /// The scheduler is seeded with the arrival and departure of every
    /// request up front; nothing generates events mid-run.
    pub fn new(
        substrate: SubstrateGraph,
        requests: Vec<VirtualRequest>,
        strategy: Box<dyn EmbeddingStrategy>,
        report_interval: ReportInterval,
    ) -> Self {
        let scheduler = EventScheduler::with_requests(&requests);
        let requests = requests.into_iter().map(|r| (r.id, r)).collect();
        Self {
            clock: SimClock::new(),
            scheduler,
            ledger: ResourceLedger::new(substrate),
            requests,
            records: RequestTable::new(),
            metrics: MetricsAggregator::new(report_interval),
            strategy,
            events_processed: 0,
        }
    }

    /// The ledger (read only).
    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    /// Per-request records (read only).
    pub fn records(&self) -> &RequestTable {
        &self.records
    }

    /// Number of pending events.
    pub fn pending_events(&self) -> usize {
        self.scheduler.len()
    }

    /// Run the simulation until the event queue is drained.
    ///
    /// Resource exhaustion is ordinary data (rejections); any `Err` is a
    /// broken invariant and the run stops with the failing event's context.
    pub fn run(mut self) -> Result<RunSummary, SimError> {
        while let Some(event) = self.scheduler.pop_next() {
            self.clock.advance_to(event.time);
            if let Err(err) = self.process_event(&event) {
                let (node_util, link_util) = self.ledger.utilization();
                error!(
                    request_id = event.request_id,
                    time = event.time,
                    kind = ?event.kind,
                    node_util,
                    link_util,
                    %err,
                    "aborting: simulation invariant violated"
                );
                return Err(err);
            }
            self.events_processed += 1;
            self.metrics.after_event(self.clock.now(), &self.ledger);
        }

        let duration = self.clock.now();
        debug!(
            events = self.events_processed,
            duration, "event queue drained"
        );
        Ok(self.metrics.finalize(
            self.strategy.name(),
            duration,
            self.events_processed,
            &self.ledger,
        ))
    }

    /// Process a single event.
    fn process_event(&mut self, event: &Event) -> Result<(), SimError> {
        match event.kind {
            EventKind::Arrival => {
                let request = self
                    .requests
                    .get(&event.request_id)
                    .ok_or(SimError::UnknownRequest(event.request_id))?
                    .clone();
                let result =
                    self.records
                        .on_arrival(&request, self.strategy.as_mut(), &mut self.ledger)?;
                self.metrics
                    .record_admission(result.accepted, result.revenue, result.cost);
            }
            EventKind::Departure => {
                self.records.on_departure(event.request_id, &mut self.ledger)?;
            }
        }
        Ok(())
    }
}
