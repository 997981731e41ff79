//! Per-request admission state machine.
//!
//! Every request moves `Pending -> Embedded -> Released` or
//! `Pending -> Rejected`, transitioning at most once into and out of
//! `Embedded`. The table keeps a record for every request seen, for the
//! whole run, so departures can be matched against admissions and a
//! rejected request's departure is a clean no-op.

use crate::request::{Embedding, VirtualRequest};
use crate::substrate::{LedgerError, ResourceLedger};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};
use vnesim_strategies::{
    link_key, EmbedDecision, EmbeddingPlan, EmbeddingStrategy, RequestInfo, VirtualLinkInfo,
    VirtualNodeInfo,
};

#[derive(Error, Debug)]
pub enum SimError {
    /// A departure referenced an id never seen as an arrival. The queue's
    /// pairing invariant is broken; the run cannot continue.
    #[error("departure for unknown request {0}")]
    UnknownRequest(u64),
    /// An arrival was processed twice for the same id.
    #[error("duplicate arrival for request {0}")]
    DuplicateArrival(u64),
    /// The strategy produced an unusable plan (missing nodes or paths).
    /// Treated as fatal: ledger consistency cannot be assumed after a
    /// half-evaluated decision.
    #[error("strategy '{strategy}' returned a broken plan for request {request_id}: {detail}")]
    Strategy {
        strategy: String,
        request_id: u64,
        detail: String,
    },
    /// The ledger detected a broken invariant (unknown embedding on
    /// release, unknown substrate element on allocate).
    #[error("ledger invariant violation: {0}")]
    Ledger(#[from] LedgerError),
}

/// Admission state of a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestState {
    Pending,
    Embedded,
    Rejected,
    Released,
}

/// What the table knows about one request.
#[derive(Debug)]
pub struct RequestRecord {
    pub state: RequestState,
    pub embedding: Option<Embedding>,
}

/// Outcome of processing an arrival.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionResult {
    pub accepted: bool,
    /// Revenue earned by admitting the request; zero when rejected.
    pub revenue: f64,
    /// Substrate cost of the committed embedding; zero when rejected.
    pub cost: f64,
}

/// All request records for the run, keyed by request id.
#[derive(Debug, Default)]
pub struct RequestTable {
    records: HashMap<u64, RequestRecord>,
}

impl RequestTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, request_id: u64) -> Option<&RequestRecord> {
        self.records.get(&request_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Process an arrival: ask the strategy for a plan, then commit it
    /// against the ledger. Strategy declines and ledger resource shortfalls
    /// both end in `Rejected`; a rejected request is never revisited.
    pub fn on_arrival(
        &mut self,
        request: &VirtualRequest,
        strategy: &mut dyn EmbeddingStrategy,
        ledger: &mut ResourceLedger,
    ) -> Result<AdmissionResult, SimError> {
        if self.records.contains_key(&request.id) {
            return Err(SimError::DuplicateArrival(request.id));
        }
        self.records.insert(
            request.id,
            RequestRecord {
                state: RequestState::Pending,
                embedding: None,
            },
        );

        let view = ledger.snapshot();
        let info = strategy_request(request);
        let plan = match strategy.embed(&info, &view) {
            EmbedDecision::Embed(plan) => plan,
            EmbedDecision::Decline => {
                debug!(request_id = request.id, "strategy declined");
                return Ok(self.reject(request.id));
            }
        };
        let embedding = build_embedding(request, plan, strategy.name())?;

        match ledger.allocate(request, &embedding) {
            Ok(()) => {
                let revenue = request.revenue();
                let cost = embedding.cost(request);
                let record = self.records.get_mut(&request.id).unwrap();
                record.state = RequestState::Embedded;
                record.embedding = Some(embedding);
                debug!(request_id = request.id, revenue, cost, "request embedded");
                Ok(AdmissionResult {
                    accepted: true,
                    revenue,
                    cost,
                })
            }
            Err(err @ LedgerError::InsufficientResource { .. }) => {
                debug!(request_id = request.id, %err, "allocation rejected");
                Ok(self.reject(request.id))
            }
            Err(other) => Err(SimError::Ledger(other)),
        }
    }

    /// Process a departure: release an embedded request's resources, or
    /// no-op for a rejected one. Unknown ids break the arrival/departure
    /// pairing invariant and are fatal.
    pub fn on_departure(
        &mut self,
        request_id: u64,
        ledger: &mut ResourceLedger,
    ) -> Result<bool, SimError> {
        let record = self
            .records
            .get_mut(&request_id)
            .ok_or(SimError::UnknownRequest(request_id))?;
        match record.state {
            RequestState::Embedded => {
                ledger.release(request_id)?;
                record.state = RequestState::Released;
                debug!(request_id, "request departed");
                Ok(true)
            }
            RequestState::Rejected => Ok(false),
            RequestState::Released => {
                warn!(request_id, "departure for already-released request");
                Ok(false)
            }
            RequestState::Pending => {
                // Unreachable with a correctly seeded queue.
                warn!(request_id, "departure for request still pending");
                Ok(false)
            }
        }
    }

    fn reject(&mut self, request_id: u64) -> AdmissionResult {
        self.records.get_mut(&request_id).unwrap().state = RequestState::Rejected;
        AdmissionResult {
            accepted: false,
            revenue: 0.0,
            cost: 0.0,
        }
    }
}

/// Convert a core request to the strategies crate's request type.
fn strategy_request(request: &VirtualRequest) -> RequestInfo {
    RequestInfo {
        id: request.id,
        arrival: request.arrival,
        duration: request.duration,
        nodes: request
            .nodes
            .iter()
            .map(|n| VirtualNodeInfo {
                id: n.id,
                cpu: n.cpu,
            })
            .collect(),
        links: request
            .links
            .iter()
            .map(|l| VirtualLinkInfo {
                endpoints: l.endpoints,
                bw: l.bw,
            })
            .collect(),
    }
}

/// Validate a strategy's plan covers the whole request and turn it into an
/// embedding. Incomplete plans are the `StrategyError` class from the
/// simulator's point of view.
fn build_embedding(
    request: &VirtualRequest,
    plan: EmbeddingPlan,
    strategy: &str,
) -> Result<Embedding, SimError> {
    let broken = |detail: String| SimError::Strategy {
        strategy: strategy.to_string(),
        request_id: request.id,
        detail,
    };

    for vnode in &request.nodes {
        if !plan.node_map.contains_key(&vnode.id) {
            return Err(broken(format!("virtual node {} unmapped", vnode.id)));
        }
    }
    let mut seen = Vec::with_capacity(plan.node_map.len());
    for &snode in plan.node_map.values() {
        if seen.contains(&snode) {
            return Err(broken(format!("substrate node {} mapped twice", snode)));
        }
        seen.push(snode);
    }
    for vlink in &request.links {
        let (u, v) = vlink.endpoints;
        let path = plan
            .paths
            .get(&link_key(u, v))
            .ok_or_else(|| broken(format!("virtual link {}-{} unrouted", u, v)))?;
        if path.len() < 2 {
            return Err(broken(format!("virtual link {}-{} has an empty path", u, v)));
        }
        let src = *plan
            .node_map
            .get(&u)
            .ok_or_else(|| broken(format!("link endpoint {} is not a virtual node", u)))?;
        let dst = *plan
            .node_map
            .get(&v)
            .ok_or_else(|| broken(format!("link endpoint {} is not a virtual node", v)))?;
        let ends_match = (path[0] == src && path[path.len() - 1] == dst)
            || (path[0] == dst && path[path.len() - 1] == src);
        if !ends_match {
            return Err(broken(format!(
                "path for virtual link {}-{} does not connect its mapped endpoints",
                u, v
            )));
        }
    }

    Ok(Embedding {
        request_id: request.id,
        node_map: plan.node_map,
        paths: plan.paths,
    })
}
