//! Time-ordered event queue for the simulation.
//!
//! The scheduler is pre-seeded at construction with one arrival and one
//! departure event per request; the core never generates events mid-run.
//! Events are totally ordered by `(time, kind, request id)` where a
//! departure at time t sorts before an arrival at the same t — a request
//! that leaves exactly when another arrives must free its resources first,
//! or the arrival could be rejected spuriously.

use crate::request::VirtualRequest;
use serde::{Deserialize, Serialize};
use std::collections::BinaryHeap;

/// What happens to a request at an event's timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Arrival,
    Departure,
}

impl EventKind {
    /// Sort rank at equal timestamps: departures first.
    fn rank(self) -> u8 {
        match self {
            EventKind::Departure => 0,
            EventKind::Arrival => 1,
        }
    }
}

/// A timestamped arrival or departure of a virtual network request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub time: u64,
    pub kind: EventKind,
    pub request_id: u64,
}

/// Heap entry with the ordering reversed so the max-heap pops the minimum
/// `(time, kind-rank, request id)` triple first.
#[derive(Debug, Clone, PartialEq, Eq)]
struct OrderedEvent(Event);

impl PartialOrd for OrderedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .0
            .time
            .cmp(&self.0.time)
            .then(other.0.kind.rank().cmp(&self.0.kind.rank()))
            .then(other.0.request_id.cmp(&self.0.request_id))
    }
}

/// Priority queue over simulation events.
#[derive(Debug, Default)]
pub struct EventScheduler {
    heap: BinaryHeap<OrderedEvent>,
}

impl EventScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the queue with the arrival and departure of every request.
    pub fn with_requests(requests: &[VirtualRequest]) -> Self {
        let mut scheduler = Self::new();
        for request in requests {
            scheduler.push(Event {
                time: request.arrival,
                kind: EventKind::Arrival,
                request_id: request.id,
            });
            scheduler.push(Event {
                time: request.departure(),
                kind: EventKind::Departure,
                request_id: request.id,
            });
        }
        scheduler
    }

    pub fn push(&mut self, event: Event) {
        self.heap.push(OrderedEvent(event));
    }

    /// Pop the next event in the total order, if any remain.
    pub fn pop_next(&mut self) -> Option<Event> {
        self.heap.pop().map(|e| e.0)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}
