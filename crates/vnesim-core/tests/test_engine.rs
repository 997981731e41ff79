/// Integration tests for the simulation engine and its components.
use vnesim_core::metrics::ReportInterval;
use vnesim_core::request::{VirtualLink, VirtualNode, VirtualRequest};
use vnesim_core::scheduler::{EventKind, EventScheduler};
use vnesim_core::substrate::{ResourceLedger, SubstrateGraph};
use vnesim_core::{RequestState, RequestTable, SimulationEngine};
use vnesim_strategies::Greedy;

fn node_request(id: u64, arrival: u64, duration: u64, cpu: f64) -> VirtualRequest {
    VirtualRequest {
        id,
        arrival,
        duration,
        nodes: vec![VirtualNode { id: 0, cpu }],
        links: vec![],
    }
}

fn link_request(id: u64, arrival: u64, duration: u64, cpu: f64, bw: f64) -> VirtualRequest {
    VirtualRequest {
        id,
        arrival,
        duration,
        nodes: vec![
            VirtualNode { id: 0, cpu },
            VirtualNode { id: 1, cpu },
        ],
        links: vec![VirtualLink {
            endpoints: (0, 1),
            bw,
        }],
    }
}

/// Drive the scheduler/lifecycle/ledger by hand so intermediate ledger
/// state can be asserted between events.
fn drive(
    substrate: SubstrateGraph,
    requests: Vec<VirtualRequest>,
    checkpoints: &mut dyn FnMut(u64, &EventKind, &ResourceLedger, &RequestTable),
) {
    let mut scheduler = EventScheduler::with_requests(&requests);
    let mut ledger = ResourceLedger::new(substrate);
    let mut table = RequestTable::new();
    let mut strategy = Greedy::new();

    while let Some(event) = scheduler.pop_next() {
        match event.kind {
            EventKind::Arrival => {
                let request = requests
                    .iter()
                    .find(|r| r.id == event.request_id)
                    .unwrap();
                table
                    .on_arrival(request, &mut strategy, &mut ledger)
                    .unwrap();
            }
            EventKind::Departure => {
                table.on_departure(event.request_id, &mut ledger).unwrap();
            }
        }
        checkpoints(event.time, &event.kind, &ledger, &table);
    }
}

#[test]
fn test_scenario_single_node_accept_reject_release() {
    // One substrate node of capacity 10, no links. A request demanding 6
    // (arrival 0, duration 5) is admitted; a second demanding 6 (arrival 1)
    // is rejected against the remaining 4; at time 5 the first departs and
    // the full capacity returns.
    let mut substrate = SubstrateGraph::new();
    substrate.add_node(0, 0.0, 0.0, 10.0);
    let requests = vec![node_request(1, 0, 5, 6.0), node_request(2, 1, 3, 6.0)];

    drive(substrate, requests, &mut |time, kind, ledger, table| {
        let remain = ledger.graph().nodes[&0].cpu_remain;
        match (time, kind) {
            (0, EventKind::Arrival) => {
                assert_eq!(table.record(1).unwrap().state, RequestState::Embedded);
                assert_eq!(remain, 4.0);
            }
            (1, EventKind::Arrival) => {
                assert_eq!(table.record(2).unwrap().state, RequestState::Rejected);
                assert_eq!(remain, 4.0);
            }
            (4, EventKind::Departure) => {
                // Rejected request's departure: no-op.
                assert_eq!(remain, 4.0);
            }
            (5, EventKind::Departure) => {
                assert_eq!(table.record(1).unwrap().state, RequestState::Released);
                assert_eq!(remain, 10.0);
            }
            other => panic!("unexpected event {:?}", other),
        }
    });
}

#[test]
fn test_scenario_simultaneous_arrivals_id_tiebreak() {
    // A single link of bandwidth 10; two requests with ids 1 and 2 arrive
    // at the same tick, each needing a 6-bandwidth path. Request 1 is
    // processed first by the id tie-break and admitted; request 2 sees
    // remaining 4 and is rejected.
    let mut substrate = SubstrateGraph::new();
    substrate.add_node(0, 0.0, 0.0, 100.0);
    substrate.add_node(1, 1.0, 0.0, 100.0);
    substrate.add_link(0, 1, 10.0, 1.0);
    let requests = vec![
        link_request(1, 0, 100, 1.0, 6.0),
        link_request(2, 0, 100, 1.0, 6.0),
    ];

    let mut decided = 0;
    drive(substrate, requests, &mut |_, kind, ledger, table| {
        if *kind == EventKind::Arrival {
            decided += 1;
            if decided == 1 {
                assert_eq!(table.record(1).unwrap().state, RequestState::Embedded);
                assert_eq!(ledger.graph().links[&(0, 1)].bw_remain, 4.0);
            } else {
                assert_eq!(table.record(2).unwrap().state, RequestState::Rejected);
                assert_eq!(ledger.graph().links[&(0, 1)].bw_remain, 4.0);
            }
        }
    });
    assert_eq!(decided, 2);
}

#[test]
fn test_scenario_acceptance_ratio_three_of_four() {
    // Three small requests fit; a fourth oversized one does not.
    let mut substrate = SubstrateGraph::new();
    substrate.add_node(0, 0.0, 0.0, 30.0);
    let requests = vec![
        node_request(0, 0, 1000, 10.0),
        node_request(1, 1, 1000, 10.0),
        node_request(2, 2, 1000, 10.0),
        node_request(3, 3, 1000, 10.0),
    ];
    let engine = SimulationEngine::new(
        substrate,
        requests,
        Box::new(Greedy::new()),
        ReportInterval::Time(10_000),
    );
    let summary = engine.run().unwrap();
    assert_eq!(summary.accepted, 3);
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.acceptance_ratio, 0.75);
}

#[test]
fn test_departure_ordered_before_arrival_at_same_tick() {
    // Capacity 10: request 0 holds 6 until t=50; request 1 arrives exactly
    // at t=50 demanding 6. The departure must be processed first, so both
    // are admitted.
    let mut substrate = SubstrateGraph::new();
    substrate.add_node(0, 0.0, 0.0, 10.0);
    let requests = vec![node_request(0, 0, 50, 6.0), node_request(1, 50, 50, 6.0)];
    let engine = SimulationEngine::new(
        substrate,
        requests,
        Box::new(Greedy::new()),
        ReportInterval::Time(10_000),
    );
    let summary = engine.run().unwrap();
    assert_eq!(summary.accepted, 2);
    assert_eq!(summary.rejected, 0);
}

#[test]
fn test_conservation_after_full_run() {
    let mut substrate = SubstrateGraph::new();
    for id in 0..5 {
        substrate.add_node(id, id as f64, 0.0, 40.0);
        if id > 0 {
            substrate.add_link(id - 1, id, 30.0, 1.0);
        }
    }
    let requests: Vec<VirtualRequest> = (0..40)
        .map(|i| link_request(i, (i * 11) % 300, 70, 6.0, 4.0))
        .collect();
    let engine = SimulationEngine::new(
        substrate,
        requests,
        Box::new(Greedy::new()),
        ReportInterval::Events(7),
    );
    let summary = engine.run().unwrap();
    assert!(summary.accepted > 0);

    // Every admitted request departed, so the final snapshot shows a fully
    // restored substrate.
    let last = summary.snapshots.last().unwrap();
    assert_eq!(last.node_utilization, 0.0);
    assert_eq!(last.link_utilization, 0.0);
}

#[test]
fn test_identical_runs_produce_identical_snapshots() {
    let build = || {
        let mut substrate = SubstrateGraph::new();
        for id in 0..6 {
            substrate.add_node(id, id as f64, 0.0, 35.0);
            if id > 0 {
                substrate.add_link(id - 1, id, 25.0, 1.0);
            }
        }
        substrate.add_link(0, 5, 25.0, 1.0);
        let requests: Vec<VirtualRequest> = (0..50)
            .map(|i| link_request(i, (i * 17) % 400, 90, 5.0, 3.0))
            .collect();
        SimulationEngine::new(
            substrate,
            requests,
            Box::new(Greedy::new()),
            ReportInterval::Time(50),
        )
    };

    let a = build().run().unwrap();
    let b = build().run().unwrap();
    assert_eq!(a.snapshots.len(), b.snapshots.len());
    for (sa, sb) in a.snapshots.iter().zip(&b.snapshots) {
        assert_eq!(sa.time, sb.time);
        assert_eq!(sa.acceptance_ratio, sb.acceptance_ratio);
        assert_eq!(sa.revenue, sb.revenue);
        assert_eq!(sa.cost, sb.cost);
        assert_eq!(sa.revenue_cost_ratio, sb.revenue_cost_ratio);
        assert_eq!(sa.node_utilization, sb.node_utilization);
        assert_eq!(sa.link_utilization, sb.link_utilization);
    }
}

#[test]
fn test_revenue_and_cost_accumulate_only_for_accepted() {
    // Two identical requests, capacity for one. Revenue 6, cost 6 (no
    // links) — counted once.
    let mut substrate = SubstrateGraph::new();
    substrate.add_node(0, 0.0, 0.0, 10.0);
    let requests = vec![node_request(0, 0, 100, 6.0), node_request(1, 1, 100, 6.0)];
    let engine = SimulationEngine::new(
        substrate,
        requests,
        Box::new(Greedy::new()),
        ReportInterval::Time(10_000),
    );
    let summary = engine.run().unwrap();
    assert_eq!(summary.revenue, 6.0);
    assert_eq!(summary.cost, 6.0);
    assert_eq!(summary.revenue_cost_ratio, 1.0);
}

#[test]
fn test_cost_includes_path_hops() {
    // Two virtual nodes forced onto the far ends of a 3-node line: the
    // virtual link rides 2 substrate hops, so cost = 2*cpu + bw*2.
    let mut substrate = SubstrateGraph::new();
    substrate.add_node(0, 0.0, 0.0, 20.0);
    substrate.add_node(1, 1.0, 0.0, 1.0); // too small for a virtual node
    substrate.add_node(2, 2.0, 0.0, 20.0);
    substrate.add_link(0, 1, 30.0, 1.0);
    substrate.add_link(1, 2, 30.0, 1.0);
    let requests = vec![link_request(0, 0, 100, 10.0, 4.0)];
    let engine = SimulationEngine::new(
        substrate,
        requests,
        Box::new(Greedy::new()),
        ReportInterval::Time(10_000),
    );
    let summary = engine.run().unwrap();
    assert_eq!(summary.accepted, 1);
    assert_eq!(summary.revenue, 24.0); // 10 + 10 + 4
    assert_eq!(summary.cost, 28.0); // 10 + 10 + 4*2
}
