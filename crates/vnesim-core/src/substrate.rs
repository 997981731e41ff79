//! Substrate network model and the resource ledger.
//!
//! The [`ResourceLedger`] owns the substrate graph's mutable capacity state
//! for the whole simulation. Every capacity mutation flows through
//! [`allocate`](ResourceLedger::allocate) / [`release`](ResourceLedger::release),
//! which gives a single choke point for the conservation invariant:
//! remaining capacity never exceeds the total and never goes negative, and
//! the sum of what embedded requests hold always equals `total - remaining`.

use crate::request::{Embedding, VirtualRequest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;
use vnesim_strategies::{link_key, LinkView, NodeView, SubstrateView};

#[derive(Error, Debug)]
pub enum LedgerError {
    /// An allocation pre-check failed. Ordinary rejection, never fatal.
    #[error("insufficient {resource} on {element}: need {needed}, have {available}")]
    InsufficientResource {
        resource: &'static str,
        element: String,
        needed: f64,
        available: f64,
    },
    /// Release was called for a request that holds nothing.
    #[error("no allocation recorded for request {0}")]
    UnknownEmbedding(u64),
    /// An embedding referenced a substrate node that does not exist.
    #[error("substrate node {0} does not exist")]
    UnknownNode(u32),
    /// An embedding referenced a substrate link that does not exist.
    #[error("substrate link {0}-{1} does not exist")]
    UnknownLink(u32, u32),
}

/// A substrate node with total and remaining compute capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubstrateNode {
    pub id: u32,
    pub x: f64,
    pub y: f64,
    pub cpu_total: f64,
    pub cpu_remain: f64,
}

/// An undirected substrate link with total and remaining bandwidth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubstrateLink {
    pub endpoints: (u32, u32),
    pub bw_total: f64,
    pub bw_remain: f64,
    pub distance: f64,
}

/// The physical network: immutable topology, mutable capacities.
///
/// Keyed collections are ordered so iteration (and therefore float
/// accumulation) is deterministic across runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubstrateGraph {
    pub nodes: BTreeMap<u32, SubstrateNode>,
    pub links: BTreeMap<(u32, u32), SubstrateLink>,
}

impl SubstrateGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: u32, x: f64, y: f64, cpu: f64) {
        self.nodes.insert(
            id,
            SubstrateNode {
                id,
                x,
                y,
                cpu_total: cpu,
                cpu_remain: cpu,
            },
        );
    }

    pub fn add_link(&mut self, a: u32, b: u32, bw: f64, distance: f64) {
        let endpoints = link_key(a, b);
        self.links.insert(
            endpoints,
            SubstrateLink {
                endpoints,
                bw_total: bw,
                bw_remain: bw,
                distance,
            },
        );
    }
}

/// Per-request record of exactly what was subtracted, so release restores
/// precisely the allocated amounts.
#[derive(Debug, Clone)]
struct AllocationRecord {
    nodes: Vec<(u32, f64)>,
    links: Vec<((u32, u32), f64)>,
}

/// Owner of all mutable substrate capacity state.
///
/// All mutation happens inside the single-threaded event loop, so the ledger
/// needs no internal locking; its contract is still all-or-nothing per call.
#[derive(Debug)]
pub struct ResourceLedger {
    graph: SubstrateGraph,
    journal: BTreeMap<u64, AllocationRecord>,
}

impl ResourceLedger {
    /// Take exclusive ownership of the substrate graph.
    pub fn new(graph: SubstrateGraph) -> Self {
        Self {
            graph,
            journal: BTreeMap::new(),
        }
    }

    /// The underlying graph (read only).
    pub fn graph(&self) -> &SubstrateGraph {
        &self.graph
    }

    /// True iff the node exists and has at least `demand` cpu remaining.
    pub fn check_node(&self, node_id: u32, demand: f64) -> bool {
        self.graph
            .nodes
            .get(&node_id)
            .map(|n| n.cpu_remain >= demand)
            .unwrap_or(false)
    }

    /// True iff every link along `path` exists and has at least `demand`
    /// bandwidth remaining.
    pub fn check_path(&self, path: &[u32], demand: f64) -> bool {
        path.windows(2).all(|hop| {
            self.graph
                .links
                .get(&link_key(hop[0], hop[1]))
                .map(|l| l.bw_remain >= demand)
                .unwrap_or(false)
        })
    }

    /// Atomically reserve every resource the embedding names.
    ///
    /// The full set of per-node and per-link amounts is accumulated and
    /// validated before anything is subtracted; if any single component is
    /// short, nothing mutates and `InsufficientResource` is returned. Paths
    /// of different virtual links may share substrate links — the combined
    /// demand is what gets checked.
    pub fn allocate(
        &mut self,
        request: &VirtualRequest,
        embedding: &Embedding,
    ) -> Result<(), LedgerError> {
        let mut node_amounts: BTreeMap<u32, f64> = BTreeMap::new();
        for vnode in &request.nodes {
            let snode = match embedding.node_map.get(&vnode.id) {
                Some(&s) => s,
                None => continue, // incomplete plans are caught by the lifecycle
            };
            *node_amounts.entry(snode).or_insert(0.0) += vnode.cpu;
        }

        let mut link_amounts: BTreeMap<(u32, u32), f64> = BTreeMap::new();
        for vlink in &request.links {
            let path = match embedding.path(vlink.endpoints.0, vlink.endpoints.1) {
                Some(p) => p,
                None => continue,
            };
            for hop in path.windows(2) {
                *link_amounts.entry(link_key(hop[0], hop[1])).or_insert(0.0) += vlink.bw;
            }
        }

        // Validate everything first.
        for (&snode, &amount) in &node_amounts {
            let node = self
                .graph
                .nodes
                .get(&snode)
                .ok_or(LedgerError::UnknownNode(snode))?;
            if node.cpu_remain < amount {
                return Err(LedgerError::InsufficientResource {
                    resource: "cpu",
                    element: format!("node {}", snode),
                    needed: amount,
                    available: node.cpu_remain,
                });
            }
        }
        for (&key, &amount) in &link_amounts {
            let link = self
                .graph
                .links
                .get(&key)
                .ok_or(LedgerError::UnknownLink(key.0, key.1))?;
            if link.bw_remain < amount {
                return Err(LedgerError::InsufficientResource {
                    resource: "bandwidth",
                    element: format!("link {}-{}", key.0, key.1),
                    needed: amount,
                    available: link.bw_remain,
                });
            }
        }

        // Commit.
        for (&snode, &amount) in &node_amounts {
            self.graph.nodes.get_mut(&snode).unwrap().cpu_remain -= amount;
        }
        for (&key, &amount) in &link_amounts {
            self.graph.links.get_mut(&key).unwrap().bw_remain -= amount;
        }
        self.journal.insert(
            embedding.request_id,
            AllocationRecord {
                nodes: node_amounts.into_iter().collect(),
                links: link_amounts.into_iter().collect(),
            },
        );
        debug!(request_id = embedding.request_id, "resources allocated");
        Ok(())
    }

    /// Restore exactly the amounts a prior [`allocate`](Self::allocate)
    /// subtracted for this request.
    pub fn release(&mut self, request_id: u64) -> Result<(), LedgerError> {
        let record = self
            .journal
            .remove(&request_id)
            .ok_or(LedgerError::UnknownEmbedding(request_id))?;
        for (snode, amount) in &record.nodes {
            if let Some(node) = self.graph.nodes.get_mut(snode) {
                node.cpu_remain = (node.cpu_remain + amount).min(node.cpu_total);
            }
        }
        for (key, amount) in &record.links {
            if let Some(link) = self.graph.links.get_mut(key) {
                link.bw_remain = (link.bw_remain + amount).min(link.bw_total);
            }
        }
        debug!(request_id, "resources released");
        Ok(())
    }

    /// Average node and link utilization, each `1 - remaining/total`.
    /// A substrate with no links reports zero link utilization.
    pub fn utilization(&self) -> (f64, f64) {
        let node_util = if self.graph.nodes.is_empty() {
            0.0
        } else {
            self.graph
                .nodes
                .values()
                .map(|n| 1.0 - n.cpu_remain / n.cpu_total)
                .sum::<f64>()
                / self.graph.nodes.len() as f64
        };
        let link_util = if self.graph.links.is_empty() {
            0.0
        } else {
            self.graph
                .links
                .values()
                .map(|l| 1.0 - l.bw_remain / l.bw_total)
                .sum::<f64>()
                / self.graph.links.len() as f64
        };
        (node_util, link_util)
    }

    /// Read-only capacity snapshot handed to embedding strategies.
    pub fn snapshot(&self) -> SubstrateView {
        let nodes = self
            .graph
            .nodes
            .values()
            .map(|n| NodeView {
                id: n.id,
                cpu_total: n.cpu_total,
                cpu_remain: n.cpu_remain,
            })
            .collect();
        let links = self
            .graph
            .links
            .values()
            .map(|l| LinkView {
                endpoints: l.endpoints,
                bw_total: l.bw_total,
                bw_remain: l.bw_remain,
                distance: l.distance,
            })
            .collect();
        SubstrateView::new(nodes, links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{VirtualLink, VirtualNode};
    use std::collections::HashMap;

    fn line_graph(n: u32, cpu: f64, bw: f64) -> SubstrateGraph {
        let mut graph = SubstrateGraph::new();
        for id in 0..n {
            graph.add_node(id, id as f64, 0.0, cpu);
        }
        for i in 0..n.saturating_sub(1) {
            graph.add_link(i, i + 1, bw, 1.0);
        }
        graph
    }

    fn two_node_request(id: u64, cpu: f64, bw: f64) -> VirtualRequest {
        VirtualRequest {
            id,
            arrival: 0,
            duration: 100,
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

    fn embedding_over_line(request_id: u64, src: u32, dst: u32) -> Embedding {
        let mut node_map = HashMap::new();
        node_map.insert(0, src);
        node_map.insert(1, dst);
        let mut paths = HashMap::new();
        paths.insert((0, 1), (src..=dst).collect());
        Embedding {
            request_id,
            node_map,
            paths,
        }
    }

    #[test]
    fn test_check_node() {
        let ledger = ResourceLedger::new(line_graph(2, 10.0, 10.0));
        assert!(ledger.check_node(0, 10.0));
        assert!(!ledger.check_node(0, 10.5));
        assert!(!ledger.check_node(99, 1.0));
    }

    #[test]
    fn test_check_path() {
        let ledger = ResourceLedger::new(line_graph(3, 10.0, 10.0));
        assert!(ledger.check_path(&[0, 1, 2], 10.0));
        assert!(!ledger.check_path(&[0, 1, 2], 11.0));
        assert!(!ledger.check_path(&[0, 2], 1.0)); // no such link
    }

    #[test]
    fn test_allocate_subtracts_and_release_restores() {
        let mut ledger = ResourceLedger::new(line_graph(3, 10.0, 10.0));
        let request = two_node_request(1, 4.0, 3.0);
        let embedding = embedding_over_line(1, 0, 2);

        ledger.allocate(&request, &embedding).unwrap();
        assert_eq!(ledger.graph().nodes[&0].cpu_remain, 6.0);
        assert_eq!(ledger.graph().nodes[&2].cpu_remain, 6.0);
        assert_eq!(ledger.graph().nodes[&1].cpu_remain, 10.0);
        assert_eq!(ledger.graph().links[&(0, 1)].bw_remain, 7.0);
        assert_eq!(ledger.graph().links[&(1, 2)].bw_remain, 7.0);

        ledger.release(1).unwrap();
        assert_eq!(ledger.graph().nodes[&0].cpu_remain, 10.0);
        assert_eq!(ledger.graph().links[&(0, 1)].bw_remain, 10.0);
    }

    #[test]
    fn test_allocate_is_atomic_on_node_shortage() {
        let mut ledger = ResourceLedger::new(line_graph(3, 10.0, 10.0));
        // Node demand fits, link demand does not: nothing may change.
        let request = two_node_request(1, 4.0, 11.0);
        let embedding = embedding_over_line(1, 0, 2);

        let err = ledger.allocate(&request, &embedding).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientResource { .. }));
        assert_eq!(ledger.graph().nodes[&0].cpu_remain, 10.0);
        assert_eq!(ledger.graph().links[&(0, 1)].bw_remain, 10.0);
    }

    #[test]
    fn test_allocate_checks_combined_demand_on_shared_link() {
        // Two virtual links route over the same substrate link; each fits
        // alone (6 <= 10) but not together (12 > 10).
        let mut ledger = ResourceLedger::new(line_graph(2, 100.0, 10.0));
        let request = VirtualRequest {
            id: 1,
            arrival: 0,
            duration: 100,
            nodes: vec![
                VirtualNode { id: 0, cpu: 1.0 },
                VirtualNode { id: 1, cpu: 1.0 },
                VirtualNode { id: 2, cpu: 1.0 },
            ],
            links: vec![
                VirtualLink {
                    endpoints: (0, 1),
                    bw: 6.0,
                },
                VirtualLink {
                    endpoints: (1, 2),
                    bw: 6.0,
                },
            ],
        };
        let mut node_map = HashMap::new();
        node_map.insert(0, 0);
        node_map.insert(1, 1);
        node_map.insert(2, 0);
        let mut paths = HashMap::new();
        paths.insert((0, 1), vec![0, 1]);
        paths.insert((1, 2), vec![1, 0]);
        let embedding = Embedding {
            request_id: 1,
            node_map,
            paths,
        };

        let err = ledger.allocate(&request, &embedding).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientResource { .. }));
        assert_eq!(ledger.graph().links[&(0, 1)].bw_remain, 10.0);
    }

    #[test]
    fn test_release_unknown_embedding() {
        let mut ledger = ResourceLedger::new(line_graph(2, 10.0, 10.0));
        assert!(matches!(
            ledger.release(42),
            Err(LedgerError::UnknownEmbedding(42))
        ));
    }

    #[test]
    fn test_double_release_fails() {
        let mut ledger = ResourceLedger::new(line_graph(3, 10.0, 10.0));
        let request = two_node_request(1, 4.0, 3.0);
        let embedding = embedding_over_line(1, 0, 2);
        ledger.allocate(&request, &embedding).unwrap();
        ledger.release(1).unwrap();
        assert!(matches!(
            ledger.release(1),
            Err(LedgerError::UnknownEmbedding(1))
        ));
    }

    #[test]
    fn test_allocate_unknown_substrate_node() {
        let mut ledger = ResourceLedger::new(line_graph(2, 10.0, 10.0));
        let request = two_node_request(1, 4.0, 3.0);
        let mut embedding = embedding_over_line(1, 0, 1);
        embedding.node_map.insert(1, 99);
        assert!(matches!(
            ledger.allocate(&request, &embedding),
            Err(LedgerError::UnknownNode(99))
        ));
    }

    #[test]
    fn test_utilization_snapshot() {
        let mut ledger = ResourceLedger::new(line_graph(2, 10.0, 10.0));
        let (n, l) = ledger.utilization();
        assert_eq!((n, l), (0.0, 0.0));

        let request = two_node_request(1, 5.0, 4.0);
        let embedding = embedding_over_line(1, 0, 1);
        ledger.allocate(&request, &embedding).unwrap();

        let (n, l) = ledger.utilization();
        assert!((n - 0.5).abs() < 1e-9);
        assert!((l - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_utilization_no_links() {
        let mut graph = SubstrateGraph::new();
        graph.add_node(0, 0.0, 0.0, 10.0);
        let ledger = ResourceLedger::new(graph);
        assert_eq!(ledger.utilization(), (0.0, 0.0));
    }

    #[test]
    fn test_snapshot_reflects_remaining() {
        let mut ledger = ResourceLedger::new(line_graph(2, 10.0, 10.0));
        let request = two_node_request(1, 5.0, 4.0);
        let embedding = embedding_over_line(1, 0, 1);
        ledger.allocate(&request, &embedding).unwrap();

        let view = ledger.snapshot();
        assert_eq!(view.node(0).unwrap().cpu_remain, 5.0);
        assert_eq!(view.link(0, 1).unwrap().bw_remain, 6.0);
    }

    #[test]
    fn test_conservation_over_many_cycles() {
        let mut ledger = ResourceLedger::new(line_graph(4, 10.0, 10.0));
        for round in 0..50u64 {
            let request = two_node_request(round, 3.0, 2.0);
            let embedding = embedding_over_line(round, 0, 3);
            ledger.allocate(&request, &embedding).unwrap();
            ledger.release(round).unwrap();
        }
        for node in ledger.graph().nodes.values() {
            assert_eq!(node.cpu_remain, node.cpu_total);
        }
        for link in ledger.graph().links.values() {
            assert_eq!(link.bw_remain, link.bw_total);
        }
    }
}
