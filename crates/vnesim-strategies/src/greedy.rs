//! Greedy resource-ranking embedding strategy.
//!
//! Ranks substrate nodes by remaining cpu weighted by the remaining
//! bandwidth of their adjacent links, then maps virtual nodes in descending
//! demand order onto the best-ranked feasible candidates. Virtual links are
//! routed over bandwidth-constrained shortest paths.

use crate::traits::*;
use std::collections::HashMap;

/// Greedy node-ranking strategy.
///
/// The rank `cpu_remain * (1 + adjacent_bw)` favors nodes that are both
/// compute-rich and well connected, which keeps later link routing short.
pub struct Greedy;

impl Greedy {
    pub fn new() -> Self {
        Self
    }

    fn rank(view: &SubstrateView, node: &NodeView) -> f64 {
        node.cpu_remain * (1.0 + view.adjacent_bw(node.id))
    }
}

impl Default for Greedy {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingStrategy for Greedy {
    fn embed(&mut self, request: &RequestInfo, view: &SubstrateView) -> EmbedDecision {
        // Place the most demanding virtual nodes first, while the candidate
        // pool is at its widest.
        let mut vnodes: Vec<&VirtualNodeInfo> = request.nodes.iter().collect();
        vnodes.sort_by(|a, b| {
            b.cpu
                .partial_cmp(&a.cpu)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });

        let mut node_map: HashMap<u32, u32> = HashMap::new();
        for vnode in vnodes {
            let candidates = feasible_nodes(view, vnode.cpu, &node_map);
            let best = candidates.into_iter().max_by(|a, b| {
                Self::rank(view, a)
                    .partial_cmp(&Self::rank(view, b))
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(b.id.cmp(&a.id))
            });
            match best {
                Some(node) => {
                    node_map.insert(vnode.id, node.id);
                }
                None => return EmbedDecision::Decline,
            }
        }

        match route_links(view, request, &node_map) {
            Some(paths) => EmbedDecision::Embed(EmbeddingPlan { node_map, paths }),
            None => EmbedDecision::Decline,
        }
    }

    fn name(&self) -> &str {
        "greedy"
    }
}
