//! First-fit embedding strategy.
//!
//! The simplest placement strategy: each virtual node goes to the
//! lowest-id substrate node with enough remaining cpu. Ignores load and
//! connectivity, so it tends to pile work onto low-id nodes; useful as a
//! baseline.

use crate::traits::*;
use std::collections::HashMap;

/// First-fit placement.
pub struct FirstFit;

impl FirstFit {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FirstFit {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingStrategy for FirstFit {
    fn embed(&mut self, request: &RequestInfo, view: &SubstrateView) -> EmbedDecision {
        let mut node_map: HashMap<u32, u32> = HashMap::new();
        for vnode in &request.nodes {
            let candidate = feasible_nodes(view, vnode.cpu, &node_map)
                .first()
                .map(|n| n.id);
            match candidate {
                Some(id) => {
                    node_map.insert(vnode.id, id);
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
        "first_fit"
    }
}
