//! Random-fit embedding strategy.
//!
//! Picks a uniformly random feasible substrate node for each virtual node.
//! Seeded, so identical runs produce identical placements; mainly useful as
//! a lower-bound baseline when comparing smarter strategies.

use crate::traits::*;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;

/// Random feasible placement with a deterministic seed.
pub struct RandomFit {
    rng: ChaCha8Rng,
}

impl RandomFit {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl EmbeddingStrategy for RandomFit {
    fn embed(&mut self, request: &RequestInfo, view: &SubstrateView) -> EmbedDecision {
        let mut node_map: HashMap<u32, u32> = HashMap::new();
        for vnode in &request.nodes {
            let candidates = feasible_nodes(view, vnode.cpu, &node_map);
            if candidates.is_empty() {
                return EmbedDecision::Decline;
            }
            let pick = self.rng.gen_range(0..candidates.len());
            node_map.insert(vnode.id, candidates[pick].id);
        }

        match route_links(view, request, &node_map) {
            Some(paths) => EmbedDecision::Embed(EmbeddingPlan { node_map, paths }),
            None => EmbedDecision::Decline,
        }
    }

    fn name(&self) -> &str {
        "random_fit"
    }
}
