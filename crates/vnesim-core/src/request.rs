//! Virtual network request model.
//!
//! Each [`VirtualRequest`] is a small graph of virtual nodes and links with
//! resource demands, an arrival time, and a lifetime. A successful admission
//! produces an [`Embedding`] that records exactly which substrate resources
//! the request holds until departure.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vnesim_strategies::link_key;

/// A virtual node and its compute demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualNode {
    pub id: u32,
    pub cpu: f64,
}

/// A virtual link and its bandwidth demand. Endpoints are virtual node ids,
/// stored low-id-first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualLink {
    pub endpoints: (u32, u32),
    pub bw: f64,
}

/// A single virtual network request flowing through the simulator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualRequest {
    /// Unique request identifier.
    pub id: u64,
    /// Arrival time in simulation ticks.
    pub arrival: u64,
    /// Lifetime in simulation ticks.
    pub duration: u64,
    /// Virtual nodes with compute demands.
    pub nodes: Vec<VirtualNode>,
    /// Virtual links with bandwidth demands.
    pub links: Vec<VirtualLink>,
}

impl VirtualRequest {
    /// Departure time: arrival plus lifetime.
    pub fn departure(&self) -> u64 {
        self.arrival + self.duration
    }

    /// Revenue: sum of all compute demands plus all bandwidth demands.
    pub fn revenue(&self) -> f64 {
        let cpu: f64 = self.nodes.iter().map(|n| n.cpu).sum();
        let bw: f64 = self.links.iter().map(|l| l.bw).sum();
        cpu + bw
    }

    /// Compute demand of a virtual node, if it exists.
    pub fn node_demand(&self, vnode_id: u32) -> Option<f64> {
        self.nodes.iter().find(|n| n.id == vnode_id).map(|n| n.cpu)
    }
}

/// A committed assignment of virtual nodes to substrate nodes and virtual
/// links to substrate paths.
///
/// Owned by the request's lifecycle record while the request is embedded and
/// consumed by the ledger's release at departure. `paths` maps each virtual
/// link (normalized endpoints) to the ordered substrate node sequence its
/// bandwidth was reserved along.
#[derive(Debug, Clone)]
pub struct Embedding {
    pub request_id: u64,
    pub node_map: HashMap<u32, u32>,
    pub paths: HashMap<(u32, u32), Vec<u32>>,
}

impl Embedding {
    /// Substrate path assigned to a virtual link.
    pub fn path(&self, u: u32, v: u32) -> Option<&[u32]> {
        self.paths.get(&link_key(u, v)).map(Vec::as_slice)
    }

    /// Embedding cost: compute demands plus bandwidth demand multiplied by
    /// the hop count of the substrate path carrying each virtual link.
    pub fn cost(&self, request: &VirtualRequest) -> f64 {
        let cpu: f64 = request.nodes.iter().map(|n| n.cpu).sum();
        let bw: f64 = request
            .links
            .iter()
            .map(|l| {
                let hops = self
                    .path(l.endpoints.0, l.endpoints.1)
                    .map(|p| p.len().saturating_sub(1))
                    .unwrap_or(0);
                l.bw * hops as f64
            })
            .sum();
        cpu + bw
    }
}
