//! Embedding strategy trait definitions.
//!
//! All embedding strategies implement the [`EmbeddingStrategy`] trait, which
//! receives the virtual network request and a read-only substrate view and
//! returns either a complete embedding plan or a decline.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Read-only view of a substrate node's capacity state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeView {
    pub id: u32,
    pub cpu_total: f64,
    pub cpu_remain: f64,
}

/// Read-only view of a substrate link's capacity state.
///
/// Links are undirected; `endpoints` is stored low-id-first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkView {
    pub endpoints: (u32, u32),
    pub bw_total: f64,
    pub bw_remain: f64,
    pub distance: f64,
}

/// Normalize an undirected link key to low-id-first order.
pub fn link_key(a: u32, b: u32) -> (u32, u32) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Read-only snapshot of the whole substrate, provided to strategies.
///
/// This is the strategies crate's view of the ledger — remaining capacities
/// and topology only, never the mutable ledger itself. Node and neighbor
/// lists are sorted by id so strategy iteration order is deterministic.
#[derive(Debug, Clone)]
pub struct SubstrateView {
    nodes: Vec<NodeView>,
    links: Vec<LinkView>,
    adjacency: HashMap<u32, Vec<u32>>,
    link_index: HashMap<(u32, u32), usize>,
}

impl SubstrateView {
    /// Build a view from node and link snapshots.
    pub fn new(mut nodes: Vec<NodeView>, links: Vec<LinkView>) -> Self {
        nodes.sort_by_key(|n| n.id);

        let mut adjacency: HashMap<u32, Vec<u32>> = HashMap::new();
        let mut link_index = HashMap::new();
        for (i, link) in links.iter().enumerate() {
            let (a, b) = link.endpoints;
            adjacency.entry(a).or_default().push(b);
            adjacency.entry(b).or_default().push(a);
            link_index.insert(link.endpoints, i);
        }
        for neighbors in adjacency.values_mut() {
            neighbors.sort_unstable();
        }

        Self {
            nodes,
            links,
            adjacency,
            link_index,
        }
    }

    /// All nodes, ascending by id.
    pub fn nodes(&self) -> &[NodeView] {
        &self.nodes
    }

    /// All links.
    pub fn links(&self) -> &[LinkView] {
        &self.links
    }

    /// Look up a node by id.
    pub fn node(&self, id: u32) -> Option<&NodeView> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Neighbor ids of a node, ascending.
    pub fn neighbors(&self, id: u32) -> &[u32] {
        self.adjacency.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Look up the undirected link between two nodes.
    pub fn link(&self, a: u32, b: u32) -> Option<&LinkView> {
        self.link_index
            .get(&link_key(a, b))
            .map(|&i| &self.links[i])
    }

    /// Sum of remaining bandwidth on all links adjacent to a node.
    pub fn adjacent_bw(&self, id: u32) -> f64 {
        self.neighbors(id)
            .iter()
            .filter_map(|&n| self.link(id, n))
            .map(|l| l.bw_remain)
            .sum()
    }
}

/// A virtual node and its compute demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualNodeInfo {
    pub id: u32,
    pub cpu: f64,
}

/// A virtual link and its bandwidth demand. Endpoints are virtual node ids,
/// stored low-id-first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualLinkInfo {
    pub endpoints: (u32, u32),
    pub bw: f64,
}

/// Information about an incoming virtual network request, provided to
/// embedding strategies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestInfo {
    pub id: u64,
    pub arrival: u64,
    pub duration: u64,
    pub nodes: Vec<VirtualNodeInfo>,
    pub links: Vec<VirtualLinkInfo>,
}

/// A candidate embedding produced by a strategy.
///
/// `node_map` maps each virtual node id to a distinct substrate node id.
/// `paths` maps each virtual link (normalized endpoints) to an ordered
/// substrate node sequence from the mapped source to the mapped target.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingPlan {
    pub node_map: HashMap<u32, u32>,
    pub paths: HashMap<(u32, u32), Vec<u32>>,
}

/// Decision returned by an embedding strategy.
#[derive(Debug, Clone)]
pub enum EmbedDecision {
    /// Admit the request with this embedding.
    Embed(EmbeddingPlan),
    /// No feasible embedding found.
    Decline,
}

/// The core embedding strategy trait.
///
/// Implement this trait to plug a custom admission heuristic into the
/// simulator. The engine calls [`embed`](EmbeddingStrategy::embed) once per
/// arriving request; the view is a snapshot, so strategies cannot mutate
/// ledger state. A strategy that cannot place the request returns
/// [`EmbedDecision::Decline`] — there is no retry.
pub trait EmbeddingStrategy: Send + Sync {
    /// Called for each arriving request. Returns a full plan or a decline.
    fn embed(&mut self, request: &RequestInfo, view: &SubstrateView) -> EmbedDecision;

    /// Human-readable name for reports.
    fn name(&self) -> &str;
}

/// Filter substrate nodes to those with enough remaining cpu that are not
/// already used by this request's node map.
pub fn feasible_nodes<'a>(
    view: &'a SubstrateView,
    demand: f64,
    used: &HashMap<u32, u32>,
) -> Vec<&'a NodeView> {
    view.nodes()
        .iter()
        .filter(|n| n.cpu_remain >= demand && !used.values().any(|&s| s == n.id))
        .collect()
}

/// Hop-count shortest path from `src` to `dst` where every traversed link
/// has at least `min_bw` remaining bandwidth. Breadth-first, expanding
/// neighbors in ascending id order, so the result is deterministic.
pub fn bfs_path(view: &SubstrateView, src: u32, dst: u32, min_bw: f64) -> Option<Vec<u32>> {
    if src == dst {
        return Some(vec![src]);
    }
    let mut prev: HashMap<u32, u32> = HashMap::new();
    let mut queue = VecDeque::new();
    queue.push_back(src);
    prev.insert(src, src);

    while let Some(u) = queue.pop_front() {
        for &v in view.neighbors(u) {
            if prev.contains_key(&v) {
                continue;
            }
            let usable = view
                .link(u, v)
                .map(|l| l.bw_remain >= min_bw)
                .unwrap_or(false);
            if !usable {
                continue;
            }
            prev.insert(v, u);
            if v == dst {
                let mut path = vec![dst];
                let mut cur = dst;
                while cur != src {
                    cur = prev[&cur];
                    path.push(cur);
                }
                path.reverse();
                return Some(path);
            }
            queue.push_back(v);
        }
    }
    None
}

/// Route every virtual link of `request` over a BFS shortest path between
/// its mapped endpoints. Returns `None` as soon as any link cannot be
/// routed. Paths are chosen per link against the same view; the ledger's
/// atomic allocation is the final arbiter when paths share substrate links.
pub fn route_links(
    view: &SubstrateView,
    request: &RequestInfo,
    node_map: &HashMap<u32, u32>,
) -> Option<HashMap<(u32, u32), Vec<u32>>> {
    let mut paths = HashMap::new();
    for vlink in &request.links {
        let (u, v) = vlink.endpoints;
        let src = *node_map.get(&u)?;
        let dst = *node_map.get(&v)?;
        let path = bfs_path(view, src, dst, vlink.bw)?;
        paths.insert(link_key(u, v), path);
    }
    Some(paths)
}
