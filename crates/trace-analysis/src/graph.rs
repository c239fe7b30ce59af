//! In-memory transfer graph construction.
//!
//! Builds a directed multi-edge graph where nodes are lowercased
//! addresses and edges are individual transfers. Parallel edges are
//! intentional — the same ordered address pair can carry many transfers,
//! and cycle values must sum across all of them.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use trace_data::types::{parse_value_wei, Subgraph, Transfer};

/// Node payload: address identity plus the derived suspicion flags.
///
/// The flags are a fixed structured record, not an attribute bag; only
/// the suspicion labeler writes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressNode {
    /// Lowercased address.
    pub id: String,
    /// Set when the anomaly detector flags this node.
    pub suspicious: bool,
    /// Set when this node participates in any detected cycle.
    pub in_cycle: bool,
}

impl AddressNode {
    fn new(id: String) -> Self {
        Self {
            id,
            suspicious: false,
            in_cycle: false,
        }
    }
}

/// Edge payload: one transfer between two addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEdge {
    /// Transaction hash.
    pub hash: String,
    /// Transferred value in base units.
    pub value: u128,
    /// Block timestamp in unix seconds.
    pub timestamp: u64,
}

/// Directed multigraph of value transfers between addresses.
pub struct TransferGraph {
    /// The underlying petgraph directed graph.
    pub graph: DiGraph<AddressNode, TransferEdge>,
    /// Lookup from lowercased address to node index.
    pub addr_to_ix: HashMap<String, NodeIndex>,
}

impl Default for TransferGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            addr_to_ix: HashMap::new(),
        }
    }

    /// Returns the node index for an address, inserting a node if absent.
    pub fn ensure_node(&mut self, address: &str) -> NodeIndex {
        let id = address.to_lowercase();
        match self.addr_to_ix.get(&id) {
            Some(&ix) => ix,
            None => {
                let ix = self.graph.add_node(AddressNode::new(id.clone()));
                self.addr_to_ix.insert(id, ix);
                ix
            }
        }
    }

    /// Adds one transfer edge, preserving parallel edges.
    pub fn add_transfer(&mut self, from: &str, to: &str, hash: &str, value: u128, timestamp: u64) {
        let from_ix = self.ensure_node(from);
        let to_ix = self.ensure_node(to);
        self.graph.add_edge(
            from_ix,
            to_ix,
            TransferEdge {
                hash: hash.to_string(),
                value,
                timestamp,
            },
        );
    }

    /// Builds a graph directly from a transfer list.
    pub fn from_transfers(transfers: &[Transfer]) -> Self {
        let mut g = Self::new();
        for t in transfers {
            g.add_transfer(
                &t.from,
                &t.to,
                &t.hash,
                parse_value_wei(&t.value),
                t.timestamp,
            );
        }
        g
    }

    /// Builds a graph from a store-retrieved subgraph.
    ///
    /// Isolated nodes (seeds without edges) are kept.
    pub fn from_subgraph(subgraph: &Subgraph) -> Self {
        let mut g = Self::new();
        for node in &subgraph.nodes {
            g.ensure_node(&node.id);
        }
        for edge in &subgraph.edges {
            g.add_transfer(
                &edge.from,
                &edge.to,
                &edge.hash,
                parse_value_wei(&edge.value),
                edge.timestamp,
            );
        }
        g
    }

    /// Total incident edge count (in + out) for a node.
    pub fn degree(&self, node: NodeIndex) -> usize {
        self.graph.edges_directed(node, Direction::Incoming).count()
            + self.graph.edges_directed(node, Direction::Outgoing).count()
    }

    /// Sum of edge values incident to a node in either direction.
    ///
    /// Each edge contributes once, self-loops included.
    pub fn total_value(&self, node: NodeIndex) -> u128 {
        let mut total = 0u128;
        for edge_ref in self.graph.edge_references() {
            if edge_ref.source() == node || edge_ref.target() == node {
                total = total.saturating_add(edge_ref.weight().value);
            }
        }
        total
    }

    /// Node indices paired with their address ids, sorted ascending by id.
    ///
    /// Gives cycle enumeration a deterministic start order across runs.
    pub fn nodes_sorted_by_id(&self) -> Vec<(NodeIndex, String)> {
        let mut nodes: Vec<(NodeIndex, String)> = self
            .graph
            .node_indices()
            .map(|ix| (ix, self.graph[ix].id.clone()))
            .collect();
        nodes.sort_by(|a, b| a.1.cmp(&b.1));
        nodes
    }
}
