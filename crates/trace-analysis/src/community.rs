//! Community partition consumption.
//!
//! The partition itself comes from an external algorithm (modularity
//! maximization or similar) behind the [`PartitionOracle`] seam; this
//! module prepares the oracle's input — an undirected graph with
//! duplicate edges collapsed — and turns its assignment into
//! bidirectional lookup structures.

use std::collections::HashMap;

use eyre::Result;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};

use trace_data::types::Subgraph;

/// External community-partition algorithm.
///
/// Returns `(address, community_id)` pairs; pair order determines the
/// first-seen ordering of communities downstream. The engine treats the
/// implementation as opaque.
pub trait PartitionOracle {
    /// Partitions the undirected simple graph into communities.
    ///
    /// # Errors
    /// Returns error when the external algorithm fails.
    fn partition(&self, graph: &UnGraph<String, ()>) -> Result<Vec<(String, i64)>>;
}

/// One community: its id and member addresses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
    /// Partition id assigned by the oracle.
    pub id: i64,
    /// Member addresses in assignment order.
    pub members: Vec<String>,
}

/// Bidirectional community lookup built from an oracle assignment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityPartition {
    /// Address → community id.
    pub node_to_community: HashMap<String, i64>,
    /// Communities in first-seen id order.
    pub communities: Vec<Community>,
}

impl CommunityPartition {
    /// Builds both directions of the lookup in one pass.
    pub fn from_assignment(assignment: &[(String, i64)]) -> Self {
        let mut node_to_community = HashMap::with_capacity(assignment.len());
        let mut communities: Vec<Community> = Vec::new();
        let mut index: HashMap<i64, usize> = HashMap::new();

        for (node, community_id) in assignment {
            node_to_community.insert(node.clone(), *community_id);
            let pos = *index.entry(*community_id).or_insert_with(|| {
                communities.push(Community {
                    id: *community_id,
                    members: Vec::new(),
                });
                communities.len() - 1
            });
            communities[pos].members.push(node.clone());
        }

        Self {
            node_to_community,
            communities,
        }
    }

    /// Members of a community, if the id was assigned.
    pub fn members_of(&self, community_id: i64) -> Option<&[String]> {
        self.communities
            .iter()
            .find(|c| c.id == community_id)
            .map(|c| c.members.as_slice())
    }
}

/// Builds the undirected, duplicate-edge-collapsed version of a subgraph.
///
/// Parallel transfers between the same unordered pair become one edge.
pub fn build_undirected_simple(subgraph: &Subgraph) -> UnGraph<String, ()> {
    let mut graph = UnGraph::new_undirected();
    let mut node_ix: HashMap<String, NodeIndex> = HashMap::new();

    for node in &subgraph.nodes {
        node_ix
            .entry(node.id.clone())
            .or_insert_with(|| graph.add_node(node.id.clone()));
    }

    for edge in &subgraph.edges {
        let (from, to) = match (node_ix.get(&edge.from), node_ix.get(&edge.to)) {
            (Some(&a), Some(&b)) => (a, b),
            _ => continue,
        };
        if graph.find_edge(from, to).is_none() {
            graph.add_edge(from, to, ());
        }
    }

    graph
}

/// Connected-components oracle: a stand-in partitioner used when no
/// external modularity algorithm is wired in. Assigns one community per
/// connected component, ids dense from 0 in node order.
pub struct ComponentOracle;

impl PartitionOracle for ComponentOracle {
    fn partition(&self, graph: &UnGraph<String, ()>) -> Result<Vec<(String, i64)>> {
        let mut union = UnionFind::new(graph.node_count());
        for edge in graph.edge_indices() {
            if let Some((a, b)) = graph.edge_endpoints(edge) {
                union.union(a.index(), b.index());
            }
        }

        let mut ids: HashMap<usize, i64> = HashMap::new();
        let mut next_id: i64 = 0;
        let mut assignment = Vec::with_capacity(graph.node_count());
        for node in graph.node_indices() {
            let root = union.find(node.index());
            let id = *ids.entry(root).or_insert_with(|| {
                let id = next_id;
                next_id += 1;
                id
            });
            assignment.push((graph[node].clone(), id));
        }

        Ok(assignment)
    }
}
