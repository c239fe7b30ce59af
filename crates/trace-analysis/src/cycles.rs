//! Bounded enumeration of simple directed cycles.
//!
//! Depth-first traversal from every node in ascending address order,
//! with an explicit frame stack instead of recursion so deep paths
//! cannot exhaust the call stack. Detected cycles are canonicalized to
//! their lexicographically smallest rotation and deduplicated, so the
//! same loop found from different start nodes is reported once.
//!
//! Worst-case cost is exponential in graph density; `max_length` is the
//! sole bound. Callers pick a bound that fits their graph size.

use std::collections::HashSet;

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

use crate::graph::TransferGraph;

/// Default maximum cycle length.
pub const DEFAULT_MAX_CYCLE_LENGTH: usize = 6;

/// A detected simple cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleInfo {
    /// Node ids in canonical rotation; closing edge wraps last → first.
    pub nodes: Vec<String>,
    /// Sum of values over every edge traversed, all parallel edges included.
    pub total_value: u128,
}

/// DFS frame: node, its materialized out-neighbor list, and a cursor.
struct Frame {
    neighbors: Vec<NodeIndex>,
    cursor: usize,
}

/// Finds all simple directed cycles of length 2..=`max_length`.
///
/// Start nodes are visited in ascending lexicographic id order, which
/// makes output deterministic across runs on the same graph.
pub fn find_simple_cycles(g: &TransferGraph, max_length: usize) -> Vec<CycleInfo> {
    let mut cycles = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (start, _) in g.nodes_sorted_by_id() {
        let mut stack: Vec<Frame> = Vec::new();
        let mut path: Vec<NodeIndex> = Vec::new();
        let mut on_path: HashSet<NodeIndex> = HashSet::new();

        push_frame(g, start, &mut stack, &mut path, &mut on_path);

        while let Some(frame) = stack.last_mut() {
            if frame.cursor < frame.neighbors.len() {
                let neighbor = frame.neighbors[frame.cursor];
                frame.cursor += 1;

                if neighbor == start && path.len() >= 2 {
                    if let Some(cycle) = canonicalize(g, &path, &mut seen) {
                        cycles.push(cycle);
                    }
                } else if !on_path.contains(&neighbor) && path.len() < max_length {
                    push_frame(g, neighbor, &mut stack, &mut path, &mut on_path);
                }
            } else {
                stack.pop();
                if let Some(done) = path.pop() {
                    on_path.remove(&done);
                }
            }
        }
    }

    cycles
}

fn push_frame(
    g: &TransferGraph,
    node: NodeIndex,
    stack: &mut Vec<Frame>,
    path: &mut Vec<NodeIndex>,
    on_path: &mut HashSet<NodeIndex>,
) {
    path.push(node);
    on_path.insert(node);
    stack.push(Frame {
        neighbors: unique_out_neighbors(g, node),
        cursor: 0,
    });
}

/// Distinct out-neighbors in first-seen edge order.
///
/// Parallel edges share a traversal step; their values are still all
/// counted when the cycle total is computed.
fn unique_out_neighbors(g: &TransferGraph, node: NodeIndex) -> Vec<NodeIndex> {
    let mut seen = HashSet::new();
    g.graph
        .neighbors(node)
        .filter(|n| seen.insert(*n))
        .collect()
}

/// Canonicalizes the path and returns a CycleInfo if it was not seen yet.
///
/// Canonical form: lexicographically smallest comma-joined rotation of
/// the node id sequence.
fn canonicalize(
    g: &TransferGraph,
    path: &[NodeIndex],
    seen: &mut HashSet<String>,
) -> Option<CycleInfo> {
    let ids: Vec<&str> = path.iter().map(|ix| g.graph[*ix].id.as_str()).collect();

    let mut best: Option<String> = None;
    for i in 0..ids.len() {
        let rotation = [&ids[i..], &ids[..i]].concat().join(",");
        if best.as_deref().map_or(true, |b| rotation.as_str() < b) {
            best = Some(rotation);
        }
    }
    let canonical = best?;

    if !seen.insert(canonical.clone()) {
        return None;
    }

    let nodes: Vec<String> = canonical.split(',').map(str::to_string).collect();
    let total_value = cycle_total_value(g, &nodes);
    Some(CycleInfo { nodes, total_value })
}

/// Sum of values over each consecutive wrapped pair, across all
/// parallel edges between the pair.
fn cycle_total_value(g: &TransferGraph, nodes: &[String]) -> u128 {
    let mut total = 0u128;
    for (i, from) in nodes.iter().enumerate() {
        let to = &nodes[(i + 1) % nodes.len()];
        let (from_ix, to_ix) = match (g.addr_to_ix.get(from), g.addr_to_ix.get(to)) {
            (Some(&a), Some(&b)) => (a, b),
            _ => continue,
        };
        for edge in g.graph.edges_connecting(from_ix, to_ix) {
            total = total.saturating_add(edge.weight().value);
        }
    }
    total
}
