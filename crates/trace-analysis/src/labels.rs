//! Suspicion labeling: merges anomaly and cycle results onto node flags.

use crate::anomaly::{AnomalyInfo, AnomalyKind};
use crate::cycles::CycleInfo;
use crate::graph::TransferGraph;

/// Sets `suspicious` per anomaly verdict and `in_cycle` for every node
/// appearing in any cycle. Write-only flags; nothing in the engine reads
/// them back.
pub fn label_suspicious(g: &mut TransferGraph, anomalies: &[AnomalyInfo], cycles: &[CycleInfo]) {
    for info in anomalies {
        if let Some(&ix) = g.addr_to_ix.get(&info.node) {
            if let Some(node) = g.graph.node_weight_mut(ix) {
                node.suspicious = info.kind == AnomalyKind::Anomaly;
            }
        }
    }

    for cycle in cycles {
        for id in &cycle.nodes {
            if let Some(&ix) = g.addr_to_ix.get(id) {
                if let Some(node) = g.graph.node_weight_mut(ix) {
                    node.in_cycle = true;
                }
            }
        }
    }
}
