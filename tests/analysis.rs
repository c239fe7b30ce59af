//! Integration tests for the analysis primitives: clustering heuristics,
//! cycle enumeration, anomaly detection, and washing matching.

mod common;

use std::collections::HashSet;

use common::sample_transfer;
use trace_analysis::anomaly::{dbscan, detect_anomalies, AnomalyKind};
use trace_analysis::cluster::{change_address, common_input, merge_clusters};
use trace_analysis::cycles::find_simple_cycles;
use trace_analysis::graph::TransferGraph;
use trace_analysis::washing::{label_washing, DEFI_CONTRACTS, MIXER_ADDRESSES};
use trace_data::intake::normalize_transfers;

/// Merged cluster output never contains two clusters with the same
/// sorted-member canonical form, for any mix of heuristic outputs.
#[test]
fn merged_clusters_have_unique_canonical_forms() {
    let transfers = vec![
        sample_transfer("0x1", "0xa", "0xb", "5", 100),
        sample_transfer("0x2", "0xb", "0xa", "5", 100),
        sample_transfer("0x3", "0xa", "0xb", "5", 101),
        sample_transfer("0x4", "0xc", "0xd", "5", 101),
        sample_transfer("0x5", "0xd", "0xc", "5", 102),
    ];

    let mut raw = common_input(&transfers);
    raw.extend(change_address(&transfers));
    let merged = merge_clusters(&raw);

    let mut canonicals = HashSet::new();
    for cluster in &merged {
        let mut sorted = cluster.clone();
        sorted.sort();
        assert!(
            canonicals.insert(sorted.join("|")),
            "duplicate canonical cluster: {:?}",
            cluster
        );
    }
}

/// Two senders in one block form a common-input cluster.
#[test]
fn common_input_cluster_for_same_block_senders() {
    let transfers = vec![
        sample_transfer("0x1", "0xX", "0xZ", "1", 500),
        sample_transfer("0x2", "0xY", "0xZ", "1", 500),
    ];
    let clusters = common_input(&transfers);
    assert_eq!(clusters, vec![vec!["0xx".to_string(), "0xy".to_string()]]);
}

/// A single transfer yields a change-address pair.
#[test]
fn change_address_cluster_for_single_transfer() {
    let transfers = vec![sample_transfer("0x1", "0xA", "0xB", "5", 1)];
    let clusters = merge_clusters(&change_address(&transfers));
    assert_eq!(clusters, vec![vec!["0xa".to_string(), "0xb".to_string()]]);
}

/// Triangle D→E→F→D with unit values yields one cycle in canonical
/// rotation with total value 3.
#[test]
fn triangle_cycle_canonical_and_valued() {
    let transfers = vec![
        sample_transfer("0x1", "0xD", "0xE", "1", 1),
        sample_transfer("0x2", "0xE", "0xF", "1", 1),
        sample_transfer("0x3", "0xF", "0xD", "1", 1),
    ];
    let g = TransferGraph::from_transfers(&normalize_transfers(transfers));
    let cycles = find_simple_cycles(&g, 6);

    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].nodes, vec!["0xd", "0xe", "0xf"]);
    assert_eq!(cycles[0].total_value, 3);
}

/// Every returned cycle respects the length bounds and no two cycles
/// share a canonical rotation, on a graph with many overlapping loops.
#[test]
fn cycle_bounds_and_uniqueness_hold() {
    let mut g = TransferGraph::new();
    let ids = ["0xa", "0xb", "0xc", "0xd", "0xe", "0xf"];
    for (i, from) in ids.iter().enumerate() {
        let to = ids[(i + 1) % ids.len()];
        g.add_transfer(from, to, &format!("0xr{i}"), 1, 0);
        let back = ids[(i + ids.len() - 1) % ids.len()];
        g.add_transfer(from, back, &format!("0xb{i}"), 1, 0);
    }

    for max_length in 2..=6 {
        let cycles = find_simple_cycles(&g, max_length);
        let mut seen = HashSet::new();
        for cycle in &cycles {
            assert!(cycle.nodes.len() >= 2, "cycle shorter than 2");
            assert!(
                cycle.nodes.len() <= max_length,
                "cycle longer than bound {max_length}"
            );
            assert!(seen.insert(cycle.nodes.join(",")), "duplicate canonical cycle");
        }
    }
}

/// Cycle total value counts all parallel edges between consecutive pairs.
#[test]
fn cycle_total_value_includes_parallel_edges() {
    let transfers = vec![
        sample_transfer("0x1", "0xa", "0xb", "10", 1),
        sample_transfer("0x2", "0xa", "0xb", "20", 1), // parallel edge
        sample_transfer("0x3", "0xb", "0xa", "5", 1),
    ];
    let g = TransferGraph::from_transfers(&normalize_transfers(transfers));
    let cycles = find_simple_cycles(&g, 6);

    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].total_value, 35);
}

/// Dense points share a cluster label; an unreachable sparse point is noise.
#[test]
fn dbscan_core_and_noise_classification() {
    let points = vec![
        [0.00, 0.00],
        [0.05, 0.00],
        [0.00, 0.05],
        [0.95, 0.95], // far from everything
    ];
    let labels = dbscan(&points, 0.1, 2);

    assert!(labels[0] >= 0);
    assert_eq!(labels[0], labels[1]);
    assert_eq!(labels[1], labels[2]);
    assert_eq!(labels[3], -1);
}

/// An isolated node whose value is orders of magnitude above a
/// well-connected cluster is flagged anomalous.
#[test]
fn anomaly_detector_flags_isolated_outlier() {
    let mut transfers = Vec::new();
    let core = ["0xa", "0xb", "0xc", "0xd"];
    let mut i = 0;
    for from in &core {
        for to in &core {
            if from < to {
                transfers.push(sample_transfer(&format!("0x{i}"), from, to, "100", 1));
                i += 1;
            }
        }
    }
    transfers.push(sample_transfer("0xbig", "0xz", "0xa", "1000000000000", 1));

    let g = TransferGraph::from_transfers(&normalize_transfers(transfers));
    let anomalies = detect_anomalies(&g, 0.1, 2);

    let z = anomalies.iter().find(|a| a.node == "0xz").expect("z present");
    assert_eq!(z.score, 1);
    assert_eq!(z.kind, AnomalyKind::Anomaly);

    for name in ["0xb", "0xc", "0xd"] {
        let rec = anomalies.iter().find(|a| a.node == name).expect("present");
        assert_eq!(rec.score, 0, "node {name} should be clean");
    }
}

/// A transfer into a listed mixer is flagged mixing-only.
#[test]
fn washing_matcher_flags_mixer_recipient() {
    let transfers = vec![
        sample_transfer("0xw1", "0xuser", MIXER_ADDRESSES[0], "1", 1),
        sample_transfer("0xw2", "0xuser", "0xother", "1", 1),
        sample_transfer("0xw3", DEFI_CONTRACTS[0], "0xuser", "1", 1),
    ];
    let out = label_washing(&transfers);

    assert_eq!(out.len(), 3);
    assert!(out[0].mixing && !out[0].defi);
    assert!(!out[1].mixing && !out[1].defi);
    assert!(!out[2].mixing && out[2].defi);
}

/// Washing output stays aligned with an uppercased, unsorted input.
#[test]
fn washing_matcher_is_case_insensitive() {
    let upper = MIXER_ADDRESSES[2].to_uppercase().replace("0X", "0x");
    let out = label_washing(&[sample_transfer("0x1", &upper, "0xuser", "1", 1)]);
    assert!(out[0].mixing);
}
