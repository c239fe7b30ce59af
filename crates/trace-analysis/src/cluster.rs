//! Entity-clustering heuristics over a transfer list.
//!
//! Both heuristics are deliberately noisy; the merge step deduplicates
//! by canonical form and the downstream label sink tags survivors.
//!
//! The common-input heuristic groups distinct senders per block. It is
//! a UTXO-era rule carried onto an account-based chain; the grouping is
//! reproduced as observed rather than corrected.

use std::collections::{HashMap, HashSet};

use trace_data::types::Transfer;

/// Groups distinct sender addresses by block number and emits each
/// group with more than one member as a cluster.
///
/// Blocks appear in first-seen order; members in first-seen sender order.
pub fn common_input(transfers: &[Transfer]) -> Vec<Vec<String>> {
    let mut block_order: Vec<u64> = Vec::new();
    let mut senders: HashMap<u64, (Vec<String>, HashSet<String>)> = HashMap::new();

    for tx in transfers {
        let entry = senders.entry(tx.block_number).or_insert_with(|| {
            block_order.push(tx.block_number);
            (Vec::new(), HashSet::new())
        });
        let sender = tx.from.to_lowercase();
        if entry.1.insert(sender.clone()) {
            entry.0.push(sender);
        }
    }

    block_order
        .into_iter()
        .filter_map(|block| senders.remove(&block))
        .map(|(members, _)| members)
        .filter(|members| members.len() > 1)
        .collect()
}

/// Emits a `[from, to]` cluster for every transfer whose endpoints differ.
///
/// One cluster per qualifying transfer; duplicates are expected and left
/// for [`merge_clusters`] to collapse.
pub fn change_address(transfers: &[Transfer]) -> Vec<Vec<String>> {
    let mut clusters = Vec::new();
    for tx in transfers {
        let from = tx.from.to_lowercase();
        let to = tx.to.to_lowercase();
        if from != to {
            clusters.push(vec![from, to]);
        }
    }
    clusters
}

/// Deduplicates clusters by content.
///
/// Canonical form: members sorted and joined with `|`. The first cluster
/// with a given canonical form wins; output clusters carry their members
/// in sorted order.
pub fn merge_clusters(clusters: &[Vec<String>]) -> Vec<Vec<String>> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::new();

    for cluster in clusters {
        let mut members = cluster.clone();
        members.sort();
        let canonical = members.join("|");
        if seen.insert(canonical) {
            merged.push(members);
        }
    }

    merged
}
