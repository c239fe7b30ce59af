//! Intake normalization for transfer batches.
//!
//! Chain sources may deliver the same transaction more than once (range
//! overlap, per-seed fetches). Every analysis step downstream assumes a
//! hash-deduplicated, lowercase-addressed transfer list; this module is
//! the single place that establishes that invariant.

use std::collections::HashSet;

use crate::types::Transfer;

/// Deduplicate transfers by hash and lowercase both addresses.
///
/// Keeps the first occurrence of each hash and preserves input order.
pub fn normalize_transfers(transfers: Vec<Transfer>) -> Vec<Transfer> {
    let mut seen: HashSet<String> = HashSet::with_capacity(transfers.len());
    let mut out = Vec::with_capacity(transfers.len());

    for mut tx in transfers {
        if !seen.insert(tx.hash.clone()) {
            continue;
        }
        tx.from = tx.from.to_lowercase();
        tx.to = tx.to.to_lowercase();
        out.push(tx);
    }

    out
}
