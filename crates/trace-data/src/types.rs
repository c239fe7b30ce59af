//! Type definitions for transfer and subgraph data.

use serde::{Deserialize, Serialize};

/// A single value transfer between two addresses.
///
/// Immutable once ingested; `hash` is the uniqueness key. Addresses are
/// lowercased by the intake normalizer before any analysis touches them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    /// Sender address (hex text).
    pub from: String,
    /// Recipient address (hex text).
    pub to: String,
    /// Transferred value in base units (decimal or 0x-hex text).
    pub value: String,
    /// Transaction hash (unique id).
    pub hash: String,
    /// Block number containing the transfer.
    pub block_number: u64,
    /// Block timestamp in unix seconds.
    pub timestamp: u64,
}

/// A node in a retrieved subgraph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubgraphNode {
    /// Lowercased address.
    pub id: String,
}

/// An edge in a retrieved subgraph: one transfer between two addresses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubgraphEdge {
    /// Sender address (lowercase).
    pub from: String,
    /// Recipient address (lowercase).
    pub to: String,
    /// Transaction hash.
    pub hash: String,
    /// Transferred value in base units.
    pub value: String,
    /// Block timestamp in unix seconds.
    pub timestamp: u64,
}

/// Seed addresses plus one hop of neighbors and connecting edges.
///
/// Edges are deduplicated by `(from, to, hash)` at retrieval time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Subgraph {
    /// All addresses in the subgraph (seeds included, even when isolated).
    pub nodes: Vec<SubgraphNode>,
    /// Deduplicated transfer edges touching a seed.
    pub edges: Vec<SubgraphEdge>,
}

/// Parse a base-unit value string into u128.
///
/// Accepts decimal text or 0x-prefixed hex. Malformed input falls back
/// to 0 at this intake boundary rather than failing the whole batch.
pub fn parse_value_wei(value: &str) -> u128 {
    let trimmed = value.trim();
    if let Some(hex) = trimmed.strip_prefix("0x") {
        return u128::from_str_radix(hex, 16).unwrap_or(0);
    }
    trimmed.parse::<u128>().unwrap_or(0)
}
