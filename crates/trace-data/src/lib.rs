//! trace-data crate
//!
//! Data plane for transaction graph forensics: transfer types, intake
//! normalization, the SQLite graph store, and the Alloy chain source.

pub mod chain;
pub mod intake;
pub mod store;
pub mod types;

pub use types::{Subgraph, SubgraphEdge, SubgraphNode, Transfer};
