//! trace-analysis crate
//!
//! In-memory transaction graph analysis: entity-clustering heuristics,
//! bounded simple-cycle enumeration, density-based anomaly detection,
//! mixer/DeFi matching, and community partition consumption, composed
//! into a single analysis pipeline by [`engine`].

pub mod anomaly;
pub mod cluster;
pub mod community;
pub mod cycles;
pub mod engine;
pub mod graph;
pub mod labels;
pub mod washing;
