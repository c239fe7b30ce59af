//! The analysis pipeline: one synchronous pass from a transfer list to
//! clusters, cycles, anomalies, washing labels, and communities.
//!
//! Each request owns its in-memory graph; there is no shared mutable
//! state between concurrent requests beyond the store's own isolation.
//! A collaborator failure aborts the whole request — no partial report
//! is ever returned.

use eyre::{Context, Result};
use serde::Serialize;

use trace_data::intake::normalize_transfers;
use trace_data::store::GraphStore;
use trace_data::types::Transfer;

use crate::anomaly::{detect_anomalies, AnomalyInfo, DEFAULT_EPS, DEFAULT_MIN_PTS};
use crate::cluster::{change_address, common_input, merge_clusters};
use crate::community::{build_undirected_simple, CommunityPartition, PartitionOracle};
use crate::cycles::{find_simple_cycles, CycleInfo, DEFAULT_MAX_CYCLE_LENGTH};
use crate::graph::TransferGraph;
use crate::labels::label_suspicious;
use crate::washing::{label_washing, WashingInfo};

/// Engine tunables.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Maximum simple-cycle length; the sole bound on enumeration cost.
    pub max_cycle_length: usize,
    /// DBSCAN neighborhood radius on normalized features.
    pub eps: f64,
    /// DBSCAN minimum neighborhood size for a core point.
    pub min_pts: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_cycle_length: DEFAULT_MAX_CYCLE_LENGTH,
            eps: DEFAULT_EPS,
            min_pts: DEFAULT_MIN_PTS,
        }
    }
}

/// Full analysis output for one request.
#[derive(Clone, Debug, Serialize)]
pub struct AnalysisReport {
    /// Deduplicated entity clusters (sorted members).
    pub clusters: Vec<Vec<String>>,
    /// Simple cycles in canonical rotation.
    pub cycles: Vec<CycleInfo>,
    /// Per-node anomaly verdicts.
    pub anomalies: Vec<AnomalyInfo>,
    /// Per-transaction mixing/DeFi flags, input-order aligned.
    pub washing: Vec<WashingInfo>,
    /// Community partition of the subgraph.
    pub communities: CommunityPartition,
}

/// The transaction graph analysis engine.
///
/// Collaborators are injected at construction; the engine holds no
/// ambient globals and performs no retries of its own.
pub struct AnalysisEngine<'a> {
    store: &'a GraphStore,
    oracle: &'a dyn PartitionOracle,
    config: EngineConfig,
}

impl<'a> AnalysisEngine<'a> {
    /// Creates an engine bound to a graph store and a partition oracle.
    pub fn new(store: &'a GraphStore, oracle: &'a dyn PartitionOracle, config: EngineConfig) -> Self {
        Self {
            store,
            oracle,
            config,
        }
    }

    /// Runs the full pipeline for one request.
    ///
    /// # Errors
    /// Fails before any processing on empty or malformed inputs, and
    /// propagates store/oracle failures unmodified in kind.
    #[tracing::instrument(skip_all, fields(seeds = seeds.len(), transfers = transfers.len()))]
    pub fn analyze(&self, seeds: &[String], transfers: Vec<Transfer>) -> Result<AnalysisReport> {
        if seeds.is_empty() {
            eyre::bail!("seed addresses must be a non-empty list");
        }
        if seeds.iter().any(|s| s.trim().is_empty()) {
            eyre::bail!("seed addresses must not contain empty strings");
        }
        if transfers.is_empty() {
            eyre::bail!("transfer list must be non-empty");
        }

        let transfers = normalize_transfers(transfers);
        tracing::debug!(deduplicated = transfers.len(), "intake normalized");

        self.store
            .save_graph(&transfers)
            .wrap_err("graph store write failed")?;

        let mut raw_clusters = common_input(&transfers);
        raw_clusters.extend(change_address(&transfers));
        let clusters = merge_clusters(&raw_clusters);
        if !clusters.is_empty() {
            self.store
                .label_clusters(&clusters)
                .wrap_err("cluster labeling failed")?;
        }

        let subgraph = self
            .store
            .get_subgraph(seeds)
            .wrap_err("subgraph retrieval failed")?;
        let mut graph = TransferGraph::from_subgraph(&subgraph);

        let cycles = find_simple_cycles(&graph, self.config.max_cycle_length);
        let anomalies = detect_anomalies(&graph, self.config.eps, self.config.min_pts);
        label_suspicious(&mut graph, &anomalies, &cycles);

        let washing = label_washing(&transfers);

        let undirected = build_undirected_simple(&subgraph);
        let assignment = self
            .oracle
            .partition(&undirected)
            .wrap_err("community partition failed")?;
        let communities = CommunityPartition::from_assignment(&assignment);

        // Best effort by design: a partial community write is acceptable.
        let persisted = self
            .store
            .persist_community_ids(&assignment)
            .wrap_err("community id persistence failed")?;

        tracing::info!(
            clusters = clusters.len(),
            cycles = cycles.len(),
            anomalies = anomalies.iter().filter(|a| a.score == 1).count(),
            communities = communities.communities.len(),
            persisted,
            "analysis completed"
        );

        Ok(AnalysisReport {
            clusters,
            cycles,
            anomalies,
            washing,
            communities,
        })
    }
}
