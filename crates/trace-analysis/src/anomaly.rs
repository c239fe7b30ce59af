//! Per-node feature extraction and density-based anomaly detection.
//!
//! Each node is reduced to a 2D point: incident edge count and total
//! incident value. Total value is log-compressed (`log10(v + 1)`) so
//! wei-scale magnitudes fit the same range as degrees, then both
//! features are min-max normalized into [0, 1]. A from-scratch DBSCAN
//! pass over the normalized points labels low-density outliers as noise;
//! noise points are reported as anomalies.

use serde::{Deserialize, Serialize};

use crate::graph::TransferGraph;

/// Default neighborhood radius on normalized features.
pub const DEFAULT_EPS: f64 = 0.1;
/// Default minimum neighborhood size for a core point.
pub const DEFAULT_MIN_PTS: usize = 2;

/// Classification of a node by the density detector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyKind {
    /// Noise point: not reachable from any core point's expansion.
    Anomaly,
    /// Member (core or border) of some density cluster.
    Clean,
}

/// Anomaly verdict for one node, with the raw features that produced it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyInfo {
    /// Lowercased address.
    pub node: String,
    /// Total incident edge count (in + out).
    pub degree: usize,
    /// Sum of incident edge values in base units.
    pub total_value: u128,
    /// 1 for anomaly, 0 for clean.
    pub score: u8,
    /// Verdict label.
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
}

/// DBSCAN over 2D points. Returns one label per point: cluster ids are
/// sequential integers from 0, noise is -1.
///
/// Neighborhoods use squared Euclidean distance against `eps²` to avoid
/// the square root. A point whose neighborhood is smaller than `min_pts`
/// is provisionally noise; a later core point's expansion may absorb it
/// as a border point, but border points never expand the cluster.
pub fn dbscan(points: &[[f64; 2]], eps: f64, min_pts: usize) -> Vec<i64> {
    let n = points.len();
    let eps2 = eps * eps;
    // None = unvisited, Some(-1) = noise, Some(id) = cluster member
    let mut labels: Vec<Option<i64>> = vec![None; n];
    let mut cluster_id: i64 = 0;

    let region_query = |i: usize| -> Vec<usize> {
        (0..n)
            .filter(|&j| {
                if i == j {
                    return false;
                }
                let dx = points[i][0] - points[j][0];
                let dy = points[i][1] - points[j][1];
                dx * dx + dy * dy <= eps2
            })
            .collect()
    };

    for i in 0..n {
        if labels[i].is_some() {
            continue;
        }
        let neighbors = region_query(i);
        if neighbors.len() < min_pts {
            labels[i] = Some(-1);
            continue;
        }

        labels[i] = Some(cluster_id);
        let mut queue: std::collections::VecDeque<usize> = neighbors.into();
        while let Some(j) = queue.pop_front() {
            if labels[j] == Some(-1) {
                // border point: joins the cluster but is not expanded
                labels[j] = Some(cluster_id);
            }
            if labels[j].is_some() {
                continue;
            }
            labels[j] = Some(cluster_id);
            let expansion = region_query(j);
            if expansion.len() >= min_pts {
                queue.extend(expansion);
            }
        }
        cluster_id += 1;
    }

    labels.into_iter().map(|l| l.unwrap_or(-1)).collect()
}

/// Normalizes raw (degree, total value) features into [0, 1] points.
///
/// Degree divides by the maximum (0 when the maximum is 0). Value is
/// log-transformed then min-max normalized; when every node carries the
/// same total value the spread is zero and the normalized feature falls
/// back to 0 instead of dividing by zero.
fn normalize_features(raw: &[(usize, u128)]) -> Vec<[f64; 2]> {
    let log_values: Vec<f64> = raw
        .iter()
        .map(|&(_, value)| (value as f64 + 1.0).log10())
        .collect();

    let max_deg = raw.iter().map(|&(deg, _)| deg).max().unwrap_or(0) as f64;
    let min_log = log_values.iter().copied().fold(f64::INFINITY, f64::min);
    let max_log = log_values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let log_spread = max_log - min_log;

    raw.iter()
        .zip(&log_values)
        .map(|(&(deg, _), &lg)| {
            let norm_deg = if max_deg > 0.0 { deg as f64 / max_deg } else { 0.0 };
            let norm_val = if log_spread > 0.0 {
                (lg - min_log) / log_spread
            } else {
                0.0
            };
            [norm_deg, norm_val]
        })
        .collect()
}

/// Flags statistically isolated nodes via density clustering over
/// normalized (degree, total value) features.
pub fn detect_anomalies(g: &TransferGraph, eps: f64, min_pts: usize) -> Vec<AnomalyInfo> {
    let mut nodes = Vec::new();
    let mut raw = Vec::new();
    for ix in g.graph.node_indices() {
        nodes.push(g.graph[ix].id.clone());
        raw.push((g.degree(ix), g.total_value(ix)));
    }

    if nodes.is_empty() {
        return Vec::new();
    }

    let points = normalize_features(&raw);
    let labels = dbscan(&points, eps, min_pts);

    nodes
        .into_iter()
        .zip(raw)
        .zip(labels)
        .map(|((node, (degree, total_value)), label)| {
            let is_noise = label == -1;
            AnomalyInfo {
                node,
                degree,
                total_value,
                score: u8::from(is_noise),
                kind: if is_noise {
                    AnomalyKind::Anomaly
                } else {
                    AnomalyKind::Clean
                },
            }
        })
        .collect()
}
