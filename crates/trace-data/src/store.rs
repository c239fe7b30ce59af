//! SQLite graph store for address nodes and transfer edges.
//!
//! Uses WAL mode for concurrent read performance and prepared statements
//! for batch insert throughput. Edges are keyed by `(from, to, hash)` so
//! re-ingesting the same transfer never creates a duplicate edge.

use std::cell::RefCell;
use std::collections::HashSet;

use eyre::Result;
use rusqlite::Connection;

use crate::types::{Subgraph, SubgraphEdge, SubgraphNode, Transfer};

/// Handle to the persistent graph store.
///
/// Constructed explicitly and passed into the engine; there is no
/// module-level connection singleton.
pub struct GraphStore {
    conn: RefCell<Connection>,
}

impl GraphStore {
    /// Creates or opens a SQLite database with WAL mode enabled.
    ///
    /// # Errors
    /// Returns error if the database cannot be opened or migrations fail.
    pub fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let store = Self {
            conn: RefCell::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn.borrow_mut().execute_batch(
            "
            CREATE TABLE IF NOT EXISTS addresses (
                id TEXT PRIMARY KEY,
                cluster_label TEXT,
                community_id INTEGER
            );

            CREATE TABLE IF NOT EXISTS transfers (
                from_addr TEXT NOT NULL,
                to_addr TEXT NOT NULL,
                hash TEXT NOT NULL,
                value TEXT NOT NULL,
                block_number INTEGER NOT NULL,
                timestamp INTEGER NOT NULL,
                PRIMARY KEY (from_addr, to_addr, hash)
            );

            CREATE INDEX IF NOT EXISTS idx_transfers_to ON transfers (to_addr);
            ",
        )?;
        Ok(())
    }

    /// Upserts address nodes and transfer edges for a transfer batch.
    ///
    /// Runs inside a single SQLite transaction: all rows commit together
    /// or none do. Idempotent under re-submission of the same transfers.
    ///
    /// # Errors
    /// Returns error if any insert fails; the whole batch rolls back.
    #[tracing::instrument(skip_all, fields(transfers = transfers.len()))]
    pub fn save_graph(&self, transfers: &[Transfer]) -> Result<usize> {
        let mut conn = self.conn.borrow_mut();
        let tx = conn.transaction()?;
        {
            let mut node_stmt = tx.prepare("INSERT OR IGNORE INTO addresses (id) VALUES (?)")?;
            let mut edge_stmt = tx.prepare(
                "
                INSERT INTO transfers (from_addr, to_addr, hash, value, block_number, timestamp)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT (from_addr, to_addr, hash) DO UPDATE SET
                    value = excluded.value,
                    block_number = excluded.block_number,
                    timestamp = excluded.timestamp
                ",
            )?;

            for t in transfers {
                let from = t.from.to_lowercase();
                let to = t.to.to_lowercase();
                node_stmt.execute(rusqlite::params![from])?;
                node_stmt.execute(rusqlite::params![to])?;
                edge_stmt.execute(rusqlite::params![
                    from,
                    to,
                    t.hash,
                    t.value,
                    t.block_number,
                    t.timestamp,
                ])?;
            }
        }

        let count = transfers.len();
        tx.commit()?;
        Ok(count)
    }

    /// Returns the seed addresses plus one hop of neighbors and the
    /// connecting edges, deduplicated by `(from, to, hash)`.
    ///
    /// Seeds always appear in the node list, even when isolated.
    ///
    /// # Errors
    /// Returns error on an empty seed list or a failed query.
    #[tracing::instrument(skip_all, fields(seeds = addresses.len()))]
    pub fn get_subgraph(&self, addresses: &[String]) -> Result<Subgraph> {
        if addresses.is_empty() {
            eyre::bail!("addresses must be a non-empty list");
        }

        let seeds: Vec<String> = addresses.iter().map(|a| a.to_lowercase()).collect();
        let mut node_ids: Vec<String> = Vec::new();
        let mut node_set: HashSet<String> = HashSet::new();
        for seed in &seeds {
            if node_set.insert(seed.clone()) {
                node_ids.push(seed.clone());
            }
        }

        let mut edge_keys: HashSet<String> = HashSet::new();
        let mut edges: Vec<SubgraphEdge> = Vec::new();

        let conn = self.conn.borrow();
        let mut stmt = conn.prepare(
            "
            SELECT from_addr, to_addr, hash, value, timestamp
            FROM transfers
            WHERE from_addr = ?1 OR to_addr = ?1
            ",
        )?;

        for seed in &seeds {
            let rows = stmt.query_map(rusqlite::params![seed], |row| {
                Ok(SubgraphEdge {
                    from: row.get(0)?,
                    to: row.get(1)?,
                    hash: row.get(2)?,
                    value: row.get(3)?,
                    timestamp: row.get(4)?,
                })
            })?;

            for row in rows {
                let edge = row?;
                let key = format!("{}:{}:{}", edge.from, edge.to, edge.hash);
                if !edge_keys.insert(key) {
                    continue;
                }
                for endpoint in [&edge.from, &edge.to] {
                    if node_set.insert(endpoint.clone()) {
                        node_ids.push(endpoint.clone());
                    }
                }
                edges.push(edge);
            }
        }

        let nodes = node_ids.into_iter().map(|id| SubgraphNode { id }).collect();
        Ok(Subgraph { nodes, edges })
    }

    /// Tags cluster members with a `cluster_{index}` label.
    ///
    /// Transactional across the whole batch: either every cluster's tags
    /// commit or none do.
    ///
    /// # Errors
    /// Returns error if any update fails; the whole batch rolls back.
    #[tracing::instrument(skip_all, fields(clusters = clusters.len()))]
    pub fn label_clusters(&self, clusters: &[Vec<String>]) -> Result<()> {
        let mut conn = self.conn.borrow_mut();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare("UPDATE addresses SET cluster_label = ? WHERE id = ?")?;
            for (idx, cluster) in clusters.iter().enumerate() {
                let label = format!("cluster_{idx}");
                for member in cluster {
                    stmt.execute(rusqlite::params![label, member.to_lowercase()])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Persists community ids per address, best effort.
    ///
    /// Deliberately non-transactional: a failed row is logged and skipped,
    /// leaving earlier rows in place. Returns the number of rows updated.
    #[tracing::instrument(skip_all, fields(assignments = assignment.len()))]
    pub fn persist_community_ids(&self, assignment: &[(String, i64)]) -> Result<usize> {
        let conn = self.conn.borrow();
        let mut updated = 0usize;
        for (address, community_id) in assignment {
            match conn.execute(
                "UPDATE addresses SET community_id = ? WHERE id = ?",
                rusqlite::params![community_id, address.to_lowercase()],
            ) {
                Ok(rows) => updated += rows,
                Err(err) => {
                    tracing::warn!(address = %address, %err, "failed to persist community id");
                }
            }
        }
        Ok(updated)
    }

    /// Number of address nodes in the store.
    pub fn node_count(&self) -> Result<u64> {
        let conn = self.conn.borrow();
        let count = conn.query_row("SELECT COUNT(*) FROM addresses", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Number of transfer edges in the store.
    pub fn edge_count(&self) -> Result<u64> {
        let conn = self.conn.borrow();
        let count = conn.query_row("SELECT COUNT(*) FROM transfers", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Cluster label for an address, if one was assigned.
    pub fn cluster_label(&self, address: &str) -> Result<Option<String>> {
        let conn = self.conn.borrow();
        let label = conn
            .query_row(
                "SELECT cluster_label FROM addresses WHERE id = ?",
                rusqlite::params![address.to_lowercase()],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        Ok(label.flatten())
    }

    /// Community id for an address, if one was persisted.
    pub fn community_id(&self, address: &str) -> Result<Option<i64>> {
        let conn = self.conn.borrow();
        let id = conn
            .query_row(
                "SELECT community_id FROM addresses WHERE id = ?",
                rusqlite::params![address.to_lowercase()],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        Ok(id.flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_transfer(hash: &str, from: &str, to: &str, value: &str) -> Transfer {
        Transfer {
            from: from.to_string(),
            to: to.to_string(),
            value: value.to_string(),
            hash: hash.to_string(),
            block_number: 100,
            timestamp: 1_700_000_000,
        }
    }

    fn test_store() -> GraphStore {
        GraphStore::new(":memory:").expect("in-memory store should always open")
    }

    #[test]
    fn migrations_create_tables() {
        let store = test_store();
        let conn = store.conn.borrow();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .expect("query should prepare");

        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .expect("query_map should succeed")
            .collect::<Result<Vec<_>, _>>()
            .expect("all rows should parse");

        assert!(tables.contains(&"addresses".to_string()));
        assert!(tables.contains(&"transfers".to_string()));
    }

    #[test]
    fn save_graph_is_idempotent() {
        let store = test_store();
        let txs = vec![mk_transfer("0x1", "0xAA", "0xBB", "5")];

        store.save_graph(&txs).expect("first save should succeed");
        store.save_graph(&txs).expect("second save should succeed");

        assert_eq!(store.edge_count().expect("edge count"), 1);
        assert_eq!(store.node_count().expect("node count"), 2);
    }

    #[test]
    fn reopened_store_retains_graph() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        let path = dir.path().join("trace.sqlite");
        let path = path.to_str().expect("path should be utf8");

        {
            let store = GraphStore::new(path).expect("store should open");
            store
                .save_graph(&[mk_transfer("0x1", "0xaa", "0xbb", "5")])
                .expect("save should succeed");
        }

        let store = GraphStore::new(path).expect("store should reopen");
        assert_eq!(store.edge_count().expect("edge count"), 1);
        assert_eq!(store.node_count().expect("node count"), 2);
    }

    #[test]
    fn subgraph_returns_one_hop_neighbors() {
        let store = test_store();
        let txs = vec![
            mk_transfer("0x1", "0xaa", "0xbb", "5"),
            mk_transfer("0x2", "0xbb", "0xcc", "7"),
            mk_transfer("0x3", "0xcc", "0xdd", "9"), // two hops out
        ];
        store.save_graph(&txs).expect("save should succeed");

        let sub = store
            .get_subgraph(&["0xAA".to_string(), "0xBB".to_string()])
            .expect("subgraph should succeed");

        let ids: Vec<&str> = sub.nodes.iter().map(|n| n.id.as_str()).collect();
        assert!(ids.contains(&"0xaa"));
        assert!(ids.contains(&"0xbb"));
        assert!(ids.contains(&"0xcc"));
        assert!(!ids.contains(&"0xdd"));
        assert_eq!(sub.edges.len(), 2);
    }

    #[test]
    fn subgraph_dedups_edges_across_seeds() {
        let store = test_store();
        // 0xaa → 0xbb matches both seeds; must appear once
        store
            .save_graph(&[mk_transfer("0x1", "0xaa", "0xbb", "5")])
            .expect("save should succeed");

        let sub = store
            .get_subgraph(&["0xaa".to_string(), "0xbb".to_string()])
            .expect("subgraph should succeed");
        assert_eq!(sub.edges.len(), 1);
    }

    #[test]
    fn subgraph_keeps_isolated_seed() {
        let store = test_store();
        let sub = store
            .get_subgraph(&["0xfeed".to_string()])
            .expect("subgraph should succeed");
        assert_eq!(sub.nodes.len(), 1);
        assert!(sub.edges.is_empty());
    }

    #[test]
    fn subgraph_rejects_empty_seed_list() {
        let store = test_store();
        assert!(store.get_subgraph(&[]).is_err());
    }

    #[test]
    fn label_clusters_tags_members() {
        let store = test_store();
        store
            .save_graph(&[mk_transfer("0x1", "0xaa", "0xbb", "5")])
            .expect("save should succeed");

        store
            .label_clusters(&[vec!["0xaa".to_string(), "0xbb".to_string()]])
            .expect("labeling should succeed");

        assert_eq!(
            store.cluster_label("0xaa").expect("query"),
            Some("cluster_0".to_string())
        );
        assert_eq!(
            store.cluster_label("0xbb").expect("query"),
            Some("cluster_0".to_string())
        );
    }

    #[test]
    fn persist_community_ids_updates_known_addresses() {
        let store = test_store();
        store
            .save_graph(&[mk_transfer("0x1", "0xaa", "0xbb", "5")])
            .expect("save should succeed");

        let updated = store
            .persist_community_ids(&[
                ("0xaa".to_string(), 0),
                ("0xbb".to_string(), 1),
                ("0xunknown".to_string(), 2), // no matching row, not an error
            ])
            .expect("persist should succeed");

        assert_eq!(updated, 2);
        assert_eq!(store.community_id("0xaa").expect("query"), Some(0));
        assert_eq!(store.community_id("0xbb").expect("query"), Some(1));
        assert_eq!(store.community_id("0xunknown").expect("query"), None);
    }
}
