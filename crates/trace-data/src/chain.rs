//! Alloy RPC integration for fetching value transfers from chain data.
//!
//! Walks a block range and maps native transactions touching a watched
//! address set to [`Transfer`] records. Duplicate delivery across
//! overlapping ranges is tolerated; the intake normalizer deduplicates
//! by hash downstream.

use std::collections::HashSet;
use std::sync::Arc;

use alloy::consensus::Transaction as _;
use alloy::network::TransactionResponse as _;
use alloy::primitives::B256;
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::eth::{BlockId, BlockNumberOrTag};
use eyre::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::types::Transfer;

/// Fetches transfers involving watched addresses from an Ethereum RPC endpoint.
pub struct ChainSource {
    provider: Arc<RootProvider>,
}

impl ChainSource {
    /// Creates a new ChainSource and tests RPC connectivity.
    ///
    /// Verifies connection via `eth_blockNumber` and logs the endpoint.
    ///
    /// # Errors
    /// Returns error if the URL is invalid or the connectivity test fails.
    #[tracing::instrument(skip_all, fields(rpc_url = %rpc_url))]
    pub async fn new(rpc_url: &str) -> Result<Self> {
        let provider = ProviderBuilder::new()
            .on_http(rpc_url.parse().wrap_err("invalid RPC URL format")?)
            .root()
            .clone();
        let provider = Arc::new(provider);

        let block_number = provider
            .get_block_number()
            .await
            .wrap_err("failed to test RPC connectivity with eth_blockNumber")?;

        tracing::info!(latest_block = block_number, "RPC connection successful");

        Ok(Self { provider })
    }

    /// Latest block number visible at the endpoint.
    ///
    /// # Errors
    /// Returns error if the RPC call fails.
    pub async fn latest_block(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .wrap_err("failed to fetch latest block number")
    }

    /// Fetches all transfers in `[from_block, to_block]` where sender or
    /// recipient is one of `addresses` (compared case-insensitively).
    ///
    /// Contract creations (no recipient) are skipped. Missing blocks are
    /// logged and skipped rather than failing the range.
    ///
    /// # Errors
    /// Returns error if an RPC call for an existing block fails.
    #[tracing::instrument(skip(self, addresses), fields(from_block, to_block))]
    pub async fn fetch_transfers(
        &self,
        addresses: &[String],
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Transfer>> {
        let watched: HashSet<String> = addresses.iter().map(|a| a.to_lowercase()).collect();
        let mut transfers = Vec::new();

        let pb = ProgressBar::new(to_block.saturating_sub(from_block) + 1);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} blocks")
                .wrap_err("failed to create progress style")?,
        );

        for block_number in from_block..=to_block {
            let block = self
                .provider
                .get_block(BlockId::Number(BlockNumberOrTag::Number(block_number)))
                .await
                .wrap_err_with(|| format!("failed to fetch block {}", block_number))?;

            let block = match block {
                Some(block) => block,
                None => {
                    tracing::debug!(block_number, "block not found");
                    pb.inc(1);
                    continue;
                }
            };

            let timestamp = block.header.timestamp;
            let tx_hashes: Vec<B256> = block.transactions.hashes().collect();

            let txs = futures::future::try_join_all(tx_hashes.iter().map(|hash| {
                let provider = self.provider.clone();
                async move {
                    provider
                        .get_transaction_by_hash(*hash)
                        .await
                        .wrap_err_with(|| format!("failed to fetch transaction {}", hash))
                }
            }))
            .await?;

            for (hash, tx) in tx_hashes.iter().zip(txs) {
                let tx = match tx {
                    Some(tx) => tx,
                    None => continue,
                };

                let from = format!("{:#x}", tx.from());
                let to = match tx.to() {
                    Some(addr) => format!("{addr:#x}"),
                    None => continue,
                };

                if !watched.contains(&from) && !watched.contains(&to) {
                    continue;
                }

                transfers.push(Transfer {
                    from,
                    to,
                    value: tx.value().to_string(),
                    hash: format!("{hash:#x}"),
                    block_number,
                    timestamp,
                });
            }

            pb.inc(1);
        }

        pb.finish_and_clear();
        tracing::info!(
            from_block,
            to_block,
            transfers = transfers.len(),
            "block range fetch completed"
        );

        Ok(transfers)
    }
}
