use std::sync::Arc;

use alloy::{
    primitives::{Address, B256},
    sol_types::SolEvent,
};
use anyhow::Context;
use chrono::NaiveDate;
use log::{info, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::{
    abis::Transfer,
    analysis::{
        classifier::{TokenClassifier, TokenKind},
        metrics::{ScanWindow, WalletMetrics},
    },
    ledger::{Ledger, LedgerLog},
    utils::{utc_day, RetryPolicy},
};

/// Which `Transfer` logs of a block feed the token counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferScope {
    /// Every `Transfer` emitted in a scanned block
    #[default]
    Block,
    /// Only transfers whose indexed `from` or `to` is the wallet
    Wallet,
}

/// Scan-local sets. Only their sizes are ever persisted.
#[derive(Debug, Clone, Default)]
pub struct DistinctSets {
    pub contracts_created: FxHashSet<Address>,
    pub erc20_tokens: FxHashSet<Address>,
    pub nft_tokens: FxHashSet<Address>,
    pub active_days: FxHashSet<NaiveDate>,
}

impl DistinctSets {
    fn merge(&mut self, other: DistinctSets) {
        self.contracts_created.extend(other.contracts_created);
        self.erc20_tokens.extend(other.erc20_tokens);
        self.nft_tokens.extend(other.nft_tokens);
        self.active_days.extend(other.active_days);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedBlock {
    pub block: u64,
    pub reason: String,
}

/// What went wrong during a scan without failing it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanDiagnostics {
    pub blocks_processed: u64,
    pub skipped_blocks: Vec<SkippedBlock>,
    /// Classifier probes that failed and fell back to fungible
    pub probe_failures: u64,
}

/// Incremental result of scanning one window.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub window: ScanWindow,
    /// Counters for the window. `first_tx_timestamp` is left at 0.
    pub delta: WalletMetrics,
    pub sets: DistinctSets,
    pub diagnostics: ScanDiagnostics,
}

/// Contribution of a single block. Only merged once the whole block succeeded.
#[derive(Default)]
struct BlockContribution {
    metrics: WalletMetrics,
    sets: DistinctSets,
}

/// Walks a block range and extracts a wallet's activity metrics.
///
/// The unit of failure is one block: if its body, a receipt, or its logs
/// cannot be fetched, that block contributes nothing and the scan moves on.
/// Block contributions are sums and set unions, so the result does not
/// depend on block order.
pub struct BlockScanner {
    ledger: Arc<dyn Ledger>,
    classifier: TokenClassifier,
    retry: RetryPolicy,
    transfer_scope: TransferScope,
    progress_interval: u64,
}

impl BlockScanner {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        retry: RetryPolicy,
        transfer_scope: TransferScope,
        progress_interval: u64,
    ) -> Self {
        Self {
            classifier: TokenClassifier::new(ledger.clone()),
            ledger,
            retry,
            transfer_scope,
            progress_interval: progress_interval.max(1),
        }
    }

    /// Scan `window` for `address`. Returns `None` for an empty window.
    pub async fn scan(&self, address: Address, window: ScanWindow) -> Option<ScanReport> {
        if window.is_empty() {
            return None;
        }

        info!(
            "Scanning {} blocks [{}, {}] for {}",
            window.len(),
            window.start_block,
            window.end_block,
            address
        );

        let mut delta = WalletMetrics::default();
        let mut sets = DistinctSets::default();
        let mut diagnostics = ScanDiagnostics::default();
        let mut classified: FxHashMap<Address, TokenKind> = FxHashMap::default();

        for number in window.start_block..=window.end_block {
            match self
                .scan_block(address, number, &mut classified, &mut diagnostics)
                .await
            {
                Ok(contribution) => {
                    delta = delta.aggregate(&contribution.metrics);
                    sets.merge(contribution.sets);
                    diagnostics.blocks_processed += 1;
                },
                Err(e) => {
                    warn!("Skipping block {} while scanning {}: {:#}", number, address, e);
                    diagnostics.skipped_blocks.push(SkippedBlock {
                        block: number,
                        reason: format!("{:#}", e),
                    });
                },
            }

            let done = number - window.start_block + 1;
            if done % self.progress_interval == 0 && number != window.end_block {
                info!(
                    "Scan progress for {}: {}/{} blocks ({} skipped)",
                    address,
                    done,
                    window.len(),
                    diagnostics.skipped_blocks.len()
                );
            }
        }

        delta.contracts_created_count = sets.contracts_created.len() as u64;
        delta.distinct_erc20_count = sets.erc20_tokens.len() as u64;
        delta.distinct_nft_count = sets.nft_tokens.len() as u64;
        delta.active_days_count = sets.active_days.len() as u64;

        info!(
            "Scan of {} done: {} txs, {} blocks skipped, {} probe failures",
            address,
            delta.total_txs,
            diagnostics.skipped_blocks.len(),
            diagnostics.probe_failures
        );

        Some(ScanReport {
            window,
            delta,
            sets,
            diagnostics,
        })
    }

    async fn scan_block(
        &self,
        address: Address,
        number: u64,
        classified: &mut FxHashMap<Address, TokenKind>,
        diagnostics: &mut ScanDiagnostics,
    ) -> anyhow::Result<BlockContribution> {
        let ledger = self.ledger.as_ref();
        let block = self
            .retry
            .run("block fetch", move || ledger.block(number, true))
            .await
            .context("Failed to fetch block")?;

        let day = utc_day(block.timestamp);
        let mut contribution = BlockContribution::default();
        let metrics = &mut contribution.metrics;

        for tx in &block.transactions {
            let outgoing = tx.from == address;
            let incoming = tx.to == Some(address);
            if !outgoing && !incoming {
                continue;
            }

            metrics.total_txs += 1;
            if let Some(day) = day {
                contribution.sets.active_days.insert(day);
            }

            let receipt = ledger
                .transaction_receipt(tx.hash)
                .await
                .with_context(|| format!("Failed to fetch receipt of {}", tx.hash))?;

            metrics.gas_used = metrics.gas_used.saturating_add(receipt.gas_used);
            metrics.fee_paid = metrics
                .fee_paid
                .saturating_add((receipt.gas_used as u128).saturating_mul(tx.gas_price));

            if outgoing {
                metrics.tx_out += 1;
                if tx.to.is_none() {
                    if let Some(created) = receipt.contract_address {
                        contribution.sets.contracts_created.insert(created);
                    }
                }
            }
            if incoming {
                metrics.tx_in += 1;
            }
            if !receipt.success {
                metrics.failed_txs += 1;
            }
        }

        let logs = ledger
            .logs(number, number, Transfer::SIGNATURE_HASH)
            .await
            .context("Failed to fetch transfer logs")?;

        let wallet_topic = address.into_word();
        for log in logs
            .iter()
            .filter(|log| self.in_scope(log, &wallet_topic))
        {
            let kind = match classified.get(&log.address) {
                Some(kind) => *kind,
                None => {
                    let classification =
                        self.classifier.classify(log.address, log.block_number).await;
                    if classification.probe_failed {
                        diagnostics.probe_failures += 1;
                    }
                    classified.insert(log.address, classification.kind);
                    classification.kind
                },
            };

            match kind {
                TokenKind::Nft => contribution.sets.nft_tokens.insert(log.address),
                TokenKind::Fungible => contribution.sets.erc20_tokens.insert(log.address),
            };
        }

        Ok(contribution)
    }

    fn in_scope(&self, log: &LedgerLog, wallet_topic: &B256) -> bool {
        match self.transfer_scope {
            TransferScope::Block => true,
            // topics: [signature, from, to]
            TransferScope::Wallet => log
                .topics
                .iter()
                .skip(1)
                .take(2)
                .any(|topic| topic == wallet_topic),
        }
    }
}
