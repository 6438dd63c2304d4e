use alloy::primitives::U256;
use serde::Serialize;

use crate::utils::{serialize_as_string, u256_to_u128, u256_to_u64};

/// Field order of the metrics tuple stored in the cache contract.
///
/// This is a wire contract shared with the deployed cache; reordering it
/// requires migrating every stored record.
pub const METRIC_FIELDS: [&str; 11] = [
    "txIn",
    "txOut",
    "totalTxs",
    "failedTxs",
    "gasUsed",
    "feePaid",
    "contractsCreatedCount",
    "distinctErc20Count",
    "distinctNftCount",
    "activeDaysCount",
    "firstTxTimestamp",
];

/// Accumulated on-chain activity of a wallet.
///
/// `total_txs` counts distinct relevant transactions while `tx_in`/`tx_out`
/// count direction, so a self-transfer adds one to each of the three.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletMetrics {
    pub tx_in: u64,
    pub tx_out: u64,
    pub total_txs: u64,
    pub failed_txs: u64,
    #[serde(serialize_with = "serialize_as_string")]
    pub gas_used: u64,
    /// Wei
    #[serde(serialize_with = "serialize_as_string")]
    pub fee_paid: u128,
    pub contracts_created_count: u64,
    pub distinct_erc20_count: u64,
    pub distinct_nft_count: u64,
    pub active_days_count: u64,
    /// Unix seconds of the first outgoing transaction, 0 when unknown
    pub first_tx_timestamp: u64,
}

impl WalletMetrics {
    /// Encode in [`METRIC_FIELDS`] order.
    pub fn to_wire(&self) -> [U256; 11] {
        [
            U256::from(self.tx_in),
            U256::from(self.tx_out),
            U256::from(self.total_txs),
            U256::from(self.failed_txs),
            U256::from(self.gas_used),
            U256::from(self.fee_paid),
            U256::from(self.contracts_created_count),
            U256::from(self.distinct_erc20_count),
            U256::from(self.distinct_nft_count),
            U256::from(self.active_days_count),
            U256::from(self.first_tx_timestamp),
        ]
    }

    /// Decode from [`METRIC_FIELDS`] order. Fails if a word overflows its field.
    pub fn from_wire(words: &[U256; 11]) -> anyhow::Result<Self> {
        Ok(Self {
            tx_in: u256_to_u64(words[0])?,
            tx_out: u256_to_u64(words[1])?,
            total_txs: u256_to_u64(words[2])?,
            failed_txs: u256_to_u64(words[3])?,
            gas_used: u256_to_u64(words[4])?,
            fee_paid: u256_to_u128(words[5])?,
            contracts_created_count: u256_to_u64(words[6])?,
            distinct_erc20_count: u256_to_u64(words[7])?,
            distinct_nft_count: u256_to_u64(words[8])?,
            active_days_count: u256_to_u64(words[9])?,
            first_tx_timestamp: u256_to_u64(words[10])?,
        })
    }

    /// Transactions counted towards volume when scoring.
    pub fn successful_txs(&self) -> u64 {
        self.tx_in.saturating_add(self.tx_out)
    }

    /// Merge a freshly scanned delta on top of cached base metrics.
    ///
    /// Every counter is summed. `first_tx_timestamp` is first-write-wins: the
    /// cached value is kept once non-zero.
    pub fn aggregate(&self, delta: &WalletMetrics) -> WalletMetrics {
        WalletMetrics {
            tx_in: self.tx_in.saturating_add(delta.tx_in),
            tx_out: self.tx_out.saturating_add(delta.tx_out),
            total_txs: self.total_txs.saturating_add(delta.total_txs),
            failed_txs: self.failed_txs.saturating_add(delta.failed_txs),
            gas_used: self.gas_used.saturating_add(delta.gas_used),
            fee_paid: self.fee_paid.saturating_add(delta.fee_paid),
            contracts_created_count: self
                .contracts_created_count
                .saturating_add(delta.contracts_created_count),
            distinct_erc20_count: self
                .distinct_erc20_count
                .saturating_add(delta.distinct_erc20_count),
            distinct_nft_count: self
                .distinct_nft_count
                .saturating_add(delta.distinct_nft_count),
            active_days_count: self
                .active_days_count
                .saturating_add(delta.active_days_count),
            first_tx_timestamp: if self.first_tx_timestamp != 0 {
                self.first_tx_timestamp
            } else {
                delta.first_tx_timestamp
            },
        }
    }
}

/// A wallet's entry in the cache store.
///
/// `last_block_analyzed == 0` means no record exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRecord {
    pub metrics: WalletMetrics,
    pub last_block_analyzed: u64,
}

impl CacheRecord {
    pub fn new(metrics: WalletMetrics, last_block_analyzed: u64) -> Self {
        Self {
            metrics,
            last_block_analyzed,
        }
    }

    pub fn is_absent(&self) -> bool {
        self.last_block_analyzed == 0
    }
}

/// Inclusive block range to scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanWindow {
    pub start_block: u64,
    pub end_block: u64,
}

impl ScanWindow {
    pub fn new(start_block: u64, end_block: u64) -> Self {
        Self {
            start_block,
            end_block,
        }
    }

    /// A window with `start_block > end_block` is empty and scanning it is a no-op.
    pub fn is_empty(&self) -> bool {
        self.start_block > self.end_block
    }

    pub fn len(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            self.end_block - self.start_block + 1
        }
    }
}
