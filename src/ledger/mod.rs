//! Ledger client adapter.
//!
//! The analysis core talks to the node only through the [`Ledger`] trait and
//! the plain value types below, so it can be driven by [`RpcLedger`] in
//! production and by an in-memory ledger in tests.

use alloy::primitives::{Address, Bytes, TxHash, B256};
use async_trait::async_trait;

pub mod rpc;

pub use rpc::RpcLedger;

/// A block as seen by the scanner.
///
/// `transactions` is empty when the block was fetched without bodies.
#[derive(Debug, Clone, Default)]
pub struct LedgerBlock {
    pub number: u64,
    pub timestamp: u64,
    pub transactions: Vec<LedgerTransaction>,
}

#[derive(Debug, Clone)]
pub struct LedgerTransaction {
    pub hash: TxHash,
    pub from: Address,
    /// `None` for contract creation
    pub to: Option<Address>,
    /// Price actually paid per unit of gas, in wei
    pub gas_price: u128,
}

#[derive(Debug, Clone)]
pub struct LedgerReceipt {
    pub gas_used: u64,
    pub success: bool,
    pub contract_address: Option<Address>,
}

#[derive(Debug, Clone)]
pub struct LedgerLog {
    pub address: Address,
    pub block_number: u64,
    pub topics: Vec<B256>,
}

/// Read operations the analysis needs from a ledger node.
///
/// Every call is independent; implementations hold no state beyond their
/// connection handle.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Most recent block number.
    async fn chain_head(&self) -> anyhow::Result<u64>;

    /// Fetch a block, optionally with full transaction bodies.
    async fn block(&self, number: u64, include_transactions: bool) -> anyhow::Result<LedgerBlock>;

    async fn transaction_receipt(&self, hash: TxHash) -> anyhow::Result<LedgerReceipt>;

    /// Nonce of `address` as of block `at_block`.
    async fn transaction_count(&self, address: Address, at_block: u64) -> anyhow::Result<u64>;

    /// Logs in `[from_block, to_block]` whose topic0 equals `topic0`.
    async fn logs(
        &self,
        from_block: u64,
        to_block: u64,
        topic0: B256,
    ) -> anyhow::Result<Vec<LedgerLog>>;

    /// Static call against historical state at `at_block`.
    async fn call(&self, to: Address, data: Bytes, at_block: u64) -> anyhow::Result<Bytes>;
}
