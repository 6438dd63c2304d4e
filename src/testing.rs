//! In-memory ledger and cache store for unit tests.

use std::sync::Mutex;

use alloy::{
    primitives::{Address, Bytes, TxHash, B256, U256},
    sol_types::SolEvent,
};
use anyhow::{anyhow, bail};
use async_trait::async_trait;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    abis::Transfer,
    analysis::metrics::{CacheRecord, WalletMetrics},
    cache::CacheStore,
    ledger::{Ledger, LedgerBlock, LedgerLog, LedgerReceipt, LedgerTransaction},
};

/// 2024-01-01T00:00:00Z
pub(crate) const BASE_TIMESTAMP: u64 = 1_704_067_200;

/// Seconds between consecutive mock blocks. 24 blocks make one UTC day.
pub(crate) const BLOCK_TIME: u64 = 3_600;

pub(crate) fn addr(n: u8) -> Address {
    Address::with_last_byte(n)
}

pub(crate) fn hash(n: u64) -> TxHash {
    B256::from(U256::from(n))
}

#[derive(Default)]
struct LedgerState {
    head: u64,
    txs: FxHashMap<u64, Vec<LedgerTransaction>>,
    receipts: FxHashMap<TxHash, LedgerReceipt>,
    logs: FxHashMap<u64, Vec<LedgerLog>>,
    first_outgoing: FxHashMap<Address, u64>,
    nfts: FxHashSet<Address>,
    failing_probes: FxHashSet<Address>,
    failing_blocks: FxHashSet<u64>,
    failing_receipts: FxHashSet<TxHash>,
    failing_logs: FxHashSet<u64>,
    /// Remaining failures per probed block, `u32::MAX` never recovers
    nonce_failures: FxHashMap<u64, u32>,
    unreachable: bool,
    block_calls: u64,
    nonce_calls: u64,
    probe_calls: u64,
    /// Token and block of every capability call, in call order
    probes: Vec<(Address, u64)>,
}

/// Deterministic chain where block `n` is mined at
/// `BASE_TIMESTAMP + n * BLOCK_TIME`. Every builder method takes `&self`
/// so a ledger can be reshaped after being shared.
#[derive(Default)]
pub(crate) struct MockLedger {
    state: Mutex<LedgerState>,
}

impl MockLedger {
    /// Blocks `0..=head`, all empty.
    pub fn with_empty_blocks(head: u64) -> Self {
        let ledger = Self::default();
        ledger.set_head(head);
        ledger
    }

    pub fn timestamp_of(block: u64) -> u64 {
        BASE_TIMESTAMP + block * BLOCK_TIME
    }

    fn state(&self) -> std::sync::MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap()
    }

    pub fn set_head(&self, head: u64) {
        self.state().head = head;
    }

    /// Make the nonce of `wallet` non-zero from `block` onwards.
    pub fn set_first_outgoing(&self, wallet: Address, block: u64) {
        self.state().first_outgoing.insert(wallet, block);
    }

    /// Fail the next `times` nonce probes at `block`.
    pub fn fail_nonce_at(&self, block: u64, times: u32) {
        self.state().nonce_failures.insert(block, times);
    }

    /// Add a transaction and its receipt. An outgoing transaction also moves
    /// the sender's first-activity block back if it is earlier.
    #[allow(clippy::too_many_arguments)]
    pub fn add_tx(
        &self,
        block: u64,
        hash: TxHash,
        from: Address,
        to: Option<Address>,
        gas_price: u128,
        gas_used: u64,
        success: bool,
        contract_address: Option<Address>,
    ) {
        let mut state = self.state();
        state.txs.entry(block).or_default().push(LedgerTransaction {
            hash,
            from,
            to,
            gas_price,
        });
        state.receipts.insert(
            hash,
            LedgerReceipt {
                gas_used,
                success,
                contract_address,
            },
        );
        let first = state.first_outgoing.entry(from).or_insert(block);
        *first = (*first).min(block);
    }

    pub fn add_transfer_log(&self, block: u64, token: Address, from: Address, to: Address) {
        self.state().logs.entry(block).or_default().push(LedgerLog {
            address: token,
            block_number: block,
            topics: vec![Transfer::SIGNATURE_HASH, from.into_word(), to.into_word()],
        });
    }

    pub fn mark_nft(&self, token: Address) {
        self.state().nfts.insert(token);
    }

    pub fn fail_probe(&self, token: Address) {
        self.state().failing_probes.insert(token);
    }

    pub fn fail_block(&self, block: u64) {
        self.state().failing_blocks.insert(block);
    }

    pub fn unfail_block(&self, block: u64) {
        self.state().failing_blocks.remove(&block);
    }

    pub fn fail_receipt(&self, hash: TxHash) {
        self.state().failing_receipts.insert(hash);
    }

    pub fn fail_logs(&self, block: u64) {
        self.state().failing_logs.insert(block);
    }

    /// Every call fails, as if the node went away.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state().unreachable = unreachable;
    }

    pub fn block_calls(&self) -> u64 {
        self.state().block_calls
    }

    pub fn nonce_calls(&self) -> u64 {
        self.state().nonce_calls
    }

    pub fn probe_calls(&self) -> u64 {
        self.state().probe_calls
    }

    pub fn probes(&self) -> Vec<(Address, u64)> {
        self.state().probes.clone()
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn chain_head(&self) -> anyhow::Result<u64> {
        let state = self.state();
        if state.unreachable {
            bail!("connection refused");
        }
        Ok(state.head)
    }

    async fn block(&self, number: u64, include_transactions: bool) -> anyhow::Result<LedgerBlock> {
        let mut state = self.state();
        if state.unreachable {
            bail!("connection refused");
        }
        state.block_calls += 1;
        if number > state.head {
            bail!("block {} not found", number);
        }
        if state.failing_blocks.contains(&number) {
            bail!("block {} unavailable", number);
        }

        let transactions = if include_transactions {
            state.txs.get(&number).cloned().unwrap_or_default()
        } else {
            Vec::new()
        };

        Ok(LedgerBlock {
            number,
            timestamp: Self::timestamp_of(number),
            transactions,
        })
    }

    async fn transaction_receipt(&self, hash: TxHash) -> anyhow::Result<LedgerReceipt> {
        let state = self.state();
        if state.unreachable || state.failing_receipts.contains(&hash) {
            bail!("receipt of {} unavailable", hash);
        }
        state
            .receipts
            .get(&hash)
            .cloned()
            .ok_or_else(|| anyhow!("unknown transaction {}", hash))
    }

    async fn transaction_count(&self, address: Address, at_block: u64) -> anyhow::Result<u64> {
        let mut state = self.state();
        if state.unreachable {
            bail!("connection refused");
        }
        state.nonce_calls += 1;

        if let Some(remaining) = state.nonce_failures.get_mut(&at_block) {
            if *remaining > 0 {
                if *remaining != u32::MAX {
                    *remaining -= 1;
                }
                bail!("nonce probe at {} timed out", at_block);
            }
        }

        Ok(match state.first_outgoing.get(&address) {
            Some(first) if at_block >= *first => 1,
            _ => 0,
        })
    }

    async fn logs(
        &self,
        from_block: u64,
        to_block: u64,
        topic0: B256,
    ) -> anyhow::Result<Vec<LedgerLog>> {
        let state = self.state();
        if state.unreachable {
            bail!("connection refused");
        }
        if (from_block..=to_block).any(|block| state.failing_logs.contains(&block)) {
            bail!("logs for [{}, {}] unavailable", from_block, to_block);
        }

        Ok((from_block..=to_block)
            .filter_map(|block| state.logs.get(&block))
            .flatten()
            .filter(|log| log.topics.first() == Some(&topic0))
            .cloned()
            .collect())
    }

    async fn call(&self, to: Address, _data: Bytes, at_block: u64) -> anyhow::Result<Bytes> {
        let mut state = self.state();
        if state.unreachable {
            bail!("connection refused");
        }
        state.probe_calls += 1;
        state.probes.push((to, at_block));
        if state.failing_probes.contains(&to) {
            bail!("execution reverted");
        }

        let mut word = [0u8; 32];
        word[31] = u8::from(state.nfts.contains(&to));
        Ok(Bytes::copy_from_slice(&word))
    }
}

#[derive(Default)]
struct CacheState {
    records: FxHashMap<Address, CacheRecord>,
    read_only: bool,
    /// Reads left that fail before reads recover
    failing_reads: u32,
    failing_writes: bool,
    failing_verify: bool,
    /// Another writer lands this record just before read number `.0` returns
    interference: Option<(u64, Address, CacheRecord)>,
    reads: u64,
    writes: u64,
}

/// [`CacheStore`] over a hash map.
#[derive(Default)]
pub(crate) struct MemoryCacheStore {
    state: Mutex<CacheState>,
}

impl MemoryCacheStore {
    fn state(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state.lock().unwrap()
    }

    pub fn read_only() -> Self {
        let store = Self::default();
        store.state().read_only = true;
        store
    }

    pub fn insert(&self, wallet: Address, record: CacheRecord) {
        self.state().records.insert(wallet, record);
    }

    pub fn record(&self, wallet: Address) -> Option<CacheRecord> {
        self.state().records.get(&wallet).copied()
    }

    pub fn fail_reads(&self, times: u32) {
        self.state().failing_reads = times;
    }

    pub fn fail_writes(&self) {
        self.state().failing_writes = true;
    }

    pub fn fail_verify(&self) {
        self.state().failing_verify = true;
    }

    /// Simulate a concurrent committer: `record` replaces the stored one
    /// right before the `nth` read (1-based) is served.
    pub fn interfere_on_read(&self, nth: u64, wallet: Address, record: CacheRecord) {
        self.state().interference = Some((nth, wallet, record));
    }

    pub fn reads(&self) -> u64 {
        self.state().reads
    }

    pub fn writes(&self) -> u64 {
        self.state().writes
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn read(&self, wallet: Address) -> anyhow::Result<Option<CacheRecord>> {
        let mut state = self.state();
        state.reads += 1;

        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            bail!("cache node unreachable");
        }

        if let Some((nth, target, record)) = state.interference {
            if nth == state.reads {
                state.records.insert(target, record);
                state.interference = None;
            }
        }

        Ok(state
            .records
            .get(&wallet)
            .copied()
            .filter(|record| !record.is_absent()))
    }

    async fn write(
        &self,
        wallet: Address,
        metrics: &WalletMetrics,
        new_block: u64,
    ) -> anyhow::Result<TxHash> {
        let mut state = self.state();
        if state.read_only {
            bail!("not the owner");
        }
        if state.failing_writes {
            bail!("update not confirmed before timeout");
        }

        state.writes += 1;
        state.records.insert(wallet, CacheRecord::new(*metrics, new_block));
        Ok(hash(1_000_000 + state.writes))
    }

    fn can_write(&self) -> bool {
        !self.state().read_only
    }

    async fn verify(&self) -> anyhow::Result<()> {
        if self.state().failing_verify {
            bail!("owner() reverted");
        }
        Ok(())
    }
}
