//! Cache store adapter.
//!
//! The authoritative per-wallet record (metrics plus last analyzed block)
//! lives outside this process. Reads are open; writes need the owner's
//! signing key.

use alloy::primitives::{Address, TxHash};
use async_trait::async_trait;
use log::warn;

use crate::analysis::metrics::{CacheRecord, WalletMetrics};

pub mod contract;

pub use contract::ContractCacheStore;

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Current record for `wallet`, `None` if it was never committed.
    async fn read(&self, wallet: Address) -> anyhow::Result<Option<CacheRecord>>;

    /// Replace the record for `wallet` and wait for it to be confirmed.
    async fn write(
        &self,
        wallet: Address,
        metrics: &WalletMetrics,
        new_block: u64,
    ) -> anyhow::Result<TxHash>;

    /// Whether signing credentials are available for [`CacheStore::write`].
    fn can_write(&self) -> bool;

    /// Startup check that the store answers.
    async fn verify(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Run [`CacheStore::verify`] and log a failure instead of returning it.
///
/// An unreachable store only means every analysis starts cold, so it never
/// stops the caller. Returns whether the check passed.
pub async fn check_store(store: &dyn CacheStore) -> bool {
    match store.verify().await {
        Ok(()) => true,
        Err(e) => {
            warn!("Cache store check failed, analyses will start cold: {:#}", e);
            false
        },
    }
}
