use std::sync::Arc;

use alloy::primitives::Address;
use rustc_hash::FxHashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Keyed exclusive leases, one per wallet.
///
/// Holding a wallet's lease guarantees at most one read-scan-write sequence
/// for that wallet is in flight in this process. Leases for different
/// wallets never block each other.
#[derive(Default)]
pub struct WalletLeases {
    locks: Mutex<FxHashMap<Address, Arc<Mutex<()>>>>,
}

/// Held for the duration of an analysis; released on drop.
pub struct WalletLease {
    _guard: OwnedMutexGuard<()>,
}

impl WalletLeases {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, wallet: Address) -> WalletLease {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Drop entries nobody holds or waits on
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(wallet).or_default().clone()
        };

        WalletLease {
            _guard: lock.lock_owned().await,
        }
    }
}
