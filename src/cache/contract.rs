use std::time::Duration;

use alloy::{
    network::EthereumWallet,
    primitives::{Address, TxHash, U256},
    providers::{DynProvider, ProviderBuilder},
    signers::local::PrivateKeySigner,
};
use anyhow::{bail, Context};
use async_trait::async_trait;
use log::{info, warn};
use url::Url;

use crate::{
    abis::wallet_cache::IWalletDataCache::{self, IWalletDataCacheInstance},
    analysis::metrics::{CacheRecord, WalletMetrics},
    cache::CacheStore,
    config::CacheSettings,
    utils::u256_to_u64,
};

/// Owner-side handle for the write path.
struct CacheWriter {
    owner: Address,
    contract: IWalletDataCacheInstance<DynProvider>,
}

/// [`CacheStore`] backed by the `IWalletDataCache` contract.
///
/// Reads go through a plain provider. When an owner key is configured, writes
/// go through a provider with a wallet filler that signs and submits the
/// update, then wait for its receipt up to `commit_timeout`.
pub struct ContractCacheStore {
    contract: IWalletDataCacheInstance<DynProvider>,
    writer: Option<CacheWriter>,
    commit_timeout: Duration,
    gas_limit: u64,
}

impl ContractCacheStore {
    pub fn new(settings: &CacheSettings, rpc_url: &str) -> anyhow::Result<Self> {
        let url = Url::parse(rpc_url).context("Invalid RPC URL")?;
        let address: Address = settings
            .contract_address
            .parse()
            .context("Invalid cache contract address")?;

        let reader = DynProvider::new(ProviderBuilder::new().connect_http(url.clone()));
        let contract = IWalletDataCache::new(address, reader);

        let writer = match settings.owner_private_key.as_deref() {
            Some(key) if !key.trim().is_empty() => {
                let signer: PrivateKeySigner =
                    key.trim().parse().context("Invalid owner private key")?;
                let owner = signer.address();
                let provider = ProviderBuilder::new()
                    .wallet(EthereumWallet::from(signer))
                    .connect_http(url);

                Some(CacheWriter {
                    owner,
                    contract: IWalletDataCache::new(address, DynProvider::new(provider)),
                })
            },
            _ => {
                warn!("No owner key configured, cache contract is read-only");
                None
            },
        };

        Ok(Self {
            contract,
            writer,
            commit_timeout: Duration::from_secs(settings.commit_timeout_secs),
            gas_limit: settings.gas_limit,
        })
    }

    pub fn address(&self) -> Address {
        *self.contract.address()
    }
}

#[async_trait]
impl CacheStore for ContractCacheStore {
    async fn read(&self, wallet: Address) -> anyhow::Result<Option<CacheRecord>> {
        let data = self
            .contract
            .getWalletData(wallet)
            .call()
            .await
            .context("getWalletData call failed")?;

        let last_block = u256_to_u64(data.lastBlock).context("Invalid lastBlock in cache")?;
        if last_block == 0 {
            return Ok(None);
        }

        let metrics = WalletMetrics::from_wire(&data.metrics).context("Invalid cached metrics")?;

        Ok(Some(CacheRecord::new(metrics, last_block)))
    }

    async fn write(
        &self,
        wallet: Address,
        metrics: &WalletMetrics,
        new_block: u64,
    ) -> anyhow::Result<TxHash> {
        let Some(writer) = &self.writer else {
            bail!("No owner key configured for cache writes");
        };

        let pending = writer
            .contract
            .updateWalletData(wallet, metrics.to_wire(), U256::from(new_block))
            .gas(self.gas_limit)
            .send()
            .await
            .context("Failed to submit cache update")?;

        let tx_hash = *pending.tx_hash();
        info!("Submitted cache update for {} up to block {} (tx {})", wallet, new_block, tx_hash);

        let receipt = pending
            .with_timeout(Some(self.commit_timeout))
            .get_receipt()
            .await
            .with_context(|| format!("Cache update {} not confirmed", tx_hash))?;

        if !receipt.status() {
            bail!("Cache update {} reverted", tx_hash);
        }

        Ok(tx_hash)
    }

    fn can_write(&self) -> bool {
        self.writer.is_some()
    }

    /// Check the contract answers and, when writing is enabled, that the
    /// configured key is its owner.
    async fn verify(&self) -> anyhow::Result<()> {
        let owner = self
            .contract
            .owner()
            .call()
            .await
            .context("Failed to query cache contract owner")?;

        match &self.writer {
            Some(writer) if writer.owner != owner => {
                warn!(
                    "Configured key {} is not the cache owner {}, commits will revert",
                    writer.owner, owner
                );
            },
            Some(writer) => info!("Cache contract {} owned by {} (writable)", self.address(), writer.owner),
            None => info!("Cache contract {} owned by {} (read-only)", self.address(), owner),
        }

        Ok(())
    }
}
