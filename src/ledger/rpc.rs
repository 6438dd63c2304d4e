use std::future::IntoFuture;
use std::time::Duration;

use alloy::{
    consensus::Transaction as _,
    eips::BlockId,
    primitives::{Address, Bytes, TxHash, B256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::{Filter, TransactionRequest},
};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use log::info;
use url::Url;

use crate::config::RpcSettings;
use crate::ledger::{Ledger, LedgerBlock, LedgerLog, LedgerReceipt, LedgerTransaction};

/// [`Ledger`] backed by a JSON-RPC node over HTTP.
#[derive(Clone)]
pub struct RpcLedger {
    provider: DynProvider,
    chain_id: u64,
    request_timeout: Duration,
}

impl RpcLedger {
    /// Connect and verify the node answers before handing out the client.
    pub async fn connect(settings: &RpcSettings) -> anyhow::Result<Self> {
        let url = Url::parse(&settings.url).context("Invalid RPC URL")?;

        let client = ProviderBuilder::new().connect_http(url);
        let provider = DynProvider::new(client);
        let request_timeout = Duration::from_secs(settings.request_timeout_secs);

        let chain_id = tokio::time::timeout(request_timeout, provider.get_chain_id())
            .await
            .context("eth_chainId timeout")?
            .context("Failed to reach ledger node")?;

        info!("Connected to ledger node {} (chain id {})", settings.url, chain_id);

        Ok(Self {
            provider,
            chain_id,
            request_timeout,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Await an RPC call with the configured request timeout.
    async fn timed<F, T, E>(&self, method: &str, request: F) -> anyhow::Result<T>
    where
        F: IntoFuture<Output = Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        tokio::time::timeout(self.request_timeout, request)
            .await
            .map_err(|_| anyhow!("{} timed out after {:?}", method, self.request_timeout))?
            .with_context(|| format!("{} failed", method))
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn chain_head(&self) -> anyhow::Result<u64> {
        self.timed("eth_blockNumber", self.provider.get_block_number())
            .await
    }

    async fn block(&self, number: u64, include_transactions: bool) -> anyhow::Result<LedgerBlock> {
        let mut request = self.provider.get_block_by_number(number.into());
        if include_transactions {
            request = request.full();
        }

        let block = self
            .timed("eth_getBlockByNumber", request)
            .await?
            .ok_or_else(|| anyhow!("Block {} not found", number))?;

        let transactions = block
            .transactions
            .txns()
            .map(|tx| LedgerTransaction {
                hash: *tx.inner.tx_hash(),
                from: tx.inner.signer(),
                to: tx.to(),
                gas_price: tx
                    .effective_gas_price
                    .or_else(|| tx.gas_price())
                    .unwrap_or_else(|| tx.max_fee_per_gas()),
            })
            .collect();

        Ok(LedgerBlock {
            number,
            timestamp: block.header.timestamp,
            transactions,
        })
    }

    async fn transaction_receipt(&self, hash: TxHash) -> anyhow::Result<LedgerReceipt> {
        let receipt = self
            .timed(
                "eth_getTransactionReceipt",
                self.provider.get_transaction_receipt(hash),
            )
            .await?
            .ok_or_else(|| anyhow!("Receipt for {} not found", hash))?;

        Ok(LedgerReceipt {
            gas_used: receipt.gas_used,
            success: receipt.status(),
            contract_address: receipt.contract_address,
        })
    }

    async fn transaction_count(&self, address: Address, at_block: u64) -> anyhow::Result<u64> {
        self.timed(
            "eth_getTransactionCount",
            self.provider
                .get_transaction_count(address)
                .block_id(BlockId::number(at_block)),
        )
        .await
    }

    async fn logs(
        &self,
        from_block: u64,
        to_block: u64,
        topic0: B256,
    ) -> anyhow::Result<Vec<LedgerLog>> {
        let filter = Filter::new()
            .from_block(from_block)
            .to_block(to_block)
            .event_signature(topic0);

        let logs = self
            .timed("eth_getLogs", self.provider.get_logs(&filter))
            .await?;

        Ok(logs
            .iter()
            .map(|log| LedgerLog {
                address: log.address(),
                block_number: log.block_number.unwrap_or(from_block),
                topics: log.topics().to_vec(),
            })
            .collect())
    }

    async fn call(&self, to: Address, data: Bytes, at_block: u64) -> anyhow::Result<Bytes> {
        let tx = TransactionRequest::default().to(to).input(data.into());

        self.timed(
            "eth_call",
            self.provider.call(tx).block(BlockId::number(at_block)),
        )
        .await
    }
}
