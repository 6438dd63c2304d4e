use alloy::sol;

sol! {
    /// Owner-gated keyed cache holding per-wallet metrics.
    ///
    /// `metrics` follows the fixed field order in
    /// [`METRIC_FIELDS`](crate::analysis::metrics::METRIC_FIELDS).
    #[sol(rpc)]
    interface IWalletDataCache {
        function getWalletData(address wallet) external view returns (uint256[11] memory metrics, uint256 lastBlock);
        function updateWalletData(address wallet, uint256[11] calldata metrics, uint256 newBlock) external;
        function owner() external view returns (address);
    }
}
