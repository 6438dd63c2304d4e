pub mod abis;
pub mod analysis;
pub mod cache;
pub mod config;
pub mod errors;
pub mod ledger;
pub mod reputation;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use analysis::{AnalysisReport, WalletAnalysis, WalletAnalyzer};
pub use cache::{CacheStore, ContractCacheStore};
pub use config::Settings;
pub use errors::{AnalysisError, ScoreError};
pub use ledger::{Ledger, RpcLedger};
pub use reputation::{calculate_reputation, ScoreWeights};
