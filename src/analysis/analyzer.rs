use std::{sync::Arc, time::Duration};

use alloy::primitives::{Address, TxHash};
use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    analysis::{
        lease::WalletLeases,
        locator::{FirstActivity, FirstActivityLocator},
        metrics::{ScanWindow, WalletMetrics},
        scanner::{BlockScanner, ScanDiagnostics},
    },
    cache::CacheStore,
    config::ScannerSettings,
    errors::{AnalysisError, ScoreError},
    ledger::Ledger,
    reputation::{score_inputs, ReputationInputs, ReputationScore, ScoreWeights},
    utils::RetryPolicy,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Window scanned and metrics aggregated
    Analyzed,
    /// No outgoing transaction up to the chain head, nothing scanned
    NoActivity,
}

/// What happened to the cache update for this request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CommitOutcome {
    NotRequested,
    /// Nothing new since the cached record
    NothingToCommit,
    /// No signing credentials configured
    Skipped,
    Committed { tx_hash: TxHash },
    /// Another writer advanced the record after it was read
    Conflict { expected_block: u64, found_block: u64 },
    Failed { reason: String },
}

impl CommitOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitOutcome::Committed { .. })
    }

    /// A commit was tried and did not persist.
    pub fn is_failure(&self) -> bool {
        matches!(self, CommitOutcome::Conflict { .. } | CommitOutcome::Failed { .. })
    }
}

/// Everything that went wrong without failing the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisDiagnostics {
    /// The initial cache read failed and the analysis cold-started
    pub cache_read_failed: bool,
    /// Nonce probes that exhausted their retries
    pub failed_nonce_probes: u64,
    /// First activity was located but its block timestamp could not be
    /// fetched, `firstTxTimestamp` stays unset until a later run
    pub first_timestamp_unavailable: bool,
    pub scan: ScanDiagnostics,
}

/// Result of one analysis request.
#[derive(Debug, Clone)]
pub struct WalletAnalysis {
    pub wallet: Address,
    pub status: AnalysisStatus,
    /// Cached base plus the delta of this run
    pub metrics: WalletMetrics,
    pub last_block_analyzed: u64,
    pub chain_head: u64,
    pub head_timestamp: u64,
    /// Block range scanned by this run, `None` when nothing was scanned
    pub window: Option<ScanWindow>,
    /// Whether the run started from a cached record
    pub from_cache: bool,
    /// Set when the locator ran and found the first transaction
    pub first_activity: Option<FirstActivity>,
    pub commit: CommitOutcome,
    pub diagnostics: AnalysisDiagnostics,
}

impl WalletAnalysis {
    pub fn reputation_inputs(&self) -> Option<ReputationInputs> {
        ReputationInputs::from_metrics(&self.metrics, self.head_timestamp)
    }

    /// Score the aggregated metrics as of the chain head.
    ///
    /// `Ok(None)` for a wallet without activity.
    pub fn reputation(&self, weights: &ScoreWeights) -> Result<Option<ReputationScore>, ScoreError> {
        weights.validate()?;
        self.reputation_inputs()
            .map(|inputs| score_inputs(&inputs, weights))
            .transpose()
    }
}

/// Runs analysis requests against one ledger and one cache store.
///
/// Built once by the caller and shared across requests. Requests for the
/// same wallet are serialized by a per-wallet lease; requests for different
/// wallets run independently.
pub struct WalletAnalyzer {
    ledger: Arc<dyn Ledger>,
    cache: Arc<dyn CacheStore>,
    locator: FirstActivityLocator,
    scanner: BlockScanner,
    leases: WalletLeases,
}

impl WalletAnalyzer {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        cache: Arc<dyn CacheStore>,
        settings: &ScannerSettings,
    ) -> Self {
        let retry = RetryPolicy::new(
            settings.probe_attempts,
            Duration::from_millis(settings.retry_delay_ms),
        );

        Self {
            locator: FirstActivityLocator::new(ledger.clone(), retry),
            scanner: BlockScanner::new(
                ledger.clone(),
                retry,
                settings.transfer_scope,
                settings.progress_log_interval_blocks,
            ),
            ledger,
            cache,
            leases: WalletLeases::new(),
        }
    }

    /// Bring `wallet`'s metrics up to the current chain head.
    ///
    /// With `commit` set the result is written back to the cache store,
    /// provided something changed and credentials are available. Only an
    /// unreachable ledger fails the request; every other failure is recorded
    /// in the result.
    pub async fn analyze(
        &self,
        wallet: Address,
        commit: bool,
    ) -> Result<WalletAnalysis, AnalysisError> {
        let _lease = self.leases.acquire(wallet).await;

        let chain_head = self
            .ledger
            .chain_head()
            .await
            .map_err(|e| AnalysisError::Connectivity(format!("{:#}", e)))?;
        let head_timestamp = self
            .ledger
            .block(chain_head, false)
            .await
            .map_err(|e| AnalysisError::Connectivity(format!("{:#}", e)))?
            .timestamp;

        let mut diagnostics = AnalysisDiagnostics::default();

        let cached = match self.cache.read(wallet).await {
            Ok(record) => record,
            Err(e) => {
                warn!("Cache read for {} failed, starting cold: {:#}", wallet, e);
                diagnostics.cache_read_failed = true;
                None
            },
        };
        let base = cached.map(|r| r.metrics).unwrap_or_default();
        let base_block = cached.map(|r| r.last_block_analyzed).unwrap_or(0);
        debug!(
            "{}: head {}, cached up to block {}",
            wallet, chain_head, base_block
        );

        let mut first_activity = None;
        let mut located_block = None;
        if base.first_tx_timestamp == 0 {
            debug!("{}: locating first activity", wallet);
            let outcome = self.locator.locate(wallet, chain_head).await;
            diagnostics.failed_nonce_probes = outcome.failed_probes;
            diagnostics.first_timestamp_unavailable = outcome.timestamp_fetch_failed;
            first_activity = outcome.first_activity;
            located_block = outcome.located_block;
        }

        let start_block = match (cached, located_block) {
            (Some(record), _) => record.last_block_analyzed + 1,
            (None, Some(block)) => block,
            (None, None) => {
                info!("{} has no outgoing activity up to block {}", wallet, chain_head);
                return Ok(WalletAnalysis {
                    wallet,
                    status: AnalysisStatus::NoActivity,
                    metrics: base,
                    last_block_analyzed: base_block,
                    chain_head,
                    head_timestamp,
                    window: None,
                    from_cache: false,
                    first_activity: None,
                    commit: if commit {
                        CommitOutcome::NothingToCommit
                    } else {
                        CommitOutcome::NotRequested
                    },
                    diagnostics,
                });
            },
        };

        let window = ScanWindow::new(start_block, chain_head);
        let mut delta = WalletMetrics::default();
        if let Some(report) = self.scanner.scan(wallet, window).await {
            delta = report.delta;
            diagnostics.scan = report.diagnostics;
        }
        delta.first_tx_timestamp = first_activity.map(|f| f.timestamp).unwrap_or(0);

        let metrics = base.aggregate(&delta);
        let last_block_analyzed = if window.is_empty() { base_block } else { chain_head };
        debug!("{}: aggregated up to block {}", wallet, last_block_analyzed);

        let commit = if !commit {
            CommitOutcome::NotRequested
        } else if window.is_empty() && metrics == base {
            CommitOutcome::NothingToCommit
        } else if !self.cache.can_write() {
            info!("Skipping cache update for {}: no signing credentials", wallet);
            CommitOutcome::Skipped
        } else {
            self.commit(wallet, &metrics, base_block, last_block_analyzed)
                .await
        };

        Ok(WalletAnalysis {
            wallet,
            status: AnalysisStatus::Analyzed,
            metrics,
            last_block_analyzed,
            chain_head,
            head_timestamp,
            window: (!window.is_empty()).then_some(window),
            from_cache: cached.is_some(),
            first_activity,
            commit,
            diagnostics,
        })
    }

    /// Write `metrics` unless another writer moved the record past
    /// `expected_block` since it was read.
    async fn commit(
        &self,
        wallet: Address,
        metrics: &WalletMetrics,
        expected_block: u64,
        new_block: u64,
    ) -> CommitOutcome {
        let found_block = match self.cache.read(wallet).await {
            Ok(record) => record.map(|r| r.last_block_analyzed).unwrap_or(0),
            Err(e) => {
                warn!("Pre-commit cache read for {} failed: {:#}", wallet, e);
                return CommitOutcome::Failed {
                    reason: format!("pre-commit read failed: {:#}", e),
                };
            },
        };

        if found_block != expected_block {
            warn!(
                "Cache record of {} moved from block {} to {} during analysis, not committing",
                wallet, expected_block, found_block
            );
            return CommitOutcome::Conflict {
                expected_block,
                found_block,
            };
        }

        match self.cache.write(wallet, metrics, new_block).await {
            Ok(tx_hash) => {
                info!("Committed {} up to block {} (tx {})", wallet, new_block, tx_hash);
                CommitOutcome::Committed { tx_hash }
            },
            Err(e) => {
                warn!("Cache update for {} failed: {:#}", wallet, e);
                CommitOutcome::Failed {
                    reason: format!("{:#}", e),
                }
            },
        }
    }
}
