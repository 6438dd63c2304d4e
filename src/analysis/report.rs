use serde::Serialize;

use crate::{
    analysis::{
        analyzer::{AnalysisDiagnostics, AnalysisStatus, CommitOutcome, WalletAnalysis},
        locator::FirstActivity,
        metrics::{ScanWindow, WalletMetrics},
    },
    reputation::ReputationScore,
};

/// JSON response for one analyzed wallet.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// EIP-55 checksummed
    pub wallet_address: String,
    pub last_block_analyzed: u64,
    pub metrics: WalletMetrics,
    pub status: AnalysisStatus,
    pub message: String,
    pub commit: CommitOutcome,
    pub diagnostics: AnalysisDiagnostics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanned: Option<ScanWindow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_activity: Option<FirstActivity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reputation: Option<ReputationScore>,
}

impl AnalysisReport {
    pub fn new(analysis: &WalletAnalysis, reputation: Option<ReputationScore>) -> Self {
        Self {
            wallet_address: analysis.wallet.to_checksum(None),
            last_block_analyzed: analysis.last_block_analyzed,
            metrics: analysis.metrics,
            status: analysis.status,
            message: message(analysis),
            commit: analysis.commit.clone(),
            diagnostics: analysis.diagnostics.clone(),
            scanned: analysis.window,
            first_activity: analysis.first_activity,
            reputation,
        }
    }
}

fn message(analysis: &WalletAnalysis) -> String {
    let summary = match analysis.status {
        AnalysisStatus::NoActivity => "No outgoing transactions found",
        AnalysisStatus::Analyzed => "Analysis complete",
    };

    let commit = match &analysis.commit {
        CommitOutcome::NotRequested => return format!("{}.", summary),
        CommitOutcome::NothingToCommit => "On-chain cache already up to date".to_string(),
        CommitOutcome::Skipped => "On-chain update skipped (no signing credentials)".to_string(),
        CommitOutcome::Committed { tx_hash } => format!("On-chain update committed in {}", tx_hash),
        CommitOutcome::Conflict { found_block, .. } => format!(
            "On-chain update not committed, cache advanced to block {} concurrently",
            found_block
        ),
        CommitOutcome::Failed { reason } => format!("On-chain update failed: {}", reason),
    };

    format!("{}. {}.", summary, commit)
}
