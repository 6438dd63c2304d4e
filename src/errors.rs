use thiserror::Error;

/// Failures surfaced to the caller of an analysis request.
///
/// Per-block, per-receipt, per-probe and cache failures are recovered inside
/// the analysis and never show up here.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),

    /// The ledger node could not be reached at all
    #[error("Ledger connectivity failure: {0}")]
    Connectivity(String),
}

/// Rejected scoring configuration. Raised before any arithmetic is done.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoreError {
    #[error("Score weights must sum to 1.0, got {sum}")]
    InvalidWeightSum { sum: f64 },

    #[error("Score weight {name} must be a finite non-negative number, got {value}")]
    InvalidWeight { name: &'static str, value: f64 },
}
