//! Reputation scoring.
//!
//! Four raw activity figures are each mapped linearly onto `[0, 5]` against a
//! fixed threshold, then combined as a weighted average:
//!
//! - Longevity: two years of history earns the full 5 points.
//! - Volume: 500 transactions earn the full 5 points.
//! - Reliability: starts at 5 and loses one point per 4 failed transactions.
//! - Activity frequency: being active on half of all days since the first
//!   transaction earns the full 5 points.

use serde::Serialize;

use crate::{
    analysis::metrics::WalletMetrics,
    errors::ScoreError,
    reputation::ScoreWeights,
    utils::{round2, whole_days_between},
};

// ============================================
// Normalization Thresholds
// ============================================

pub const MAX_COMPONENT: f64 = 5.0;

pub const LONGEVITY_THRESHOLD_DAYS: f64 = 730.0;

pub const VOLUME_THRESHOLD_TXS: f64 = 500.0;

pub const FAILED_TXS_PER_POINT: f64 = 4.0;

/// Share of active days over longevity needed for the maximum
pub const ACTIVITY_FREQUENCY_THRESHOLD: f64 = 0.50;

// ============================================
// Types
// ============================================

/// Raw figures the score is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationInputs {
    pub longevity_days: u64,
    pub successful_txs: u64,
    pub failed_txs: u64,
    pub active_days: u64,
}

impl ReputationInputs {
    /// Derive inputs from accumulated metrics as of `now` (unix seconds).
    ///
    /// `None` when the wallet has no known first transaction.
    pub fn from_metrics(metrics: &WalletMetrics, now: u64) -> Option<Self> {
        if metrics.first_tx_timestamp == 0 {
            return None;
        }

        Some(Self {
            longevity_days: whole_days_between(metrics.first_tx_timestamp, now),
            successful_txs: metrics.successful_txs(),
            failed_txs: metrics.failed_txs,
            active_days: metrics.active_days_count,
        })
    }
}

/// Per-component scores, each in `[0, 5]`, rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedComponents {
    pub longevity: f64,
    pub volume: f64,
    pub reliability: f64,
    pub activity_frequency: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationScore {
    /// Weighted score in `[0, 5]`, rounded to two decimals
    pub score: f64,
    #[serde(rename = "normalizedComponents")]
    pub components: NormalizedComponents,
}

// ============================================
// Scoring
// ============================================

/// Compute the reputation score.
///
/// Weights are validated before anything else.
pub fn calculate_reputation(
    longevity_days: u64,
    successful_txs: u64,
    failed_txs: u64,
    active_days: u64,
    weights: &ScoreWeights,
) -> Result<ReputationScore, ScoreError> {
    weights.validate()?;

    let longevity = (longevity_days as f64 / LONGEVITY_THRESHOLD_DAYS * MAX_COMPONENT).min(MAX_COMPONENT);

    let volume = (successful_txs as f64 / VOLUME_THRESHOLD_TXS * MAX_COMPONENT).min(MAX_COMPONENT);

    let reliability = (MAX_COMPONENT - failed_txs as f64 / FAILED_TXS_PER_POINT).max(0.0);

    let relative_frequency = active_days as f64 / longevity_days.max(1) as f64;
    let activity_frequency =
        (relative_frequency / ACTIVITY_FREQUENCY_THRESHOLD * MAX_COMPONENT).min(MAX_COMPONENT);

    let score = weights.w_l * longevity
        + weights.w_v * volume
        + weights.w_f * reliability
        + weights.w_fa * activity_frequency;

    Ok(ReputationScore {
        score: round2(score.clamp(0.0, MAX_COMPONENT)),
        components: NormalizedComponents {
            longevity: round2(longevity),
            volume: round2(volume),
            reliability: round2(reliability),
            activity_frequency: round2(activity_frequency),
        },
    })
}

/// [`calculate_reputation`] over a [`ReputationInputs`] bundle.
pub fn score_inputs(
    inputs: &ReputationInputs,
    weights: &ScoreWeights,
) -> Result<ReputationScore, ScoreError> {
    calculate_reputation(
        inputs.longevity_days,
        inputs.successful_txs,
        inputs.failed_txs,
        inputs.active_days,
        weights,
    )
}
