use serde::{Deserialize, Serialize};

use crate::errors::ScoreError;

/// Weights must add up to 1.0 within this tolerance.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Relative weight of each normalized component in the final score.
///
/// Defaults are tuned for peer-to-peer market counterparties, where
/// reliability matters most.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Longevity
    pub w_l: f64,
    /// Transaction volume
    pub w_v: f64,
    /// Reliability (failed transaction penalty)
    pub w_f: f64,
    /// Activity frequency
    pub w_fa: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            w_l: 0.25,
            w_v: 0.20,
            w_f: 0.30,
            w_fa: 0.25,
        }
    }
}

impl ScoreWeights {
    pub fn new(w_l: f64, w_v: f64, w_f: f64, w_fa: f64) -> Self {
        Self {
            w_l,
            w_v,
            w_f,
            w_fa,
        }
    }

    pub fn sum(&self) -> f64 {
        self.w_l + self.w_v + self.w_f + self.w_fa
    }

    /// Every weight finite and non-negative, and the total 1.0 within tolerance.
    pub fn validate(&self) -> Result<(), ScoreError> {
        for (name, value) in [
            ("w_l", self.w_l),
            ("w_v", self.w_v),
            ("w_f", self.w_f),
            ("w_fa", self.w_fa),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ScoreError::InvalidWeight { name, value });
            }
        }

        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ScoreError::InvalidWeightSum { sum });
        }

        Ok(())
    }
}
