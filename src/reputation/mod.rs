pub mod score;
pub mod weights;

pub use score::{
    calculate_reputation, score_inputs, NormalizedComponents, ReputationInputs, ReputationScore,
};
pub use weights::{ScoreWeights, WEIGHT_SUM_TOLERANCE};
