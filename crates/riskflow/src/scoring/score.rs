/// Lowest score on the scale, reserved for the riskiest applicants.
pub const MIN_SCORE: u16 = 1;
/// Highest score on the scale, reached only when the probability of default is zero.
pub const MAX_SCORE: u16 = 1000;

const SCORE_SCALE: f64 = 1000.0;
const PROBABILITY_DECIMALS: f64 = 10_000.0;

/// Map a probability of default onto the 1-1000 score scale, where higher is safer.
///
/// The scaled value is rounded half-up (`f64::round` rounds half away from zero, which is
/// half-up for every non-negative value; negative values clamp to [`MIN_SCORE`] anyway).
/// Out-of-range probabilities are accepted: the result is clamped, the input is not.
/// A NaN probability scores as [`MIN_SCORE`].
pub fn compute_score(prob_default: f64) -> u16 {
    let raw = (SCORE_SCALE * (1.0 - prob_default)).round();
    if raw.is_nan() {
        return MIN_SCORE;
    }

    raw.clamp(f64::from(MIN_SCORE), f64::from(MAX_SCORE)) as u16
}

/// Round a probability to the four decimals reported to callers.
pub fn round_probability(prob_default: f64) -> f64 {
    (prob_default * PROBABILITY_DECIMALS).round() / PROBABILITY_DECIMALS
}
