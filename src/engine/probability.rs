//! Violation risk heuristic.
//!
//! `clamp(100 * (failed / max_expected) * (1 / minutes), 0, 100)`, with a
//! zero time factor for non-positive horizons. This is a monotone scaling of
//! the most recent cycle's failure density, not a statistical forecast.

/// Probability, in percent, that a violation recurs within `minutes`.
pub fn probability_of_violations(failed: u64, minutes: i64, max_expected_violations: f64) -> f64 {
    if minutes <= 0 || max_expected_violations <= 0.0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let violations_factor = failed as f64 / max_expected_violations;
    #[allow(clippy::cast_precision_loss)]
    let time_factor = 1.0 / minutes as f64;
    (100.0 * violations_factor * time_factor).clamp(0.0, 100.0)
}
