//! Ratio features derived from the aggregate windows.
//!
//! The three ratios compare recent behavior against the card's one-week
//! baseline. They are the fraud signal proper; the raw aggregates never reach
//! the model directly.

use crate::types::FeatureVector;

/// The three dimensionless ratios fed to the model alongside the amount.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Ratios {
    /// Short-window average spend relative to the baseline average; a jump
    /// here means the card's typical ticket size suddenly changed.
    pub amt_ratio1: f64,
    /// This transaction's amount relative to the baseline average; flags a
    /// single outlier purchase.
    pub amt_ratio2: f64,
    /// Short-window transaction count relative to the baseline count; flags
    /// velocity spikes.
    pub count_ratio: f64,
}

/// Pure ratio arithmetic with the zero-fill policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct RatioCalculator;

impl RatioCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Compute the ratio features, or zero-fill all three when the baseline
    /// is unusable (zero denominator) or the short window is stale. Stale
    /// short-window numbers must not be combined with a valid baseline, so
    /// staleness zeroes everything rather than just the short-window terms.
    pub fn compute(
        &self,
        amount: f64,
        avg_amt_last_10m: f64,
        avg_amt_last_1w: f64,
        num_trans_last_10m: u64,
        num_trans_last_1w: u64,
        stale: bool,
    ) -> Ratios {
        if avg_amt_last_1w <= 0.0 || num_trans_last_1w == 0 || stale {
            return Ratios::default();
        }

        Ratios {
            amt_ratio1: avg_amt_last_10m / avg_amt_last_1w,
            amt_ratio2: amount / avg_amt_last_1w,
            count_ratio: num_trans_last_10m as f64 / num_trans_last_1w as f64,
        }
    }

    /// Assemble the full model input from the amount and computed ratios.
    pub fn to_vector(&self, amount: f64, ratios: Ratios) -> FeatureVector {
        FeatureVector {
            amount,
            amt_ratio1: ratios.amt_ratio1,
            amt_ratio2: ratios.amt_ratio2,
            count_ratio: ratios.count_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_fresh_ratios_are_exact() {
        let ratios = RatioCalculator::new().compute(68.17, 5.0, 46.13, 2, 60, false);
        assert!((ratios.amt_ratio1 - 5.0 / 46.13).abs() < EPSILON);
        assert!((ratios.amt_ratio2 - 68.17 / 46.13).abs() < EPSILON);
        assert!((ratios.count_ratio - 2.0 / 60.0).abs() < EPSILON);
    }

    #[test]
    fn test_known_transaction_scenario() {
        // amount 68.17 against a 46.13 weekly average, 2 of 60 transactions
        // in the short window.
        let ratios = RatioCalculator::new().compute(68.17, 5.0, 46.13, 2, 60, false);
        assert!((ratios.amt_ratio1 - 0.1084).abs() < 1e-4);
        assert!((ratios.amt_ratio2 - 1.4778).abs() < 1e-4);
        assert!((ratios.count_ratio - 0.0333).abs() < 1e-4);
    }

    #[test]
    fn test_zero_baseline_average_zero_fills() {
        let ratios = RatioCalculator::new().compute(68.17, 5.0, 0.0, 2, 60, false);
        assert_eq!(ratios, Ratios::default());
    }

    #[test]
    fn test_negative_baseline_average_zero_fills() {
        let ratios = RatioCalculator::new().compute(68.17, 5.0, -1.0, 2, 60, false);
        assert_eq!(ratios, Ratios::default());
    }

    #[test]
    fn test_zero_baseline_count_zero_fills() {
        let ratios = RatioCalculator::new().compute(68.17, 5.0, 46.13, 2, 0, false);
        assert_eq!(ratios, Ratios::default());
    }

    #[test]
    fn test_stale_window_zero_fills_despite_valid_baseline() {
        let ratios = RatioCalculator::new().compute(68.17, 5.0, 46.13, 2, 60, true);
        assert_eq!(ratios, Ratios::default());
    }

    #[test]
    fn test_vector_preserves_amount() {
        let calc = RatioCalculator::new();
        let vector = calc.to_vector(68.17, calc.compute(68.17, 5.0, 46.13, 2, 60, true));
        assert_eq!(vector.amount, 68.17);
        assert_eq!(vector.amt_ratio1, 0.0);
        assert_eq!(vector.amt_ratio2, 0.0);
        assert_eq!(vector.count_ratio, 0.0);
    }
}
