//! The feature vector handed to the scoring endpoint

/// The exact and only input the fraud model accepts: the transaction amount
/// plus three behavioral ratios. Every field is always present; inputs the
/// assembler could not trust are zero-filled, never omitted.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeatureVector {
    pub amount: f64,
    pub amt_ratio1: f64,
    pub amt_ratio2: f64,
    pub count_ratio: f64,
}

impl FeatureVector {
    /// Serialize in the CSV order the endpoint was trained on:
    /// `amount,amt_ratio1,amt_ratio2,count_ratio`.
    pub fn to_csv(&self) -> String {
        format!(
            "{},{},{},{}",
            self.amount, self.amt_ratio1, self.amt_ratio2, self.count_ratio
        )
    }

    /// Feature names in vector order.
    pub fn feature_names() -> [&'static str; 4] {
        ["amount", "amt_ratio1", "amt_ratio2", "count_ratio"]
    }
}
