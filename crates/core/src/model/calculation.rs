use serde::{Deserialize, Serialize};

/// Per-question contribution to the energy score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownItem {
    #[serde(alias = "question")]
    pub question_key: String,
    pub score: f64,
}

/// Result produced by the external scoring service, stored verbatim.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    #[serde(alias = "result")]
    pub total_score: f64,
    #[serde(default)]
    pub breakdown: Vec<BreakdownItem>,
}

impl CalculationResult {
    #[must_use]
    pub fn new(total_score: f64, breakdown: Vec<BreakdownItem>) -> Self {
        Self {
            total_score,
            breakdown,
        }
    }

    #[must_use]
    pub fn score_for(&self, question_key: &str) -> Option<f64> {
        self.breakdown
            .iter()
            .find(|item| item.question_key == question_key)
            .map(|item| item.score)
    }
}
