//! Churn scorers.
//!
//! Every scorer is total over a validated `FeatureRecord` and returns a
//! probability clamped into `[MIN_PROB, MAX_PROB]` so callers never see a
//! degenerate 0 or 1.

use crate::error::{ChurnError, Result};
use crate::model::FeatureRecord;

/// Lower clamp bound for any score.
pub const MIN_PROB: f64 = 0.01;
/// Upper clamp bound for any score.
pub const MAX_PROB: f64 = 0.99;

/// Maps a feature record to a churn probability.
///
/// Implementations must be deterministic and free of I/O.
pub trait Scorer: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;
    fn score(&self, record: &FeatureRecord) -> f64;
}

fn clamp_prob(raw: f64) -> f64 {
    // NaN cannot come out of validated input, but keep the bound total.
    if raw.is_nan() {
        return MIN_PROB;
    }
    raw.clamp(MIN_PROB, MAX_PROB)
}

/// Weights of the fixed linear rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearWeights {
    pub bias: f64,
    /// Added once when any complaint was filed in the last 90 days.
    pub has_complaints: f64,
    pub per_tenure_month: f64,
    pub per_spend_unit: f64,
}

impl Default for LinearWeights {
    fn default() -> Self {
        Self {
            bias: 0.5,
            has_complaints: 0.3,
            per_tenure_month: -0.002,
            per_spend_unit: 0.001,
        }
    }
}

/// Placeholder rule used until a trained model is configured.
#[derive(Debug, Clone, Default)]
pub struct LinearScorer {
    weights: LinearWeights,
}

impl LinearScorer {
    pub fn new(weights: LinearWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> LinearWeights {
        self.weights
    }
}

impl Scorer for LinearScorer {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn score(&self, r: &FeatureRecord) -> f64 {
        let w = &self.weights;
        let complained = if r.complaints_last_90d() > 0 { 1.0 } else { 0.0 };
        // Evaluation order is fixed so results are bit-for-bit reproducible.
        let raw = w.bias + w.has_complaints * complained
            + w.per_tenure_month * f64::from(r.tenure_months())
            + w.per_spend_unit * r.monthly_spend();
        clamp_prob(raw)
    }
}

/// Logistic regression exported by the training job.
///
/// Coefficients follow `FeatureRecord::features` column order.
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticScorer {
    coefficients: [f64; 3],
    intercept: f64,
}

impl LogisticScorer {
    pub fn new(coefficients: [f64; 3], intercept: f64) -> Result<Self> {
        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ChurnError::Startup(
                "logistic scorer coefficients must be finite".into(),
            ));
        }
        tracing::debug!(?coefficients, intercept, "logistic scorer loaded");
        Ok(Self {
            coefficients,
            intercept,
        })
    }
}

impl Scorer for LogisticScorer {
    fn name(&self) -> &'static str {
        "logistic"
    }

    fn score(&self, r: &FeatureRecord) -> f64 {
        let z = self
            .coefficients
            .iter()
            .zip(r.features())
            .fold(self.intercept, |acc, (c, x)| acc + c * x);
        clamp_prob(1.0 / (1.0 + (-z).exp()))
    }
}
