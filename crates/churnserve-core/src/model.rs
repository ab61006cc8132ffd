//! Feature records and the `/predict` wire contract.
//!
//! `PredictRequest` is what arrives over the wire: integers are signed so that
//! a negative value decodes and gets rejected with a field-level message.
//! `FeatureRecord` is the validated form and is the only thing scorers see.

use serde::{Deserialize, Serialize};

use crate::error::{ChurnError, Result};

/// Body of `POST /predict`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredictRequest {
    pub customer_id: String,
    pub tenure_months: i64,
    pub monthly_spend: f64,
    pub complaints_last_90d: i64,
}

/// Validated feature record.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    customer_id: String,
    tenure_months: u32,
    monthly_spend: f64,
    complaints_last_90d: u32,
}

impl FeatureRecord {
    /// Build a record from already-typed values, applying the same checks as
    /// the wire conversion.
    pub fn new(
        customer_id: impl Into<String>,
        tenure_months: u32,
        monthly_spend: f64,
        complaints_last_90d: u32,
    ) -> Result<Self> {
        let customer_id = customer_id.into();
        validate_customer_id(&customer_id)?;
        validate_spend(monthly_spend)?;
        Ok(Self {
            customer_id,
            tenure_months,
            monthly_spend,
            complaints_last_90d,
        })
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }
    pub fn tenure_months(&self) -> u32 {
        self.tenure_months
    }
    pub fn monthly_spend(&self) -> f64 {
        self.monthly_spend
    }
    pub fn complaints_last_90d(&self) -> u32 {
        self.complaints_last_90d
    }

    /// Numeric features in training column order:
    /// `[tenure_months, monthly_spend, complaints_last_90d]`.
    pub fn features(&self) -> [f64; 3] {
        [
            f64::from(self.tenure_months),
            self.monthly_spend,
            f64::from(self.complaints_last_90d),
        ]
    }
}

impl TryFrom<PredictRequest> for FeatureRecord {
    type Error = ChurnError;

    fn try_from(req: PredictRequest) -> Result<Self> {
        let tenure_months = non_negative_count("tenure_months", req.tenure_months)?;
        let complaints_last_90d =
            non_negative_count("complaints_last_90d", req.complaints_last_90d)?;
        Self::new(
            req.customer_id,
            tenure_months,
            req.monthly_spend,
            complaints_last_90d,
        )
    }
}

/// Body returned by a successful `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub customer_id: String,
    pub prob_churn: f64,
}

/// Longest accepted `customer_id`, in bytes.
pub const MAX_CUSTOMER_ID_LEN: usize = 256;

fn validate_customer_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(ChurnError::Validation("customer_id must not be empty".into()));
    }
    if id.len() > MAX_CUSTOMER_ID_LEN {
        return Err(ChurnError::Validation(format!(
            "customer_id must be at most {MAX_CUSTOMER_ID_LEN} bytes (got {})",
            id.len()
        )));
    }
    // NUL is refused by Postgres TEXT; the rest are rejected with it.
    if id.chars().any(char::is_control) {
        return Err(ChurnError::Validation(
            "customer_id must not contain control characters".into(),
        ));
    }
    Ok(())
}

fn validate_spend(v: f64) -> Result<()> {
    if !v.is_finite() {
        return Err(ChurnError::Validation("monthly_spend must be finite".into()));
    }
    if v < 0.0 {
        return Err(ChurnError::Validation(format!(
            "monthly_spend must be non-negative (got {v})"
        )));
    }
    Ok(())
}

fn non_negative_count(field: &str, v: i64) -> Result<u32> {
    if v < 0 {
        return Err(ChurnError::Validation(format!(
            "{field} must be non-negative (got {v})"
        )));
    }
    u32::try_from(v)
        .map_err(|_| ChurnError::Validation(format!("{field} is out of range (got {v})")))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    fn req(tenure: i64, spend: f64, complaints: i64) -> PredictRequest {
        PredictRequest {
            customer_id: "c1".into(),
            tenure_months: tenure,
            monthly_spend: spend,
            complaints_last_90d: complaints,
        }
    }

    #[test]
    fn accepts_zero_values() {
        let rec = FeatureRecord::try_from(req(0, 0.0, 0)).expect("zeros are valid");
        assert_eq!(rec.features(), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn rejects_negative_fields() {
        for bad in [req(-1, 1.0, 0), req(1, -0.01, 0), req(1, 1.0, -3)] {
            let err = FeatureRecord::try_from(bad).expect_err("negative must fail");
            assert_eq!(err.client_code().as_str(), "VALIDATION_FAILED");
        }
    }

    #[test]
    fn rejects_non_finite_spend() {
        assert!(FeatureRecord::new("c1", 1, f64::NAN, 0).is_err());
        assert!(FeatureRecord::new("c1", 1, f64::INFINITY, 0).is_err());
    }

    #[test]
    fn rejects_blank_customer_id() {
        assert!(FeatureRecord::new("", 1, 1.0, 0).is_err());
        assert!(FeatureRecord::new("   ", 1, 1.0, 0).is_err());
    }

    #[test]
    fn rejects_control_characters_and_overlong_ids() {
        for bad in ["c\0x", "c\nx", "\u{7f}", "tab\there"] {
            let err = FeatureRecord::new(bad, 1, 1.0, 0).expect_err("control char must fail");
            assert_eq!(err.client_code().as_str(), "VALIDATION_FAILED");
        }

        let at_cap = "x".repeat(MAX_CUSTOMER_ID_LEN);
        assert!(FeatureRecord::new(at_cap.as_str(), 1, 1.0, 0).is_ok());
        let over = "x".repeat(MAX_CUSTOMER_ID_LEN + 1);
        assert!(FeatureRecord::new(over, 1, 1.0, 0).is_err());

        assert!(FeatureRecord::new("cliente-ñ-42", 1, 1.0, 0).is_ok());
    }

    #[test]
    fn rejects_counts_beyond_u32() {
        let err = FeatureRecord::try_from(req(i64::from(u32::MAX) + 1, 1.0, 0)).unwrap_err();
        assert!(err.to_string().contains("tenure_months"));
    }
}
