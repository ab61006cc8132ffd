//! Linear scorer vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use churnserve_core::{FeatureRecord, LinearScorer, PredictRequest, Scorer};

mod vector_loader;
use vector_loader::load;

const VECTORS: [&str; 9] = [
    "baseline_no_complaints.json",
    "baseline_three_complaints.json",
    "clamp_high.json",
    "clamp_low.json",
    "negative_tenure.json",
    "empty_customer_id.json",
    "negative_spend.json",
    "control_char_customer_id.json",
    "overlong_customer_id.json",
];

#[test]
fn linear_vectors() {
    let scorer = LinearScorer::default();

    for f in VECTORS {
        let v = load(f);
        let req: PredictRequest = serde_json::from_value(v.request.clone()).unwrap();
        let res = FeatureRecord::try_from(req);

        if let Some(err) = v.expect_error {
            let e = res.expect_err("expected validation error");
            assert_eq!(e.client_code().as_str(), err.code, "vector={}", v.description);
            continue;
        }

        let rec = res.expect("expected valid record");
        let ex = v.expect.expect("missing expect block");
        let p = scorer.score(&rec);
        assert!(
            (p - ex.prob_churn).abs() < 1e-9,
            "vector={} got={p} want={}",
            v.description,
            ex.prob_churn
        );
    }
}

#[test]
fn complaints_shift_score_by_indicator_weight() {
    let scorer = LinearScorer::default();
    let rec = |complaints: i64| {
        let v = serde_json::json!({
            "customer_id": "c1",
            "tenure_months": 10,
            "monthly_spend": 50.0,
            "complaints_last_90d": complaints,
        });
        let req: PredictRequest = serde_json::from_value(v).unwrap();
        FeatureRecord::try_from(req).unwrap()
    };

    let without = scorer.score(&rec(0));
    let with = scorer.score(&rec(3));
    assert!(with - without >= 0.3 - 1e-9, "with={with} without={without}");
}

#[test]
fn unknown_fields_are_rejected_at_decode() {
    let v = serde_json::json!({
        "customer_id": "c1",
        "tenure_months": 1,
        "monthly_spend": 1.0,
        "complaints_last_90d": 0,
        "churned": true,
    });
    assert!(serde_json::from_value::<PredictRequest>(v).is_err());
}
