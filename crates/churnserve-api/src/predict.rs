//! Scoring endpoints.
//!
//! `POST /predict` walks one request through
//! `Received -> Validated -> Scored -> Recorded -> Responded`, leaving early as
//! `Rejected` (422) or `Failed` (500).
//!
//! The store write and its bookkeeping run on a spawned task. If the caller
//! goes away the task still finishes, logs, and updates metrics; the handler
//! only awaits its result.

use std::time::Instant;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use churnserve_core::error::ChurnError;
use churnserve_core::model::{FeatureRecord, PredictRequest, PredictResponse};

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::obs::Outcome;
use crate::store::{PredictionFilter, PredictionRecord};

type ApiResult<T> = std::result::Result<T, ApiError>;

fn validate(body: Result<Json<PredictRequest>, JsonRejection>) -> Result<FeatureRecord, ChurnError> {
    let Json(req) = body.map_err(|e| ChurnError::Validation(e.body_text()))?;
    FeatureRecord::try_from(req)
}

pub async fn predict(
    State(state): State<AppState>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> ApiResult<Json<PredictResponse>> {
    let metrics = state.metrics();

    let record = match validate(body) {
        Ok(r) => r,
        Err(e) => {
            metrics.record_outcome(Outcome::Rejected);
            tracing::warn!(error = %e, "predict rejected");
            return Err(e.into());
        }
    };

    metrics.increment_request_count();
    let started = Instant::now();
    let prob_churn = state.scorer().score(&record);

    let store = state.store();
    let customer_id = record.customer_id().to_string();
    let task_metrics = state.metrics();
    let write = tokio::spawn(async move {
        let res = store.append(&customer_id, prob_churn).await;
        task_metrics.observe_latency(started.elapsed());
        match &res {
            Ok(rec) => {
                task_metrics.record_outcome(Outcome::Ok);
                tracing::debug!(id = rec.id, customer_id = %rec.customer_id, prob_churn, "prediction stored");
            }
            Err(e) => {
                task_metrics.record_outcome(Outcome::Failed);
                tracing::error!(error = %e, customer_id = %customer_id, "prediction not stored");
            }
        }
        res
    });

    let rec = write
        .await
        .map_err(|e| ChurnError::Internal(format!("store task aborted: {e}")))??;

    Ok(Json(PredictResponse {
        customer_id: rec.customer_id,
        prob_churn: rec.prob_churn,
    }))
}

/// Query string of `GET /predictions`. Timestamps are RFC 3339.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredictionsQuery {
    pub customer_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct PredictionsPage {
    pub predictions: Vec<PredictionRecord>,
}

pub async fn list_predictions(
    State(state): State<AppState>,
    q: Result<Query<PredictionsQuery>, QueryRejection>,
) -> ApiResult<Json<PredictionsPage>> {
    let Query(q) = q.map_err(|e| ChurnError::Validation(e.body_text()))?;
    let filter = PredictionFilter {
        customer_id: q.customer_id,
        since: q.since,
        until: q.until,
        limit: q.limit,
    };
    filter.validate()?;

    let predictions = state.store().query(&filter).await.map_err(|e| {
        tracing::error!(error = %e, "prediction query failed");
        e
    })?;
    Ok(Json(PredictionsPage { predictions }))
}
