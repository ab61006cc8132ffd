//! Prediction store: append-only log of every scored request.
//!
//! The store exclusively owns the persisted sequence. Handlers only append and
//! query; nothing here updates or deletes a row. Each `append` is one
//! `INSERT ... RETURNING` statement, so a record is either fully visible or
//! absent.

mod postgres;
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use churnserve_core::error::{ChurnError, Result};

use crate::config::{ConnectionDescriptor, StorageSection};

pub use postgres::PgStore;
pub use sqlite::SqliteStore;

/// Default page size for `query`.
pub const DEFAULT_QUERY_LIMIT: u32 = 100;
/// Hard cap for `query`.
pub const MAX_QUERY_LIMIT: u32 = 1_000;

/// One persisted prediction.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct PredictionRecord {
    pub id: i64,
    pub customer_id: String,
    pub prob_churn: f64,
    pub predicted_at: DateTime<Utc>,
}

/// Read filter. `since` is inclusive, `until` exclusive.
#[derive(Debug, Clone, Default)]
pub struct PredictionFilter {
    pub customer_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

impl PredictionFilter {
    pub fn for_customer(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: Some(customer_id.into()),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let (Some(s), Some(u)) = (self.since, self.until) {
            if s >= u {
                return Err(ChurnError::Validation("since must be earlier than until".into()));
            }
        }
        if self.limit == Some(0) {
            return Err(ChurnError::Validation("limit must be positive".into()));
        }
        Ok(())
    }

    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_QUERY_LIMIT).min(MAX_QUERY_LIMIT)
    }
}

#[async_trait]
pub trait PredictionStore: Send + Sync {
    /// Backend name used in logs.
    fn backend(&self) -> &'static str;

    /// Ensure the schema exists. Safe to call on every start.
    async fn initialize(&self) -> Result<()>;

    /// Persist one prediction; id and timestamp come from the backend.
    async fn append(&self, customer_id: &str, prob_churn: f64) -> Result<PredictionRecord>;

    /// Read-only lookup ordered by id.
    async fn query(&self, filter: &PredictionFilter) -> Result<Vec<PredictionRecord>>;

    /// Cheap round trip for readiness checks.
    async fn ping(&self) -> Result<()>;

    /// Close the pool; later calls fail with `StorageUnavailable`.
    async fn close(&self);
}

/// Open a pool for `desc`. Connection failures are startup failures.
pub async fn connect(
    desc: &ConnectionDescriptor,
    section: &StorageSection,
) -> Result<Arc<dyn PredictionStore>> {
    let store: Arc<dyn PredictionStore> = match desc {
        ConnectionDescriptor::Postgres(t) => Arc::new(PgStore::connect(t, section).await?),
        ConnectionDescriptor::Sqlite(t) => Arc::new(SqliteStore::connect(t, section).await?),
    };
    tracing::info!(target_db = %desc, backend = desc.backend(), "prediction store connected");
    Ok(store)
}

pub(crate) fn storage_err(op: &str, e: sqlx::Error) -> ChurnError {
    ChurnError::StorageUnavailable(format!("{op}: {e}"))
}

pub(crate) fn startup_err(e: sqlx::Error) -> ChurnError {
    ChurnError::Startup(format!("cannot connect to prediction store: {e}"))
}
