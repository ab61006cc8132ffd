//! SQLite backend for local runs and tests.
//!
//! Timestamps are stored as RFC 3339 text with millisecond precision and a
//! `Z` suffix so lexical order matches time order.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};

use churnserve_core::error::{ChurnError, Result};

use super::{startup_err, storage_err, PredictionFilter, PredictionRecord, PredictionStore};
use crate::config::{SqliteTarget, StorageSection};

const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(target: &SqliteTarget, section: &StorageSection) -> Result<Self> {
        let acquire = Duration::from_millis(section.acquire_timeout_ms);
        let pool = match target {
            // One connection keeps the private in-memory database alive and
            // avoids shared-cache table locks.
            SqliteTarget::Memory => SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .acquire_timeout(acquire)
                .connect_with(SqliteConnectOptions::from_str("sqlite::memory:").map_err(startup_err)?)
                .await
                .map_err(startup_err)?,
            SqliteTarget::File(path) => SqlitePoolOptions::new()
                .max_connections(section.max_connections)
                .acquire_timeout(acquire)
                .connect_with(
                    SqliteConnectOptions::new()
                        .filename(path)
                        .create_if_missing(true)
                        .journal_mode(SqliteJournalMode::Wal)
                        .busy_timeout(acquire),
                )
                .await
                .map_err(startup_err)?,
        };
        Ok(Self { pool })
    }

    /// Fresh private in-memory store.
    pub async fn in_memory() -> Result<Self> {
        Self::connect(&SqliteTarget::Memory, &StorageSection::default()).await
    }

    #[cfg(test)]
    fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Bound as stored text. Rows carry millisecond timestamps, so rounding a
/// bound up to the next millisecond keeps `>= since` and `< until` exact.
fn ts_bound(t: DateTime<Utc>) -> String {
    let sub_ms = t.timestamp_subsec_nanos() % 1_000_000;
    let t = if sub_ms == 0 {
        t
    } else {
        t + chrono::Duration::nanoseconds(i64::from(1_000_000 - sub_ms))
    };
    t.format(TS_FORMAT).to_string()
}

#[async_trait]
impl PredictionStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn initialize(&self) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(|e| storage_err("begin", e))?;
        for stmt in [
            r#"
            CREATE TABLE IF NOT EXISTS predictions (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                customer_id  TEXT NOT NULL,
                prob_churn   REAL NOT NULL,
                predicted_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_predictions_predicted_at ON predictions (predicted_at)",
            "CREATE INDEX IF NOT EXISTS idx_predictions_customer ON predictions (customer_id, id)",
        ] {
            sqlx::query(stmt)
                .execute(&mut *tx)
                .await
                .map_err(|e| storage_err("create schema", e))?;
        }
        tx.commit().await.map_err(|e| storage_err("commit schema", e))
    }

    async fn append(&self, customer_id: &str, prob_churn: f64) -> Result<PredictionRecord> {
        sqlx::query_as::<_, PredictionRecord>(
            "INSERT INTO predictions (customer_id, prob_churn) VALUES (?1, ?2) \
             RETURNING id, customer_id, prob_churn, predicted_at",
        )
        .bind(customer_id)
        .bind(prob_churn)
        // Drain the statement: the autocommit only lands once it has been
        // stepped to completion, which `fetch_one` does not do.
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_err("insert prediction", e))?
        .pop()
        .ok_or_else(|| ChurnError::StorageUnavailable("insert prediction: no row returned".into()))
    }

    async fn query(&self, filter: &PredictionFilter) -> Result<Vec<PredictionRecord>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, customer_id, prob_churn, predicted_at FROM predictions WHERE 1 = 1",
        );
        if let Some(c) = &filter.customer_id {
            qb.push(" AND customer_id = ").push_bind(c);
        }
        if let Some(s) = filter.since {
            qb.push(" AND predicted_at >= ").push_bind(ts_bound(s));
        }
        if let Some(u) = filter.until {
            qb.push(" AND predicted_at < ").push_bind(ts_bound(u));
        }
        qb.push(" ORDER BY id ASC LIMIT ")
            .push_bind(i64::from(filter.effective_limit()));

        qb.build_query_as::<PredictionRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_err("query predictions", e))
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| storage_err("ping", e))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    async fn store() -> SqliteStore {
        let s = SqliteStore::in_memory().await.unwrap();
        s.initialize().await.unwrap();
        s
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let s = store().await;
        s.initialize().await.expect("second initialize must succeed");

        let (tables,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'predictions'",
        )
        .fetch_one(s.pool())
        .await
        .unwrap();
        assert_eq!(tables, 1);

        let (indexes,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND tbl_name = 'predictions'",
        )
        .fetch_one(s.pool())
        .await
        .unwrap();
        assert_eq!(indexes, 2);
    }

    #[tokio::test]
    async fn append_assigns_increasing_ids_and_time() {
        let s = store().await;
        let before = Utc::now() - chrono::Duration::seconds(1);

        let a = s.append("c1", 0.53).await.unwrap();
        let b = s.append("c1", 0.83).await.unwrap();

        assert!(b.id > a.id);
        assert_eq!(a.customer_id, "c1");
        assert_eq!(a.prob_churn, 0.53);
        assert!(a.predicted_at >= before);
        assert!(b.predicted_at >= a.predicted_at);

        let all = s.query(&PredictionFilter::default()).await.unwrap();
        assert_eq!(all, vec![a, b]);
    }

    #[tokio::test]
    async fn query_filters_by_customer_and_time() {
        let s = store().await;
        s.append("a", 0.2).await.unwrap();
        let b = s.append("b", 0.4).await.unwrap();
        s.append("a", 0.6).await.unwrap();

        let only_b = s.query(&PredictionFilter::for_customer("b")).await.unwrap();
        assert_eq!(only_b, vec![b]);

        let future = PredictionFilter {
            since: Some(Utc::now() + chrono::Duration::hours(1)),
            ..PredictionFilter::default()
        };
        assert!(s.query(&future).await.unwrap().is_empty());

        let past = PredictionFilter {
            until: Some(Utc::now() + chrono::Duration::hours(1)),
            limit: Some(2),
            ..PredictionFilter::default()
        };
        let page = s.query(&past).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].customer_id, "a");
    }

    #[test]
    fn bounds_round_up_to_the_stored_millisecond() {
        let exact: DateTime<Utc> = "2024-03-01T10:00:00.250Z".parse().unwrap();
        assert_eq!(ts_bound(exact), "2024-03-01T10:00:00.250Z");

        let sub_ms: DateTime<Utc> = "2024-03-01T10:00:00.250400Z".parse().unwrap();
        assert_eq!(ts_bound(sub_ms), "2024-03-01T10:00:00.251Z");

        let carry: DateTime<Utc> = "2024-03-01T10:00:59.999001Z".parse().unwrap();
        assert_eq!(ts_bound(carry), "2024-03-01T10:01:00.000Z");
    }

    #[tokio::test]
    async fn sub_millisecond_bounds_compare_exactly() {
        let s = store().await;
        let row = s.append("c1", 0.5).await.unwrap();
        let nudge = chrono::Duration::microseconds(400);

        let since_after = PredictionFilter {
            since: Some(row.predicted_at + nudge),
            ..PredictionFilter::default()
        };
        assert!(s.query(&since_after).await.unwrap().is_empty());

        let since_before = PredictionFilter {
            since: Some(row.predicted_at - nudge),
            ..PredictionFilter::default()
        };
        assert_eq!(s.query(&since_before).await.unwrap(), vec![row.clone()]);

        let until_after = PredictionFilter {
            until: Some(row.predicted_at + nudge),
            ..PredictionFilter::default()
        };
        assert_eq!(s.query(&until_after).await.unwrap(), vec![row.clone()]);

        let until_at = PredictionFilter {
            until: Some(row.predicted_at),
            ..PredictionFilter::default()
        };
        assert!(s.query(&until_at).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn file_backed_append_is_visible_on_other_connections() {
        let dir = tempfile::tempdir().unwrap();
        let section = StorageSection {
            max_connections: 4,
            ..StorageSection::default()
        };
        let target = SqliteTarget::File(dir.path().join("predictions.db"));
        let s = SqliteStore::connect(&target, &section).await.unwrap();
        s.initialize().await.unwrap();

        for i in 0..200 {
            let cid = format!("c{i}");
            let rec = s.append(&cid, 0.42).await.unwrap();
            let seen = s.query(&PredictionFilter::for_customer(cid.as_str())).await.unwrap();
            assert_eq!(seen, vec![rec], "row {i} not visible after append returned");
        }
        s.close().await;
    }

    #[tokio::test]
    async fn closed_store_reports_unavailable() {
        let s = store().await;
        s.close().await;
        let err = s.append("c1", 0.5).await.expect_err("closed pool must fail");
        assert!(matches!(err, ChurnError::StorageUnavailable(_)));
        assert!(s.ping().await.is_err());
    }
}
