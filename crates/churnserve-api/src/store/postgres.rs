//! PostgreSQL backend.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};

use churnserve_core::error::Result;

use super::{startup_err, storage_err, PredictionFilter, PredictionRecord, PredictionStore};
use crate::config::{PgTarget, StorageSection};

// Serializes concurrent schema creation across replicas starting together.
const SCHEMA_LOCK_KEY: i64 = 0x6368_7572_6e5f_7072; // "churn_pr"

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(target: &PgTarget, section: &StorageSection) -> Result<Self> {
        let mut opts = PgConnectOptions::new()
            .host(&target.host)
            .port(target.port)
            .database(&target.database)
            .username(&target.user)
            .application_name("churnserve");
        if let Some(pw) = &target.password {
            opts = opts.password(pw);
        }

        let pool = PgPoolOptions::new()
            .max_connections(section.max_connections)
            .acquire_timeout(Duration::from_millis(section.acquire_timeout_ms))
            .connect_with(opts)
            .await
            .map_err(startup_err)?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl PredictionStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn initialize(&self) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(|e| storage_err("begin", e))?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(SCHEMA_LOCK_KEY)
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_err("schema lock", e))?;

        for stmt in [
            r#"
            CREATE TABLE IF NOT EXISTS predictions (
                id           BIGSERIAL PRIMARY KEY,
                customer_id  TEXT NOT NULL,
                prob_churn   DOUBLE PRECISION NOT NULL,
                predicted_at TIMESTAMPTZ NOT NULL DEFAULT now()
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
            "INSERT INTO predictions (customer_id, prob_churn) VALUES ($1, $2) \
             RETURNING id, customer_id, prob_churn, predicted_at",
        )
        .bind(customer_id)
        .bind(prob_churn)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| storage_err("insert prediction", e))
    }

    async fn query(&self, filter: &PredictionFilter) -> Result<Vec<PredictionRecord>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, customer_id, prob_churn, predicted_at FROM predictions WHERE TRUE",
        );
        if let Some(c) = &filter.customer_id {
            qb.push(" AND customer_id = ").push_bind(c);
        }
        if let Some(s) = filter.since {
            qb.push(" AND predicted_at >= ").push_bind(s);
        }
        if let Some(u) = filter.until {
            qb.push(" AND predicted_at < ").push_bind(u);
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
