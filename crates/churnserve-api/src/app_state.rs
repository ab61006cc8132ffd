//! Shared application state for the scoring service.
//!
//! Built once at startup and handed to every handler through axum `State`.
//! Cloning is cheap: everything lives behind `Arc`.

use std::sync::Arc;

use churnserve_core::error::{ChurnError, Result};
use churnserve_core::scoring::{LinearScorer, LogisticScorer, Scorer};

use crate::config::{ConnectionDescriptor, ScorerConfig, ServiceConfig};
use crate::obs::ServiceMetrics;
use crate::store::{self, PredictionStore};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    metrics: Arc<ServiceMetrics>,
}

struct AppStateInner {
    cfg: ServiceConfig,
    scorer: Arc<dyn Scorer>,
    store: Arc<dyn PredictionStore>,
}

impl AppState {
    /// Assemble state from already-built parts.
    pub fn new(cfg: ServiceConfig, scorer: Arc<dyn Scorer>, store: Arc<dyn PredictionStore>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { cfg, scorer, store }),
            metrics: Arc::new(ServiceMetrics::new()),
        }
    }

    /// Resolve the storage target, connect, ensure the schema, build the scorer.
    ///
    /// Every failure here is a `ChurnError::Startup`: the process must not
    /// accept traffic it could only fail.
    pub async fn bootstrap(cfg: ServiceConfig) -> Result<Self> {
        let scorer = build_scorer(&cfg.scorer)?;
        let desc = ConnectionDescriptor::from_section(&cfg.storage)?;

        let store = store::connect(&desc, &cfg.storage).await?;
        store.initialize().await.map_err(|e| {
            ChurnError::Startup(format!("prediction store schema setup failed: {e}"))
        })?;

        if let Some(uri) = &cfg.tracking.uri {
            tracing::debug!(%uri, "tracking endpoint configured (not used by the scoring path)");
        }
        tracing::info!(scorer = scorer.name(), backend = store.backend(), "app state ready");

        Ok(Self::new(cfg, scorer, store))
    }

    pub fn cfg(&self) -> &ServiceConfig {
        &self.inner.cfg
    }

    pub fn scorer(&self) -> Arc<dyn Scorer> {
        Arc::clone(&self.inner.scorer)
    }

    pub fn store(&self) -> Arc<dyn PredictionStore> {
        Arc::clone(&self.inner.store)
    }

    pub fn metrics(&self) -> Arc<ServiceMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Flip readiness off ahead of shutdown.
    pub fn set_draining(&self) {
        self.metrics.set_draining();
    }

    pub fn is_draining(&self) -> bool {
        self.metrics.is_draining()
    }
}

pub fn build_scorer(cfg: &ScorerConfig) -> Result<Arc<dyn Scorer>> {
    let scorer: Arc<dyn Scorer> = match cfg {
        ScorerConfig::Linear {} => Arc::new(LinearScorer::default()),
        ScorerConfig::Logistic {
            coefficients,
            intercept,
        } => Arc::new(LogisticScorer::new(*coefficients, *intercept)?),
    };
    Ok(scorer)
}
