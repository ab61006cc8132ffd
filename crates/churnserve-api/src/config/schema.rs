use serde::Deserialize;
use churnserve_core::error::{ChurnError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub storage: StorageSection,

    #[serde(default)]
    pub scorer: ScorerConfig,

    #[serde(default)]
    pub tracking: TrackingSection,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            storage: StorageSection::default(),
            scorer: ScorerConfig::default(),
            tracking: TrackingSection::default(),
        }
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ChurnError::Startup(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        self.server.validate()?;
        self.storage.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        if self.listen.parse::<std::net::SocketAddr>().is_err() {
            return Err(ChurnError::Startup(format!(
                "server.listen must be a valid socket address: {}",
                self.listen
            )));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8000".into()
}

/// Storage target, either as one URI or as structured parameters.
///
/// When `url` is set the structured fields are ignored.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageSection {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    #[serde(default = "default_db_name")]
    pub database: String,
    #[serde(default = "default_db_user")]
    pub user: String,
    #[serde(default = "default_db_password")]
    pub password: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            url: None,
            host: default_db_host(),
            port: default_db_port(),
            database: default_db_name(),
            user: default_db_user(),
            password: default_db_password(),
            max_connections: default_max_connections(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
        }
    }
}

impl StorageSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=256).contains(&self.max_connections) {
            return Err(ChurnError::Startup(
                "storage.max_connections must be between 1 and 256".into(),
            ));
        }
        if !(100..=60_000).contains(&self.acquire_timeout_ms) {
            return Err(ChurnError::Startup(
                "storage.acquire_timeout_ms must be between 100 and 60000".into(),
            ));
        }
        if self.url.is_none() && (self.host.is_empty() || self.database.is_empty()) {
            return Err(ChurnError::Startup(
                "storage.host and storage.database must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn default_db_host() -> String {
    "pg".into()
}
fn default_db_port() -> u16 {
    5432
}
fn default_db_name() -> String {
    "mlopsdb".into()
}
fn default_db_user() -> String {
    "mlops".into()
}
fn default_db_password() -> String {
    "mlops_pass".into()
}
fn default_max_connections() -> u32 {
    10
}
fn default_acquire_timeout_ms() -> u64 {
    3_000
}

/// Which scorer to serve.
///
/// Every variant is a struct so `deny_unknown_fields` also covers `linear`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", deny_unknown_fields)]
pub enum ScorerConfig {
    /// Fixed placeholder rule.
    Linear {},
    /// Logistic regression exported by the training job, columns
    /// `[tenure_months, monthly_spend, complaints_last_90d]`.
    Logistic {
        coefficients: [f64; 3],
        intercept: f64,
    },
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self::Linear {}
    }
}

/// Experiment tracking endpoint used by the training job. Carried, not consumed.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TrackingSection {
    #[serde(default)]
    pub uri: Option<String>,
}
