//! Service config loader (strict parsing + environment overrides).
//!
//! Precedence, lowest first: built-in defaults, YAML file, environment.

pub mod connection;
pub mod schema;

use std::{fs, path::Path};

use churnserve_core::error::{ChurnError, Result};

pub use connection::{ConnectionDescriptor, PgTarget, SqliteTarget};
pub use schema::{ScorerConfig, ServerSection, ServiceConfig, StorageSection, TrackingSection};

/// Env var naming the YAML file.
pub const CONFIG_PATH_ENV: &str = "CHURNSERVE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "churnserve.yaml";

pub fn load_from_file(path: &str) -> Result<ServiceConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| ChurnError::Startup(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ServiceConfig> {
    let cfg: ServiceConfig = serde_yaml::from_str(s)
        .map_err(|e| ChurnError::Startup(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load config the way the binary does.
///
/// An explicit `CHURNSERVE_CONFIG` must exist; the default file is optional.
pub fn load() -> Result<ServiceConfig> {
    let mut cfg = match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) => load_from_file(&path)?,
        Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => load_from_file(DEFAULT_CONFIG_PATH)?,
        Err(_) => ServiceConfig::default(),
    };
    apply_env(&mut cfg, |k| std::env::var(k).ok())?;
    cfg.validate()?;
    Ok(cfg)
}

/// Overlay recognized environment variables onto `cfg`.
///
/// `lookup` is injected so tests never touch the process environment.
pub fn apply_env<F>(cfg: &mut ServiceConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("CHURNSERVE_LISTEN") {
        cfg.server.listen = v;
    }

    let st = &mut cfg.storage;
    if let Some(v) = lookup("DATABASE_URL") {
        st.url = Some(v);
    }
    if let Some(v) = lookup("DB_HOST") {
        st.host = v;
    }
    if let Some(v) = lookup("DB_PORT") {
        st.port = v
            .parse()
            .map_err(|_| ChurnError::Startup(format!("DB_PORT is not a valid port: {v}")))?;
    }
    if let Some(v) = lookup("DB_NAME") {
        st.database = v;
    }
    if let Some(v) = lookup("DB_USER") {
        st.user = v;
    }
    if let Some(v) = lookup("DB_PASSWORD") {
        st.password = v;
    }

    if let Some(v) = lookup("MLFLOW_TRACKING_URI") {
        cfg.tracking.uri = Some(v);
    }
    Ok(())
}
