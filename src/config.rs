use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::storage::PoolOptions;
use crate::{Error, Result};

/// Environment variables consulted for the connection string, in order
pub const DATABASE_URL_VARS: [&str; 2] = ["DB_URL", "DATABASE_URL"];

/// Canonical connection string scheme
pub const CANONICAL_SCHEME: &str = "sqlite://";

/// Legacy scheme accepted for the same backend and rewritten to the canonical one
pub const LEGACY_SCHEME: &str = "sqlite3://";

pub const MISSING_DATABASE_URL: &str = "Missing DB_URL (or DATABASE_URL) environment variable.";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub database_url: Option<String>,
    pub bind: String,
    pub port: u16,
    pub pool_size: u32,
    pub busy_timeout_ms: u64,
    pub image_path: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            bind: "0.0.0.0".to_string(),
            port: 5000,
            pool_size: 8,
            busy_timeout_ms: 5_000,
            image_path: PathBuf::from("amygdala.gif"),
        }
    }
}

impl ServiceConfig {
    /// Connection string from the environment, falling back to the config file
    pub fn database_url(&self) -> Option<String> {
        self.database_url_with(|name| std::env::var(name).ok())
    }

    pub fn database_url_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        DATABASE_URL_VARS
            .into_iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.trim().is_empty())
            .or_else(|| self.database_url.clone())
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_size: self.pool_size.max(1),
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
            create_if_missing: false,
        }
    }
}

/// A validated connection string for the SQLite backend.
///
/// Accepts `sqlite://<target>` and the legacy `sqlite3://<target>`. The target
/// is a filesystem path or an SQLite `file:` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseUrl {
    target: String,
}

impl DatabaseUrl {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Error::Configuration(MISSING_DATABASE_URL.to_string()));
        }

        // Normalize the legacy scheme before validation
        let normalized = match raw.strip_prefix(LEGACY_SCHEME) {
            Some(rest) => format!("{}{}", CANONICAL_SCHEME, rest),
            None => raw.to_string(),
        };

        let target = normalized.strip_prefix(CANONICAL_SCHEME).ok_or_else(|| {
            Error::Configuration(format!(
                "Unsupported database URL '{}': expected {}<path>",
                raw, CANONICAL_SCHEME
            ))
        })?;

        if target.is_empty() {
            return Err(Error::Configuration(format!(
                "Database URL '{}' has no target path",
                raw
            )));
        }

        Ok(Self {
            target: target.to_string(),
        })
    }

    /// Path or `file:` URI handed to SQLite
    pub fn target(&self) -> &str {
        &self.target
    }
}

impl fmt::Display for DatabaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", CANONICAL_SCHEME, self.target)
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("neurodiss.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<ServiceConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: ServiceConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}
