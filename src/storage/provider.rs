//! Process-wide connection provider
//!
//! Holds the service configuration and lazily builds the pool on first use.
//! The connection string is resolved at that point, not at construction.
//! The pool is then cached for the lifetime of the provider; later calls
//! return it without any further checks (validation happens per checkout).

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::config::{DatabaseUrl, ServiceConfig, MISSING_DATABASE_URL};
use crate::storage::ConnectionPool;
use crate::{Error, Result};

/// SQL dialect reported by diagnostics
pub const DIALECT: &str = "sqlite";

/// Reads one environment variable
pub type EnvLookup = fn(&str) -> Option<String>;

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

pub struct ConnectionProvider {
    config: ServiceConfig,
    env: EnvLookup,
    pool: OnceLock<Arc<ConnectionPool>>,
    init: Mutex<()>,
}

impl ConnectionProvider {
    /// Provider reading the connection string from the process environment
    /// first, then from `config`
    pub fn new(config: ServiceConfig) -> Self {
        Self::with_env(config, process_env)
    }

    pub fn with_env(config: ServiceConfig, env: EnvLookup) -> Self {
        Self {
            config,
            env,
            pool: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    /// The shared pool, built on the first call.
    ///
    /// Fails with [`Error::Configuration`] when no connection string is
    /// configured. A failed initialization is not cached; the next call
    /// retries.
    pub fn pool(&self) -> Result<Arc<ConnectionPool>> {
        if let Some(pool) = self.pool.get() {
            return Ok(pool.clone());
        }

        // Serialize first-use initialization so only one pool is ever built
        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pool) = self.pool.get() {
            return Ok(pool.clone());
        }

        let raw = self
            .config
            .database_url_with(self.env)
            .ok_or_else(|| Error::Configuration(MISSING_DATABASE_URL.to_string()))?;
        let url = DatabaseUrl::parse(&raw)?;
        let options = self.config.pool_options();

        tracing::info!(
            "Initializing connection pool for {} (max {} connections)",
            url,
            options.max_size
        );
        let pool = Arc::new(ConnectionPool::open(url, options)?);
        let pool = self.pool.get_or_init(|| pool).clone();
        Ok(pool)
    }
}
