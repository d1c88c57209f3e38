//! Validating SQLite connection pool
//!
//! Built on `r2d2` with `r2d2_sqlite`. Every checkout runs `SELECT 1` first;
//! a connection returned while still inside a transaction is discarded and
//! the pool opens a fresh one in its place.

use std::time::Duration;

use r2d2::ManageConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};

use crate::config::DatabaseUrl;
use crate::Result;

pub type PooledConnection = r2d2::PooledConnection<CheckedManager>;

#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Upper bound on simultaneously open connections
    pub max_size: u32,
    /// How long SQLite waits on a locked database before failing
    pub busy_timeout: Duration,
    /// Open read-write and create the database file when it does not exist
    pub create_if_missing: bool,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_size: 8,
            busy_timeout: Duration::from_secs(5),
            create_if_missing: false,
        }
    }
}

/// `SqliteConnectionManager` with a `SELECT 1` liveness check
pub struct CheckedManager(SqliteConnectionManager);

impl ManageConnection for CheckedManager {
    type Connection = Connection;
    type Error = rusqlite::Error;

    fn connect(&self) -> std::result::Result<Connection, rusqlite::Error> {
        self.0.connect()
    }

    fn is_valid(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)).map(|_| ())
    }

    fn has_broken(&self, conn: &mut Connection) -> bool {
        !conn.is_autocommit()
    }
}

pub struct ConnectionPool {
    url: DatabaseUrl,
    inner: r2d2::Pool<CheckedManager>,
}

impl ConnectionPool {
    /// Build a pool and open its first connection, so an unreachable store
    /// is reported here rather than on the first query.
    pub fn open(url: DatabaseUrl, options: PoolOptions) -> Result<Self> {
        let flags = if options.create_if_missing {
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
        } else {
            OpenFlags::SQLITE_OPEN_READ_ONLY
        };
        let busy_timeout = options.busy_timeout;

        let manager = CheckedManager(
            SqliteConnectionManager::file(url.target())
                .with_flags(flags | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX)
                .with_init(move |conn| {
                    conn.busy_timeout(busy_timeout)?;
                    rusqlite::vtab::array::load_module(conn)
                }),
        );

        tracing::debug!("Opening connection to {}", url);
        manager.connect()?;

        let inner = r2d2::Pool::builder()
            .max_size(options.max_size.max(1))
            .min_idle(Some(1))
            .test_on_check_out(true)
            .build(manager)?;

        Ok(Self { url, inner })
    }

    pub fn url(&self) -> &DatabaseUrl {
        &self.url
    }

    /// Check out a live connection, blocking while the pool is exhausted
    pub fn get(&self) -> Result<PooledConnection> {
        Ok(self.inner.get()?)
    }

    /// Run `f` inside one read-only unit of work: check out a connection,
    /// begin a transaction, commit on success and return the connection.
    /// An error rolls the transaction back.
    pub fn read_scope<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.get()?;
        let tx = conn.transaction()?;
        let out = f(&*tx)?;
        tx.commit()?;
        Ok(out)
    }
}
