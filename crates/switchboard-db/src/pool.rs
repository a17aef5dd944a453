//! SQLite pool construction for the call store.
//!
//! The access pattern is webhook-heavy: many small single-row writes
//! (webhook log appends, status updates) interleaved with list and detail
//! reads. WAL mode lets those reads proceed while a write commits, and the
//! busy timeout absorbs writer contention instead of surfacing
//! `SQLITE_BUSY` to a handler mid-request.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use thiserror::Error;

/// Connection tunables, sourced from the `[database]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// How long a connection waits on a locked database before failing,
    /// in milliseconds.
    pub busy_timeout_ms: u64,

    /// Upper bound on pooled connections. Writes serialize on SQLite's
    /// single writer anyway, so this mainly sizes concurrent reads.
    pub pool_max_size: u32,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 8,
        }
    }
}

/// The shared SQLite connection pool handed to every handler.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Errors that can occur when building the pool.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to build sqlite connection pool: {0}")]
    Build(#[from] r2d2::Error),
}

/// Builds the connection pool for `db_path`, creating the database file if
/// needed. Every connection checked out has WAL, foreign keys, and the busy
/// timeout applied; a connection that cannot reach WAL mode is rejected at
/// init rather than handed to a caller.
///
/// `:memory:` is accepted for tests; SQLite reports journal mode `memory`
/// there, which is treated as fine.
///
/// # Errors
///
/// Returns [`PoolError::Build`] if the pool cannot be constructed.
pub fn create_pool(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, PoolError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;

    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(flags)
        .with_init(move |conn| {
            conn.pragma_update(None, "busy_timeout", settings.busy_timeout_ms as i64)?;
            conn.pragma_update(None, "foreign_keys", "ON")?;

            let journal_mode: String =
                conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
            if journal_mode != "wal" && journal_mode != "memory" {
                return Err(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                    Some(format!("journal_mode is {journal_mode}, expected wal")),
                ));
            }
            Ok(())
        });

    let pool = Pool::builder()
        .max_size(settings.pool_max_size)
        .build(manager)?;

    Ok(pool)
}
