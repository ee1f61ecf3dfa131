//! Database connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] and guarantees that
//! migrations are run before any other operation.
//!
//! The handle is `Send + Sync`: the connection sits behind a mutex so one
//! handle can be shared (e.g. via `Arc`) by every thread of the service,
//! while separate processes (admin commands) open their own handle on the
//! same file. Writes always go through [`Database::write`], which takes the
//! SQLite write lock up front (`BEGIN IMMEDIATE`) so that an existence check
//! and the following insert can never interleave with another writer.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use beacon_shared::constants::DEFAULT_BCRYPT_COST;
use directories::ProjectDirs;
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::error::{Result, StoreError};
use crate::migrations;
use crate::password;

const DUMMY_PASSWORD: &str = "beacon-unknown-user";

/// Tunables for a [`Database`] handle.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// bcrypt cost used for new password hashes.
    pub bcrypt_cost: u32,
    /// How long SQLite waits on a locked database before reporting busy.
    pub busy_timeout: Duration,
    /// Extra attempts for a write that still hit a busy database.
    pub write_retries: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            busy_timeout: Duration::from_secs(5),
            write_retries: 3,
        }
    }
}

/// Shared handle on the user/tier database.
pub struct Database {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
    options: StoreOptions,
    /// Hashes checked when a login names an unknown user, keyed by bcrypt
    /// cost, so that both outcomes cost one verification at the same cost.
    dummy_hashes: Mutex<HashMap<u32, String>>,
}

impl Database {
    /// Default database location in the platform data directory:
    /// - Linux:   `~/.local/share/beacon/user.db`
    /// - macOS:   `~/Library/Application Support/io.beacon.beacon/user.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\beacon\beacon\data\user.db`
    pub fn default_path() -> Result<PathBuf> {
        let project_dirs =
            ProjectDirs::from("io", "beacon", "beacon").ok_or(StoreError::NoDataDir)?;
        Ok(project_dirs.data_dir().join("user.db"))
    }

    /// Open (or create) the database at the default location.
    pub fn new(options: StoreOptions) -> Result<Self> {
        let db_path = Self::default_path()?;
        Self::open_at(&db_path, options)
    }

    /// Open (or create) a database at an explicit path, creating missing
    /// parent directories.
    pub fn open_at(path: &Path, options: StoreOptions) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        tracing::info!(path = %path.display(), "opening database");

        let conn = Connection::open(path)?;
        Self::from_connection(conn, Some(path.to_path_buf()), options)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory(options: StoreOptions) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, None, options)
    }

    fn from_connection(
        mut conn: Connection,
        path: Option<PathBuf>,
        options: StoreOptions,
    ) -> Result<Self> {
        conn.busy_timeout(options.busy_timeout)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run_migrations(&mut conn)?;

        let dummy_hash = password::hash_password(DUMMY_PASSWORD, options.bcrypt_cost)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path,
            dummy_hashes: Mutex::new(HashMap::from([(options.bcrypt_cost, dummy_hash)])),
            options,
        })
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Dummy hash at `cost`, created on first use.
    pub(crate) fn dummy_hash(&self, cost: u32) -> Result<String> {
        let mut hashes = self.dummy_hashes.lock().map_err(|_| StoreError::Poisoned)?;
        if let Some(hash) = hashes.get(&cost) {
            return Ok(hash.clone());
        }
        let hash = password::hash_password(DUMMY_PASSWORD, cost)?;
        hashes.insert(cost, hash.clone());
        Ok(hash)
    }

    #[cfg(test)]
    pub(crate) fn dummy_costs(&self) -> Vec<u32> {
        let mut costs: Vec<u32> = self.dummy_hashes.lock().unwrap().keys().copied().collect();
        costs.sort_unstable();
        costs
    }

    /// Lock the connection for a read.
    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Run `op` inside an immediate transaction and commit it.
    ///
    /// Any error from `op` rolls the transaction back. A busy database is
    /// retried up to `write_retries` times with a short backoff; everything
    /// else is returned as-is.
    pub(crate) fn write<T, F>(&self, mut op: F) -> Result<T>
    where
        F: FnMut(&Transaction<'_>) -> Result<T>,
    {
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            match self.try_write(&mut op) {
                Err(e) if e.is_busy() => {
                    if attempts > self.options.write_retries {
                        tracing::error!(attempts, "database still busy, giving up");
                        return Err(StoreError::Busy { attempts });
                    }
                    tracing::warn!(attempts, error = %e, "database busy, retrying write");
                    std::thread::sleep(Duration::from_millis(25 * u64::from(attempts)));
                }
                other => return other,
            }
        }
    }

    fn try_write<T, F>(&self, op: &mut F) -> Result<T>
    where
        F: FnMut(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = op(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Cheap bcrypt so tests stay fast.
    pub(crate) fn test_options() -> StoreOptions {
        StoreOptions {
            bcrypt_cost: 4,
            ..StoreOptions::default()
        }
    }

    #[test]
    fn open_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("user.db");

        let db = Database::open_at(&path, test_options()).expect("should open");
        assert_eq!(db.path(), Some(path.as_path()));
        drop(db);

        // Reopening runs no migration twice.
        let db = Database::open_at(&path, test_options()).expect("should reopen");
        let version: u32 = db
            .conn()
            .unwrap()
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, migrations::CURRENT_VERSION);
    }

    #[test]
    fn write_rolls_back_on_error() {
        let db = Database::open_in_memory(test_options()).unwrap();
        let result: Result<()> = db.write(|tx| {
            tx.execute(
                "INSERT INTO users (username, password_hash, role, created_at)
                 VALUES ('phil', 'x', 'user', '2024-01-01T00:00:00Z')",
                [],
            )?;
            Err(StoreError::not_found(crate::Entity::Tier, "pro"))
        });
        assert!(result.is_err());

        let count: i64 = db
            .conn()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn busy_writer_gives_up_after_retries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user.db");
        let options = StoreOptions {
            bcrypt_cost: 4,
            busy_timeout: Duration::from_millis(10),
            write_retries: 1,
        };
        let db = Database::open_at(&path, options).unwrap();

        // A second connection holds the write lock.
        let mut other = Connection::open(&path).unwrap();
        let blocker = other
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .unwrap();

        let result = db.write(|tx| Ok(tx.execute("DELETE FROM users", [])?));
        assert!(matches!(result, Err(StoreError::Busy { attempts: 2 })));

        blocker.rollback().unwrap();
        assert!(db.write(|tx| Ok(tx.execute("DELETE FROM users", [])?)).is_ok());
    }
}
