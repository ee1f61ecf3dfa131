use beacon_shared::ValidationError;
use rusqlite::ErrorCode;
use thiserror::Error;

/// Kind of record an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Tier,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Tier => f.write_str("tier"),
        }
    }
}

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A user or tier with this key is already present.
    #[error("{entity} {key} already exists")]
    AlreadyExists { entity: Entity, key: String },

    /// No user or tier with this key.
    #[error("{entity} {key} does not exist")]
    NotFound { entity: Entity, key: String },

    /// Input rejected before it reached the database.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The database stayed locked by another writer past the retry budget.
    #[error("Database busy: gave up after {attempts} attempts")]
    Busy { attempts: u32 },

    /// Every freshly generated tier id was already in the id ledger.
    #[error("Could not issue a unique tier id after {attempts} attempts")]
    IdExhausted { attempts: u32 },

    /// bcrypt failure.
    #[error("Password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// A thread panicked while holding the connection.
    #[error("Database connection lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub(crate) fn already_exists(entity: Entity, key: &str) -> Self {
        Self::AlreadyExists {
            entity,
            key: key.to_string(),
        }
    }

    pub(crate) fn not_found(entity: Entity, key: &str) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Turn a unique/primary key violation on insert into `AlreadyExists`.
    pub(crate) fn from_insert(err: rusqlite::Error, entity: Entity, key: &str) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
                Self::already_exists(entity, key)
            }
            _ => Self::Sqlite(err),
        }
    }

    /// `SQLITE_BUSY` / `SQLITE_LOCKED`: another connection holds the lock.
    pub(crate) fn is_busy(&self) -> bool {
        matches!(
            self,
            Self::Sqlite(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::DatabaseBusy || e.code == ErrorCode::DatabaseLocked
        )
    }

    /// `true` when the store could not commit or read, as opposed to the
    /// caller supplying a bad or conflicting key.
    pub fn is_persistence_failure(&self) -> bool {
        !matches!(
            self,
            Self::AlreadyExists { .. } | Self::NotFound { .. } | Self::Validation(_)
        )
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_key() {
        assert_eq!(
            StoreError::already_exists(Entity::Tier, "pro").to_string(),
            "tier pro already exists"
        );
        assert_eq!(
            StoreError::not_found(Entity::User, "phil").to_string(),
            "user phil does not exist"
        );
    }

    #[test]
    fn test_persistence_failure_classification() {
        assert!(!StoreError::not_found(Entity::User, "phil").is_persistence_failure());
        assert!(!StoreError::Validation(ValidationError::EmptyPriceId).is_persistence_failure());
        assert!(StoreError::Busy { attempts: 4 }.is_persistence_failure());
        assert!(StoreError::Poisoned.is_persistence_failure());
    }

    #[test]
    fn test_busy_detection() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(StoreError::Sqlite(busy).is_busy());

        let constraint = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
            None,
        );
        assert!(!StoreError::Sqlite(constraint).is_busy());
    }
}
