//! # Database Errors
//!
//! ```text
//! sqlx::Error ──► DbError ──► StoreError (tally-core) ──► CoreError::Store
//!                 │
//!                 └── constraint failures are classified by sqlx's
//!                     ErrorKind, not by matching message text
//! ```

use sqlx::error::ErrorKind;
use tally_core::StoreError;
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// A UNIQUE index rejected the write, e.g. a product code already used
    /// by the same owner.
    ///
    /// `field` holds SQLite's column list (`products.owner_id, products.code`).
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// A CHECK rejected the write (`stock >= 0`, `price_cents >= 0`, status).
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// The database couldn't be opened or the pool is closed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// No connection became free within the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Query failed: {0}")]
    QueryFailed(String),
}

impl DbError {
    /// Attaches the value being written to a unique violation.
    ///
    /// SQLite only names the constrained columns.
    pub fn with_duplicate_value(self, value: &str) -> Self {
        match self {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: value.to_string(),
            },
            other => other,
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    ErrorKind::UniqueViolation => DbError::UniqueViolation {
                        // "UNIQUE constraint failed: products.owner_id, products.code"
                        field: message
                            .split_once(": ")
                            .map(|(_, columns)| columns.to_string())
                            .unwrap_or(message),
                        value: String::new(),
                    },
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation(message),
                    ErrorKind::CheckViolation => DbError::CheckViolation(message),
                    _ => DbError::QueryFailed(message),
                }
            }
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            other => DbError::QueryFailed(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// ```text
/// UniqueViolation                      → StoreError::Duplicate
/// ConnectionFailed / PoolExhausted     → StoreError::Unavailable
/// everything else                      → StoreError::Backend
/// ```
impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::UniqueViolation { field, value } => StoreError::Duplicate { field, value },
            DbError::ConnectionFailed(_) | DbError::PoolExhausted => {
                StoreError::Unavailable(err.to_string())
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_unique_violation_is_classified() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let insert = "INSERT INTO products (owner_id, code, name, description, price_cents, stock, created_at, updated_at) \
                      VALUES (1, 'A-1', 'A', '', 100, 1, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')";

        sqlx::query(insert).execute(db.pool()).await.unwrap();
        let err = DbError::from(sqlx::query(insert).execute(db.pool()).await.unwrap_err())
            .with_duplicate_value("A-1");

        match err {
            DbError::UniqueViolation { field, value } => {
                assert_eq!(field, "products.owner_id, products.code");
                assert_eq!(value, "A-1");
            }
            other => panic!("expected unique violation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_check_violation_is_classified() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = sqlx::query(
            "INSERT INTO products (owner_id, code, name, description, price_cents, stock, created_at, updated_at) \
             VALUES (1, 'A-1', 'A', '', 100, -1, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .execute(db.pool())
        .await
        .unwrap_err();

        assert!(matches!(DbError::from(err), DbError::CheckViolation(_)));
    }

    #[test]
    fn test_store_error_mapping() {
        let err: StoreError = DbError::UniqueViolation {
            field: "products.owner_id, products.code".to_string(),
            value: "A-1".to_string(),
        }
        .into();
        assert!(matches!(err, StoreError::Duplicate { ref value, .. } if value == "A-1"));

        let err: StoreError = DbError::PoolExhausted.into();
        assert!(matches!(err, StoreError::Unavailable(_)));

        let err: StoreError = DbError::CheckViolation("stock".to_string()).into();
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
