//! # Schema Migrations
//!
//! SQL files under `migrations/sqlite/` are embedded at compile time and
//! applied in filename order; sqlx records each one in `_sqlx_migrations`.
//!
//! ```text
//! migrations/sqlite/
//! └── 001_initial_schema.sql   products, orders, order_items
//! ```
//!
//! Applied files are checksummed. Change the schema with a new
//! `NNN_description.sql`, never by editing an applied one.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every migration not yet recorded.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let (total, applied) = migration_status(pool).await?;
    if total == applied {
        debug!(applied, "Schema up to date");
        return Ok(());
    }

    MIGRATOR.run(pool).await?;

    info!(pending = total - applied, "Migrations applied");
    Ok(())
}

/// `(embedded, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let exists: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;

    let applied: i64 = if exists == 0 {
        0
    } else {
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?
    };

    Ok((MIGRATOR.migrations.len(), applied as usize))
}
