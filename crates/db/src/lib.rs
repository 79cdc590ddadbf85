//! PostgreSQL persistence for the parking service.
//!
//! Repositories are thin wrappers over `sqlx` queries returning `sqlx::Error`;
//! [`PgStore`] composes them into the transactional commands of
//! [`klyra_core::store::ParkingStore`].

use klyra_core::error::CoreError;
use sqlx::postgres::PgPoolOptions;

pub mod models;
pub mod repositories;
pub mod store;

pub use store::PgStore;

pub type DbPool = sqlx::PgPool;

/// PostgreSQL SQLSTATE for an exclusion constraint violation.
const EXCLUSION_VIOLATION: &str = "23P01";
/// PostgreSQL SQLSTATE for a unique constraint violation.
const UNIQUE_VIOLATION: &str = "23505";
/// PostgreSQL SQLSTATE for a detected deadlock.
const DEADLOCK_DETECTED: &str = "40P01";
/// PostgreSQL SQLSTATE for a serialization failure.
const SERIALIZATION_FAILURE: &str = "40001";

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}

/// Whether the error is the buffered-window exclusion constraint firing.
pub fn is_exclusion_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some(EXCLUSION_VIOLATION))
}

/// Map a `sqlx` error onto the domain taxonomy.
///
/// - exclusion violations (`23P01`) become `BookingConflict`
/// - unique violations on `uq_*` constraints become `Conflict`
/// - pool, I/O, deadlock and serialization failures become `Transient`
/// - everything else is `Internal`
pub fn map_db_error(err: sqlx::Error) -> CoreError {
    match &err {
        sqlx::Error::Database(db) => {
            let code = db.code();
            match code.as_deref() {
                Some(EXCLUSION_VIOLATION) => {
                    return CoreError::BookingConflict(
                        "Booking window overlaps another booking on this spot \
                         (including 30-minute buffer)"
                            .to_string(),
                    );
                }
                Some(UNIQUE_VIOLATION) => {
                    let constraint = db.constraint().unwrap_or("unknown");
                    if constraint.starts_with("uq_") {
                        return CoreError::Conflict(format!(
                            "Duplicate value violates unique constraint: {constraint}"
                        ));
                    }
                }
                Some(DEADLOCK_DETECTED) | Some(SERIALIZATION_FAILURE) => {
                    return CoreError::Transient(db.message().to_string());
                }
                _ => {}
            }
            tracing::error!(error = %db, "Database error");
            CoreError::Internal("Database error".to_string())
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            tracing::warn!(error = %err, "Database unavailable");
            CoreError::Transient(err.to_string())
        }
        other => {
            tracing::error!(error = %other, "Database error");
            CoreError::Internal("Database error".to_string())
        }
    }
}
