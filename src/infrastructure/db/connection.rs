use crate::domain::error::{AppError, Result};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

const EQUIPMENT_SCHEMA_V1: &str = include_str!("../../../resources/schema.sql");

const CURRENT_SCHEMA_VERSION: i64 = 1;

/// Connection pool for the equipment analytics database
#[derive(Clone)]
pub struct EquipmentDb {
    pool: SqlitePool,
}

impl EquipmentDb {
    pub async fn connect(db_path: &Path) -> Result<Self> {
        let db_url = db_path_to_url(db_path)?;
        let options = SqliteConnectOptions::from_str(&db_url)
            .map_err(|e| {
                AppError::PersistenceError(format!("Failed to parse equipment DB URL: {e}"))
            })?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::PersistenceError(format!("Failed to connect equipment DB: {e}"))
            })?;

        apply_migrations(&pool).await?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|e| {
                AppError::PersistenceError(format!("Equipment DB health check failed: {e}"))
            })?;

        tracing::debug!(db_path = %db_path.display(), "Equipment DB ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn apply_migrations(pool: &SqlitePool) -> Result<()> {
    // PRAGMA user_version tracks the schema version; v1 == schema.sql.
    let version: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await
        .map_err(|e| {
            AppError::PersistenceError(format!("Failed to read equipment DB user_version: {e}"))
        })?;

    if version < 1 {
        apply_schema(pool, EQUIPMENT_SCHEMA_V1).await?;
    }

    if version < CURRENT_SCHEMA_VERSION {
        let pragma = format!("PRAGMA user_version = {}", CURRENT_SCHEMA_VERSION);
        sqlx::query(&pragma).execute(pool).await.map_err(|e| {
            AppError::PersistenceError(format!("Failed to set equipment DB user_version: {e}"))
        })?;
        tracing::info!(
            from = version,
            to = CURRENT_SCHEMA_VERSION,
            "Migrated equipment DB schema"
        );
    }

    Ok(())
}

async fn apply_schema(pool: &SqlitePool, schema: &str) -> Result<()> {
    for statement in schema.split(';') {
        let stmt = strip_comments(statement);
        if stmt.is_empty() {
            continue;
        }
        sqlx::query(&stmt).execute(pool).await.map_err(|e| {
            AppError::PersistenceError(format!("Failed to apply equipment schema: {e}"))
        })?;
    }
    Ok(())
}

fn strip_comments(statement: &str) -> String {
    statement
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn db_path_to_url(db_path: &Path) -> Result<String> {
    let db_path_str = db_path.to_str().ok_or_else(|| {
        AppError::PersistenceError("Equipment DB path is not valid UTF-8".to_string())
    })?;
    Ok(format!("sqlite://{}", db_path_str.replace("\\", "/")))
}
