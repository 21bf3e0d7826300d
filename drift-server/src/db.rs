//! Database module - PostgreSQL snapshot store

use async_trait::async_trait;
use drift_core::{Snapshot, SnapshotStore, StoreError};
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool};

/// Create database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Apply the snapshot schema
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(SCHEMA_SQL)
        .execute(pool)
        .await?;

    tracing::info!("Database schema applied successfully");
    Ok(())
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS drift_snapshots (
    session_id TEXT PRIMARY KEY,
    snapshot JSONB NOT NULL,
    run_count BIGINT NOT NULL DEFAULT 0,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const UPSERT_SQL: &str = r#"
INSERT INTO drift_snapshots (session_id, snapshot, run_count, updated_at)
VALUES ($1, $2, $3, $4)
ON CONFLICT (session_id) DO UPDATE
SET snapshot = EXCLUDED.snapshot,
    run_count = EXCLUDED.run_count,
    updated_at = EXCLUDED.updated_at
"#;

/// One JSONB row per session
#[derive(Debug, Clone)]
pub struct PgSnapshotStore {
    pool: PgPool,
}

impl PgSnapshotStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
    async fn load(&self, session_id: &str) -> Result<Option<Snapshot>, StoreError> {
        let row: Option<(Json<Snapshot>,)> =
            sqlx::query_as("SELECT snapshot FROM drift_snapshots WHERE session_id = $1")
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| match e {
                    sqlx::Error::ColumnDecode { source, .. } => StoreError::Corrupt {
                        session_id: session_id.to_string(),
                        detail: source.to_string(),
                    },
                    other => backend(other),
                })?;

        Ok(row.map(|(Json(snapshot),)| snapshot))
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let run_count = i64::try_from(snapshot.run_count()).unwrap_or(i64::MAX);
        sqlx::query(UPSERT_SQL)
            .bind(&snapshot.session_id)
            .bind(Json(snapshot))
            .bind(run_count)
            .bind(snapshot.updated_at)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar("SELECT session_id FROM drift_snapshots ORDER BY session_id")
            .fetch_all(&self.pool)
            .await
            .map_err(backend)
    }
}
