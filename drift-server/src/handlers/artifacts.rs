//! Run artifact export handler

use axum::{
    extract::{Path, Query, State},
    Json,
};
use drift_core::ArtifactExport;

use crate::models::ArtifactQuery;
use crate::{AppResult, AppState};

/// Ingest envelope and storage key for the session's last run
pub async fn export(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ArtifactQuery>,
) -> AppResult<Json<ArtifactExport>> {
    let export = state
        .engine
        .export_artifact(
            &id,
            query.organization.as_deref().unwrap_or_default(),
            query.project.as_deref().unwrap_or_default(),
            query.service.as_deref(),
        )
        .await?;
    tracing::info!("Session {}: exported {}", id, export.key);
    Ok(Json(export))
}
