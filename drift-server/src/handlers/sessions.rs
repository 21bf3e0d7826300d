//! Session handlers
//!
//! Thin wrappers over the session engine. Body decoding failures map to the
//! operation's validation message so clients always see the same contract.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use drift_core::{MutationRequest, OverrideRequest, PolicyRequest, ValidationError};

use crate::models::{CreateSession, SessionCreated, SessionList, SnapshotResponse};
use crate::{AppResult, AppState};

/// Create a session with a fresh snapshot
pub async fn create(
    State(state): State<AppState>,
    body: Option<Json<CreateSession>>,
) -> AppResult<(StatusCode, Json<SessionCreated>)> {
    let requested = body.and_then(|Json(b)| b.session_id);
    let snapshot = state.engine.init(requested.as_deref()).await?;
    tracing::info!("Session {} created", snapshot.session_id);

    Ok((
        StatusCode::CREATED,
        Json(SessionCreated {
            session_id: snapshot.session_id.clone(),
            snapshot,
        }),
    ))
}

/// Known session ids
pub async fn list(State(state): State<AppState>) -> AppResult<Json<SessionList>> {
    let sessions = state.engine.list_sessions().await?;
    Ok(Json(SessionList { sessions }))
}

/// Current snapshot, expired overrides compacted
pub async fn snapshot(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<SnapshotResponse>> {
    let snapshot = state.engine.read_snapshot(&id).await?;
    Ok(Json(SnapshotResponse { snapshot }))
}

/// Append a mutation to the session log
pub async fn inject_mutation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<MutationRequest>, JsonRejection>,
) -> AppResult<Json<SnapshotResponse>> {
    let Json(req) = payload.map_err(|_| ValidationError::MutationTypeOrField)?;
    let snapshot = state.engine.inject_mutation(&id, &req).await?;
    tracing::info!(
        "Session {}: injected {} on {} ({} mutations)",
        id,
        req.kind.trim(),
        req.field_id.trim(),
        snapshot.mutations.len()
    );
    Ok(Json(SnapshotResponse { snapshot }))
}

/// Recompute findings, topology and gate
pub async fn run(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<SnapshotResponse>> {
    let snapshot = state.engine.recompute(&id).await?;
    let summary = &snapshot.run_summary;
    tracing::info!(
        "Session {} run {}: {} ({} findings, {} blocked)",
        id,
        summary.run_count,
        summary.gate,
        summary.finding_count,
        summary.blocked_count
    );
    Ok(Json(SnapshotResponse { snapshot }))
}

/// Replace the gate policy
pub async fn set_policy(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<PolicyRequest>, JsonRejection>,
) -> AppResult<Json<SnapshotResponse>> {
    let Json(req) = payload.map_err(|_| ValidationError::Policy)?;
    let snapshot = state.engine.set_policy(&id, &req).await?;
    tracing::info!(
        "Session {}: policy {} / {}",
        id,
        snapshot.policy.mode,
        snapshot.policy.fail_on
    );
    Ok(Json(SnapshotResponse { snapshot }))
}

/// Append a time-bounded override
pub async fn add_override(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<OverrideRequest>, JsonRejection>,
) -> AppResult<Json<SnapshotResponse>> {
    let Json(req) = payload.map_err(|_| ValidationError::OverrideFields)?;
    let snapshot = state.engine.add_override(&id, &req).await?;
    tracing::info!(
        "Session {}: override on {} until {}",
        id,
        req.field_id.trim(),
        req.expires.trim()
    );
    Ok(Json(SnapshotResponse { snapshot }))
}
