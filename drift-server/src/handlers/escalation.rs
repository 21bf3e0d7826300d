//! Escalation handler

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::models::{EscalationQuery, EscalationResponse};
use crate::{AppError, AppResult, AppState};

/// Notification chain for a service; unknown services get an empty chain
pub async fn resolve(
    State(state): State<AppState>,
    Path(_session_id): Path<String>,
    Query(query): Query<EscalationQuery>,
) -> AppResult<Json<EscalationResponse>> {
    let service_id = query
        .service_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::ValidationError("serviceId query parameter is required".to_string()))?;

    let chain = state.engine.resolve_escalation(service_id);
    tracing::debug!("Escalation for {}: {} step(s)", service_id, chain.len());
    Ok(Json(EscalationResponse { chain }))
}
