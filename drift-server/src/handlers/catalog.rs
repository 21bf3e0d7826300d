//! Catalog handler

use axum::{extract::State, Json};

use crate::models::CatalogSummary;
use crate::AppState;

/// Services, truth metadata and injectable mutation types
pub async fn summary(State(state): State<AppState>) -> Json<CatalogSummary> {
    Json(CatalogSummary::from_catalog(state.engine.catalog()))
}
