//! Session models

use drift_core::{EscalationStep, Snapshot};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreated {
    pub session_id: String,
    pub snapshot: Snapshot,
}

#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    pub snapshot: Snapshot,
}

#[derive(Debug, Serialize)]
pub struct SessionList {
    pub sessions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct EscalationResponse {
    pub chain: Vec<EscalationStep>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationQuery {
    pub service_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ArtifactQuery {
    pub organization: Option<String>,
    pub project: Option<String>,
    pub service: Option<String>,
}

/// Optional body for session creation
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSession {
    pub session_id: Option<String>,
}
