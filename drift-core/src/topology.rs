//! Topology Projector
//!
//! Maps active findings onto the catalog's baseline edge list. Every pass
//! starts from all-healthy; a finding can only push an edge to a worse state.

use serde::{Deserialize, Serialize};

use crate::catalog::CatalogEdge;
use crate::compiler::Finding;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeStatus {
    #[default]
    Healthy,
    Warning,
    Blocked,
}

impl EdgeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeStatus::Healthy => "healthy",
            EdgeStatus::Warning => "warning",
            EdgeStatus::Blocked => "blocked",
        }
    }

    /// Status a finding pushes its edges towards
    pub fn for_finding(finding: &Finding) -> Self {
        if finding.severity.is_max() {
            EdgeStatus::Blocked
        } else {
            EdgeStatus::Warning
        }
    }
}

impl std::fmt::Display for EdgeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Data-flow edge with its derived status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeLink {
    pub id: String,
    pub from: String,
    pub to: String,
    pub field_id: String,
    pub label: String,
    pub status: EdgeStatus,
}

impl From<&CatalogEdge> for EdgeLink {
    fn from(edge: &CatalogEdge) -> Self {
        Self {
            id: edge.id.clone(),
            from: edge.from.clone(),
            to: edge.to.clone(),
            field_id: edge.field_id.clone(),
            label: edge.label.clone(),
            status: EdgeStatus::Healthy,
        }
    }
}

/// All-healthy projection of the baseline
pub fn baseline(edges: &[CatalogEdge]) -> Vec<EdgeLink> {
    edges.iter().map(EdgeLink::from).collect()
}

pub fn project(edges: &[CatalogEdge], active: &[Finding]) -> Vec<EdgeLink> {
    let mut links = baseline(edges);
    for finding in active {
        let target = EdgeStatus::for_finding(finding);
        for link in links.iter_mut().filter(|l| l.field_id == finding.field_id) {
            link.status = link.status.max(target);
        }
    }
    links
}

// ============================================================================
// TESTS
// ============================================================================
