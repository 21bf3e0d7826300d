//! Snapshot
//!
//! Full per-session state and the unit of durable storage. Every session
//! operation loads one, works on a copy, and saves it back whole.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{ScenarioCatalog, ServiceNode, Truth};
use crate::compiler::Finding;
use crate::gate::RunSummary;
use crate::mutation::Mutation;
use crate::overrides::Override;
use crate::policy::Policy;
use crate::topology::{self, EdgeLink};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub truth: Truth,
    pub services: Vec<ServiceNode>,
    pub edges: Vec<EdgeLink>,
    pub findings: Vec<Finding>,
    pub mutations: Vec<Mutation>,
    pub overrides: Vec<Override>,
    pub policy: Policy,
    pub run_summary: RunSummary,
}

impl Snapshot {
    /// Fresh session state: empty logs, default policy, healthy baseline
    pub fn new(session_id: impl Into<String>, catalog: &ScenarioCatalog, now: DateTime<Utc>) -> Self {
        let policy = Policy::default();
        Self {
            session_id: session_id.into(),
            created_at: now,
            updated_at: now,
            truth: catalog.truth().clone(),
            services: catalog.services().to_vec(),
            edges: topology::baseline(catalog.edges()),
            findings: Vec::new(),
            mutations: Vec::new(),
            overrides: Vec::new(),
            policy,
            run_summary: RunSummary::initial(&policy),
        }
    }

    pub fn run_count(&self) -> u64 {
        self.run_summary.run_count
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::sample_catalog;
    use crate::gate::Gate;
    use crate::topology::EdgeStatus;

    #[test]
    fn test_new_snapshot_defaults() {
        let snapshot = Snapshot::new("s1", &sample_catalog(), Utc::now());
        assert_eq!(snapshot.run_count(), 0);
        assert_eq!(snapshot.run_summary.gate, Gate::Pass);
        assert_eq!(snapshot.policy, Policy::default());
        assert_eq!(snapshot.services.len(), 3);
        assert_eq!(snapshot.edges.len(), 2);
        assert!(snapshot.edges.iter().all(|e| e.status == EdgeStatus::Healthy));
        assert!(snapshot.mutations.is_empty() && snapshot.overrides.is_empty());
    }

    #[test]
    fn test_json_round_trip_keeps_state() {
        let snapshot = Snapshot::new("s1", &sample_catalog(), Utc::now());
        let raw = serde_json::to_string(&snapshot).unwrap();
        assert!(raw.contains("\"sessionId\":\"s1\""));
        assert!(raw.contains("\"runSummary\""));
        let back: Snapshot = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, snapshot);
    }
}
