//! Run Artifact Export
//!
//! Packages a session's last run as the envelope the ingest storage service
//! accepts, together with the deterministic key it is stored under:
//!
//! `<prefix>/v1/org=<org>/project=<project>/service=<service>/date=<YYYY-MM-DD>/run=<run_id>/payload.json`
//!
//! Path tokens are lowercased; any run of other characters collapses to `-`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{ServiceNode, Truth};
use crate::compiler::Finding;
use crate::gate::{RunSummary, SeverityCounts};
use crate::policy::Policy;
use crate::session::ValidationError;
use crate::snapshot::Snapshot;
use crate::topology::EdgeLink;

pub const DEFAULT_PREFIX: &str = "stricture";

/// Service token used when a run has no findings to attribute
pub const ALL_SERVICES: &str = "all";

/// Graph state at the time of the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineageArtifact {
    pub session_id: String,
    pub truth: Truth,
    pub services: Vec<ServiceNode>,
    pub edges: Vec<EdgeLink>,
    pub policy: Policy,
}

/// Drift report: severity counts plus the ordered active findings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffReport {
    pub summary: SeverityCounts,
    pub changes: Vec<Finding>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactEnvelope {
    pub organization: String,
    pub project: String,
    pub service: String,
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub artifact: LineageArtifact,
    pub diff: DiffReport,
    pub summary: RunSummary,
}

/// Envelope plus the key it would be stored under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactExport {
    pub key: String,
    pub payload: ArtifactEnvelope,
}

impl ArtifactEnvelope {
    /// Build from the snapshot's last run. `service` defaults to the owner of
    /// the top finding.
    pub fn from_snapshot(
        snapshot: &Snapshot,
        organization: &str,
        project: &str,
        service: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let organization = sanitize_path_token(organization);
        let project = sanitize_path_token(project);
        if organization.is_empty() || project.is_empty() {
            return Err(ValidationError::ArtifactScope);
        }

        let service = service
            .map(sanitize_path_token)
            .filter(|s| !s.is_empty())
            .or_else(|| snapshot.findings.first().map(|f| sanitize_path_token(&f.service_id)))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| ALL_SERVICES.to_string());

        Ok(Self {
            organization,
            project,
            service,
            run_id: format!("run-{}", snapshot.run_count()),
            generated_at: snapshot.run_summary.generated_at.unwrap_or(snapshot.updated_at),
            artifact: LineageArtifact {
                session_id: snapshot.session_id.clone(),
                truth: snapshot.truth.clone(),
                services: snapshot.services.clone(),
                edges: snapshot.edges.clone(),
                policy: snapshot.policy,
            },
            diff: DiffReport {
                summary: SeverityCounts::tally(&snapshot.findings),
                changes: snapshot.findings.clone(),
            },
            summary: snapshot.run_summary.clone(),
        })
    }

    pub fn storage_key(&self, prefix: &str) -> String {
        let prefix = prefix.trim().trim_matches('/');
        let prefix = if prefix.is_empty() { DEFAULT_PREFIX } else { prefix };
        format!(
            "{}/v1/org={}/project={}/service={}/date={}/run={}/payload.json",
            prefix,
            self.organization,
            self.project,
            self.service,
            self.generated_at.format("%Y-%m-%d"),
            self.run_id
        )
    }

    pub fn into_export(self, prefix: &str) -> ArtifactExport {
        ArtifactExport {
            key: self.storage_key(prefix),
            payload: self,
        }
    }
}

/// Lowercase ASCII alphanumerics; every other run collapses to one `-`
pub fn sanitize_path_token(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut last_dash = false;
    for c in value.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    out.trim_matches('-').to_string()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::sample_catalog;
    use crate::change::ChangeType;
    use crate::gate;
    use crate::policy::Severity;
    use chrono::TimeZone;

    fn snapshot_with_run() -> Snapshot {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();
        let mut snapshot = Snapshot::new("s1", &sample_catalog(), now);
        snapshot.findings = vec![Finding {
            id: "m1:0".to_string(),
            severity: Severity::High,
            service_id: "Payments".to_string(),
            field_id: "response_x".to_string(),
            change_type: ChangeType::EnumChanged,
            summary: String::new(),
            remediation: String::new(),
            impact: String::new(),
            timestamp: now,
            mutation_id: "m1".to_string(),
        }];
        snapshot.run_summary = gate::evaluate(&snapshot.findings, 0, &snapshot.policy, 3, now);
        snapshot
    }

    #[test]
    fn test_sanitize_path_token() {
        assert_eq!(sanitize_path_token("  Acme Corp "), "acme-corp");
        assert_eq!(sanitize_path_token("a__b..c"), "a-b-c");
        assert_eq!(sanitize_path_token("../../etc"), "etc");
        assert_eq!(sanitize_path_token("   "), "");
    }

    #[test]
    fn test_storage_key_layout() {
        let envelope = ArtifactEnvelope::from_snapshot(&snapshot_with_run(), "Acme", "Web App", None).unwrap();
        assert_eq!(envelope.run_id, "run-3");
        assert_eq!(envelope.service, "payments");
        assert_eq!(
            envelope.storage_key("stricture/"),
            "stricture/v1/org=acme/project=web-app/service=payments/date=2026-03-14/run=run-3/payload.json"
        );
        assert!(envelope.storage_key("").starts_with("stricture/v1/"));
    }

    #[test]
    fn test_diff_payload_mirrors_findings() {
        let envelope = ArtifactEnvelope::from_snapshot(&snapshot_with_run(), "acme", "web", Some("checkout")).unwrap();
        assert_eq!(envelope.service, "checkout");
        assert_eq!(envelope.diff.summary.high, 1);
        assert_eq!(envelope.diff.changes.len(), 1);
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["runId"], "run-3");
        assert_eq!(json["diff"]["summary"]["total"], 1);
    }

    #[test]
    fn test_requires_scope() {
        let err = ArtifactEnvelope::from_snapshot(&snapshot_with_run(), " ", "web", None).unwrap_err();
        assert_eq!(err, ValidationError::ArtifactScope);
    }

    #[test]
    fn test_no_findings_uses_all_token() {
        let snapshot = Snapshot::new("s1", &sample_catalog(), Utc::now());
        let envelope = ArtifactEnvelope::from_snapshot(&snapshot, "acme", "web", None).unwrap();
        assert_eq!(envelope.service, ALL_SERVICES);
        assert_eq!(envelope.run_id, "run-0");
    }
}
