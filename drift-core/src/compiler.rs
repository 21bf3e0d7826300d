//! Finding Compiler
//!
//! Expands the mutation log against the scenario catalog into an ordered,
//! deterministic finding set. Pure: same mutations and catalog, same output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::str::FromStr;

use crate::catalog::{normalize_id, ScenarioCatalog};
use crate::change::ChangeType;
use crate::mutation::Mutation;
use crate::policy::Severity;

// ============================================================================
// FINDING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// `{mutationId}:{index}`
    pub id: String,
    pub severity: Severity,
    pub service_id: String,
    pub field_id: String,
    pub change_type: ChangeType,
    pub summary: String,
    pub remediation: String,
    pub impact: String,
    pub timestamp: DateTime<Utc>,
    pub mutation_id: String,
}

// ============================================================================
// CATALOG MISS
// ============================================================================

/// What to do with a mutation that has no scenario entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogMissPolicy {
    /// Accept silently, zero findings
    #[default]
    Drop,
    /// Emit one `low` unknown-impact finding
    Surface,
}

impl CatalogMissPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogMissPolicy::Drop => "drop",
            CatalogMissPolicy::Surface => "surface",
        }
    }
}

impl std::fmt::Display for CatalogMissPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CatalogMissPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "drop" => Ok(CatalogMissPolicy::Drop),
            "surface" => Ok(CatalogMissPolicy::Surface),
            _ => Err(()),
        }
    }
}

// ============================================================================
// COMPILE
// ============================================================================

/// Compile the full finding set for a mutation log
pub fn compile(
    mutations: &[Mutation],
    catalog: &ScenarioCatalog,
    on_miss: CatalogMissPolicy,
) -> Vec<Finding> {
    let mut findings = Vec::new();

    for mutation in mutations {
        let Some(scenario) = catalog.scenario(&mutation.field_id, mutation.kind) else {
            if on_miss == CatalogMissPolicy::Surface {
                findings.push(unknown_impact(mutation));
            } else {
                log::debug!(
                    "No scenario for {} on {}, mutation {} yields nothing",
                    mutation.kind,
                    mutation.field_id,
                    mutation.id
                );
            }
            continue;
        };

        for (index, change) in scenario.changes.iter().enumerate() {
            let guidance = change.change_type.guidance_or_generic();
            let service_id = catalog
                .field_owner(&change.field_id)
                .map(normalize_id)
                .unwrap_or_else(|| mutation.service_id.clone());
            let summary = if change.message.trim().is_empty() {
                guidance.what_changed.clone()
            } else {
                change.message.clone()
            };

            findings.push(Finding {
                id: format!("{}:{}", mutation.id, index),
                severity: change.severity,
                service_id,
                field_id: change.field_id.clone(),
                change_type: change.change_type,
                summary,
                remediation: non_blank(change.suggestion.as_deref()).unwrap_or(guidance.next_step),
                impact: non_blank(change.validation.as_deref()).unwrap_or(guidance.why_it_matters),
                timestamp: mutation.timestamp,
                mutation_id: mutation.id.clone(),
            });
        }
    }

    sort_findings(&mut findings);
    findings
}

/// Severity desc, field id asc, change type asc; ties keep input order
pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(|a, b| {
        Reverse(a.severity)
            .cmp(&Reverse(b.severity))
            .then_with(|| a.field_id.cmp(&b.field_id))
            .then_with(|| a.change_type.as_str().cmp(b.change_type.as_str()))
    });
}

fn unknown_impact(mutation: &Mutation) -> Finding {
    let guidance = mutation.kind.guidance_or_generic();
    Finding {
        id: format!("{}:0", mutation.id),
        severity: Severity::Low,
        service_id: mutation.service_id.clone(),
        field_id: mutation.field_id.clone(),
        change_type: mutation.kind,
        summary: format!(
            "No scenario coverage for {} on {}; impact unknown.",
            mutation.kind, mutation.field_id
        ),
        remediation: guidance.next_step,
        impact: guidance.why_it_matters,
        timestamp: mutation.timestamp,
        mutation_id: mutation.id.clone(),
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::{change, sample_document};
    use crate::catalog::{Scenario, ScenarioCatalog};
    use chrono::TimeZone;

    fn mutation(id: &str, kind: ChangeType, service: &str, field: &str) -> Mutation {
        Mutation {
            id: id.to_string(),
            kind,
            service_id: service.to_string(),
            field_id: field.to_string(),
            timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    fn catalog() -> ScenarioCatalog {
        ScenarioCatalog::from_document(sample_document()).unwrap()
    }

    #[test]
    fn test_single_high_finding() {
        let findings = compile(
            &[mutation("m1", ChangeType::EnumChanged, "a", "response_x")],
            &catalog(),
            CatalogMissPolicy::Drop,
        );
        assert_eq!(findings.len(), 1);
        let finding = &findings[0];
        assert_eq!(finding.id, "m1:0");
        assert_eq!(finding.severity, Severity::High);
        assert_eq!(finding.service_id, "a");
        assert_eq!(finding.mutation_id, "m1");
        assert!(finding.remediation.starts_with("Add enum contract tests"));
    }

    #[test]
    fn test_owner_resolved_from_change_field() {
        // source_version_changed on response_y also touches response_x, owned by a
        let findings = compile(
            &[mutation("m1", ChangeType::SourceVersionChanged, "b", "response_y")],
            &catalog(),
            CatalogMissPolicy::Drop,
        );
        assert_eq!(findings.len(), 2);
        let note = findings.iter().find(|f| f.change_type == ChangeType::NoteChanged).unwrap();
        assert_eq!(note.service_id, "a");
        assert_eq!(note.id, "m1:1");
        assert_eq!(note.remediation, crate::change::GENERIC_REMEDIATION);
    }

    #[test]
    fn test_ordering_independent_of_insertion() {
        let m1 = mutation("m1", ChangeType::SourceVersionChanged, "b", "response_y");
        let m2 = mutation("m2", ChangeType::EnumChanged, "a", "response_x");
        let m3 = mutation("m3", ChangeType::EnumChanged, "b", "response_y");

        let forward = compile(&[m1.clone(), m2.clone(), m3.clone()], &catalog(), CatalogMissPolicy::Drop);
        let order: Vec<_> = forward
            .iter()
            .map(|f| (f.severity, f.field_id.as_str(), f.change_type))
            .collect();
        assert_eq!(
            order,
            vec![
                (Severity::High, "response_x", ChangeType::EnumChanged),
                (Severity::Medium, "response_y", ChangeType::EnumChanged),
                (Severity::Medium, "response_y", ChangeType::SourceVersionChanged),
                (Severity::Low, "response_x", ChangeType::NoteChanged),
            ]
        );

        let reversed = compile(&[m3, m2, m1], &catalog(), CatalogMissPolicy::Drop);
        let keys = |fs: &[Finding]| fs.iter().map(|f| f.id.clone()).collect::<Vec<_>>();
        assert_eq!(keys(&forward), keys(&reversed));
    }

    #[test]
    fn test_compile_is_deterministic() {
        let log = vec![
            mutation("m1", ChangeType::EnumChanged, "a", "response_x"),
            mutation("m2", ChangeType::EnumChanged, "a", "response_x"),
        ];
        let first = compile(&log, &catalog(), CatalogMissPolicy::Drop);
        let second = compile(&log, &catalog(), CatalogMissPolicy::Drop);
        assert_eq!(first, second);
        // equal keys keep mutation order
        assert_eq!(first[0].id, "m1:0");
        assert_eq!(first[1].id, "m2:0");
    }

    #[test]
    fn test_catalog_miss_drop_and_surface() {
        let log = vec![mutation("m1", ChangeType::AnnotationMissing, "a", "response_x")];
        assert!(compile(&log, &catalog(), CatalogMissPolicy::Drop).is_empty());

        let surfaced = compile(&log, &catalog(), CatalogMissPolicy::Surface);
        assert_eq!(surfaced.len(), 1);
        assert_eq!(surfaced[0].severity, Severity::Low);
        assert_eq!(surfaced[0].change_type, ChangeType::AnnotationMissing);
        assert_eq!(
            surfaced[0].summary,
            "No scenario coverage for annotation_missing on response_x; impact unknown."
        );
    }

    #[test]
    fn test_scenario_suggestion_overrides_table() {
        let mut doc = sample_document();
        let mut custom = change(Severity::Medium, ChangeType::EnumChanged, "response_x");
        custom.suggestion = Some("Pin the enum in the consumer".to_string());
        custom.validation = Some("Router rejects unknown status".to_string());
        doc.mutation_scenarios
            .get_mut("response_x")
            .unwrap()
            .insert(ChangeType::EnumChanged, Scenario { changes: vec![custom] });
        let catalog = ScenarioCatalog::from_document(doc).unwrap();

        let findings = compile(
            &[mutation("m1", ChangeType::EnumChanged, "a", "response_x")],
            &catalog,
            CatalogMissPolicy::Drop,
        );
        assert_eq!(findings[0].remediation, "Pin the enum in the consumer");
        assert_eq!(findings[0].impact, "Router rejects unknown status");
    }

    #[test]
    fn test_miss_policy_parse() {
        assert_eq!("Surface".parse::<CatalogMissPolicy>(), Ok(CatalogMissPolicy::Surface));
        assert_eq!("drop".parse::<CatalogMissPolicy>(), Ok(CatalogMissPolicy::Drop));
        assert!("ignore".parse::<CatalogMissPolicy>().is_err());
    }
}
