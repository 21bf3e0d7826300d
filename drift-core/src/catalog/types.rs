//! Catalog Types
//!
//! Wire shapes of the scenario catalog document. No lookup logic here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::change::ChangeType;
use crate::policy::Severity;

// ============================================================================
// TOPOLOGY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    #[default]
    Internal,
    External,
}

/// A node in the service topology
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceNode {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub kind: ServiceKind,
    #[serde(default)]
    pub owner: String,
    /// Escalation pointer, e.g. `pagerduty:payments-oncall`
    #[serde(default)]
    pub escalation: String,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "runbookURL")]
    pub runbook_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_root: Option<String>,
    #[serde(default)]
    pub flow_count: u32,
}

/// Baseline data-flow edge for one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEdge {
    pub id: String,
    pub from: String,
    pub to: String,
    pub field_id: String,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMetadata {
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub domain: String,
}

// ============================================================================
// SCENARIOS
// ============================================================================

/// Producer or consumer side of a structural change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftEdge {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api: String,
}

/// One structural consequence of a (field, mutation type) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioChange {
    pub severity: Severity,
    #[serde(alias = "change_type")]
    pub change_type: ChangeType,
    #[serde(alias = "field_id")]
    pub field_id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<DriftEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<DriftEdge>,
    /// What can fail, overrides the guidance table when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<String>,
    /// Next step, overrides the guidance table when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub changes: Vec<ScenarioChange>,
}

// ============================================================================
// ESCALATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub channel: String,
}

/// One hop in a notification chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationStep {
    pub depth: u32,
    #[serde(alias = "system_id")]
    pub system_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub reason: String,
    #[serde(default)]
    pub contacts: Vec<Contact>,
}

/// Registry entry used to derive chains the catalog does not precompute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMetadata {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "owner_team")]
    pub owner_team: String,
    #[serde(default)]
    pub escalation: Vec<Contact>,
}

// ============================================================================
// DOCUMENT
// ============================================================================

/// Lineage coverage metadata carried into every snapshot
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Truth {
    #[serde(default)]
    pub supported_flows: u32,
    #[serde(default)]
    pub annotated_flows: u32,
    #[serde(default)]
    pub annotation_coverage_pct: f64,
    #[serde(default)]
    pub truth_version: String,
    #[serde(default)]
    pub lineage_checksum: String,
}

/// Raw catalog document as shipped on disk
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    #[serde(default)]
    pub truth: Truth,
    #[serde(default)]
    pub services: Vec<ServiceNode>,
    #[serde(default)]
    pub edges: Vec<CatalogEdge>,
    #[serde(default)]
    pub field_metadata: BTreeMap<String, FieldMetadata>,
    #[serde(default)]
    pub fields_by_mutation: BTreeMap<ChangeType, Vec<String>>,
    #[serde(default)]
    pub mutation_scenarios: BTreeMap<String, BTreeMap<ChangeType, Scenario>>,
    #[serde(default)]
    pub escalation_by_system: BTreeMap<String, Vec<EscalationStep>>,
    #[serde(default)]
    pub systems: Vec<SystemMetadata>,
}
