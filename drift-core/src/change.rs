//! Change Types
//!
//! Closed enumeration of contract-change kinds. The same vocabulary names
//! injected mutations and the structural changes they produce. Each kind maps
//! to an optional plain-language guidance triple; kinds without one fall back
//! to the generic triple.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// CHANGE TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    FieldRemoved,
    FieldAdded,
    FieldRenamed,
    FieldPathChanged,
    SourceSystemChanged,
    SourceVersionChanged,
    MinSupportedSourceVersionChanged,
    TransformTypeChanged,
    MergeStrategyChanged,
    BreakPolicyChanged,
    ConfidenceChanged,
    ClassificationRelaxed,
    ClassificationTightened,
    OwnerChanged,
    EscalationChanged,
    ContractTestIdChanged,
    SunsetChanged,
    FlowChanged,
    NoteChanged,
    SourceRemoved,
    SourceAdded,
    SourceContractRefChanged,
    SourceProviderChanged,
    SourceUpstreamSystemChanged,
    ExternalAsOfRollback,
    ExternalAsOfAdvanced,
    ExternalAsOfChanged,
    ExternalAsOfStale,
    TypeChanged,
    EnumChanged,
    AnnotationMissing,
    NumericWiden,
}

impl ChangeType {
    pub const ALL: [ChangeType; 32] = [
        ChangeType::FieldRemoved,
        ChangeType::FieldAdded,
        ChangeType::FieldRenamed,
        ChangeType::FieldPathChanged,
        ChangeType::SourceSystemChanged,
        ChangeType::SourceVersionChanged,
        ChangeType::MinSupportedSourceVersionChanged,
        ChangeType::TransformTypeChanged,
        ChangeType::MergeStrategyChanged,
        ChangeType::BreakPolicyChanged,
        ChangeType::ConfidenceChanged,
        ChangeType::ClassificationRelaxed,
        ChangeType::ClassificationTightened,
        ChangeType::OwnerChanged,
        ChangeType::EscalationChanged,
        ChangeType::ContractTestIdChanged,
        ChangeType::SunsetChanged,
        ChangeType::FlowChanged,
        ChangeType::NoteChanged,
        ChangeType::SourceRemoved,
        ChangeType::SourceAdded,
        ChangeType::SourceContractRefChanged,
        ChangeType::SourceProviderChanged,
        ChangeType::SourceUpstreamSystemChanged,
        ChangeType::ExternalAsOfRollback,
        ChangeType::ExternalAsOfAdvanced,
        ChangeType::ExternalAsOfChanged,
        ChangeType::ExternalAsOfStale,
        ChangeType::TypeChanged,
        ChangeType::EnumChanged,
        ChangeType::AnnotationMissing,
        ChangeType::NumericWiden,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::FieldRemoved => "field_removed",
            ChangeType::FieldAdded => "field_added",
            ChangeType::FieldRenamed => "field_renamed",
            ChangeType::FieldPathChanged => "field_path_changed",
            ChangeType::SourceSystemChanged => "source_system_changed",
            ChangeType::SourceVersionChanged => "source_version_changed",
            ChangeType::MinSupportedSourceVersionChanged => "min_supported_source_version_changed",
            ChangeType::TransformTypeChanged => "transform_type_changed",
            ChangeType::MergeStrategyChanged => "merge_strategy_changed",
            ChangeType::BreakPolicyChanged => "break_policy_changed",
            ChangeType::ConfidenceChanged => "confidence_changed",
            ChangeType::ClassificationRelaxed => "classification_relaxed",
            ChangeType::ClassificationTightened => "classification_tightened",
            ChangeType::OwnerChanged => "owner_changed",
            ChangeType::EscalationChanged => "escalation_changed",
            ChangeType::ContractTestIdChanged => "contract_test_id_changed",
            ChangeType::SunsetChanged => "sunset_changed",
            ChangeType::FlowChanged => "flow_changed",
            ChangeType::NoteChanged => "note_changed",
            ChangeType::SourceRemoved => "source_removed",
            ChangeType::SourceAdded => "source_added",
            ChangeType::SourceContractRefChanged => "source_contract_ref_changed",
            ChangeType::SourceProviderChanged => "source_provider_changed",
            ChangeType::SourceUpstreamSystemChanged => "source_upstream_system_changed",
            ChangeType::ExternalAsOfRollback => "external_as_of_rollback",
            ChangeType::ExternalAsOfAdvanced => "external_as_of_advanced",
            ChangeType::ExternalAsOfChanged => "external_as_of_changed",
            ChangeType::ExternalAsOfStale => "external_as_of_stale",
            ChangeType::TypeChanged => "type_changed",
            ChangeType::EnumChanged => "enum_changed",
            ChangeType::AnnotationMissing => "annotation_missing",
            ChangeType::NumericWiden => "numeric_widen",
        }
    }

    /// Plain-language triple for this kind, if one is curated
    pub fn guidance(&self) -> Option<Guidance> {
        let (what_changed, why_it_matters, next_step) = match self {
            ChangeType::FieldRemoved => (
                "A field consumers rely on was removed.",
                "Consumers expecting this field can crash or silently mis-handle payloads.",
                "Restore the field or ship a compatibility adapter and coordinated rollout.",
            ),
            ChangeType::SourceVersionChanged => (
                "The producer bumped the source version for this field.",
                "Version bumps can change producer semantics even when type shape is unchanged.",
                "Run compatibility tests and communicate rollout plan to consumers.",
            ),
            ChangeType::MergeStrategyChanged => (
                "The producer changed how upstream values are combined.",
                "Different merge behavior can change output values without any schema/type diff.",
                "Add merge semantic regression tests with representative multi-source fixtures.",
            ),
            ChangeType::SourceContractRefChanged => (
                "An upstream contract reference moved to a new revision.",
                "Contract reference changes can introduce enum/type drift across service boundaries.",
                "Run contract tests for producer and consumers before promoting the new reference.",
            ),
            ChangeType::SourceRemoved => (
                "An upstream source no longer contributes to this field.",
                "Removing a source can change or null out producer output values.",
                "Confirm fallback behavior and downstream assumptions with integration tests.",
            ),
            ChangeType::SourceAdded => (
                "A new upstream source now contributes to this field.",
                "Adding a source can alter precedence and value composition.",
                "Validate precedence rules and update consumer expectations.",
            ),
            ChangeType::ExternalAsOfRollback => (
                "An external provider snapshot moved to an older date.",
                "Older external snapshots can reintroduce stale or incompatible values.",
                "Refresh provider snapshot and verify time-sensitive invariants.",
            ),
            ChangeType::EnumChanged => (
                "The set of allowed enum values changed.",
                "Consumers with a closed allowlist can reject or mis-route the new values.",
                "Add enum contract tests across every hop and define an unknown-value fallback before rollout.",
            ),
            ChangeType::TypeChanged | ChangeType::NumericWiden => (
                "The field's type or numeric width changed.",
                "Typed consumers can overflow, truncate or fail to decode the new shape.",
                "Add boundary tests for the new range and roll out consumer updates before the producer.",
            ),
            ChangeType::AnnotationMissing => (
                "Lineage annotation for this field is missing or incomplete.",
                "Unannotated flows are invisible to drift checks and escalation routing.",
                "Restore the lineage annotation so ownership and sources are declared.",
            ),
            _ => return None,
        };

        Some(Guidance {
            what_changed: what_changed.to_string(),
            why_it_matters: why_it_matters.to_string(),
            next_step: next_step.to_string(),
        })
    }

    /// Guidance for this kind, or the generic triple
    pub fn guidance_or_generic(&self) -> Guidance {
        self.guidance().unwrap_or_else(Guidance::generic)
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChangeType::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or(())
    }
}

// ============================================================================
// GUIDANCE
// ============================================================================

pub const GENERIC_REMEDIATION: &str =
    "Review the change with producer and consumer owners before rollout.";

/// Human-readable (what changed, why it matters, next step)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guidance {
    pub what_changed: String,
    pub why_it_matters: String,
    pub next_step: String,
}

impl Guidance {
    pub fn generic() -> Self {
        Self {
            what_changed: "A contract change was detected.".to_string(),
            why_it_matters: "Downstream consumers may observe different values or shapes.".to_string(),
            next_step: GENERIC_REMEDIATION.to_string(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
