//! Mutation Log
//!
//! One detected or injected contract-change event. Mutations are validated
//! against the catalog's fields-by-mutation index before they are appended,
//! and are never edited afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{normalize_id, ScenarioCatalog};
use crate::change::ChangeType;
use crate::session::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mutation {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ChangeType,
    pub service_id: String,
    pub field_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Raw inject-mutation input as received on the wire
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationRequest {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub field_id: String,
}

impl MutationRequest {
    pub fn new(kind: &str, service_id: &str, field_id: &str) -> Self {
        Self {
            kind: kind.to_string(),
            service_id: service_id.to_string(),
            field_id: field_id.to_string(),
        }
    }

    /// Validate against the catalog and build the log entry
    pub fn validate(
        &self,
        catalog: &ScenarioCatalog,
        now: DateTime<Utc>,
    ) -> Result<Mutation, ValidationError> {
        let field_id = self.field_id.trim();
        let kind: ChangeType = self
            .kind
            .trim()
            .parse()
            .map_err(|_| ValidationError::MutationTypeOrField)?;
        if field_id.is_empty() || !catalog.accepts(kind, field_id) {
            return Err(ValidationError::MutationTypeOrField);
        }

        let mut service_id = normalize_id(&self.service_id);
        if service_id.is_empty() {
            service_id = catalog.field_owner(field_id).map(normalize_id).unwrap_or_default();
        }
        if service_id.is_empty() {
            return Err(ValidationError::MutationService);
        }
        if catalog.declares_services() && !catalog.has_service(&service_id) {
            return Err(ValidationError::MutationService);
        }

        Ok(Mutation {
            id: format!("mut-{}", Uuid::new_v4()),
            kind,
            service_id,
            field_id: field_id.to_string(),
            timestamp: now,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::sample_catalog;

    #[test]
    fn test_valid_mutation_normalizes_service() {
        let catalog = sample_catalog();
        let mutation = MutationRequest::new("enum_changed", "  A ", "response_x")
            .validate(&catalog, Utc::now())
            .unwrap();
        assert_eq!(mutation.kind, ChangeType::EnumChanged);
        assert_eq!(mutation.service_id, "a");
        assert!(mutation.id.starts_with("mut-"));
    }

    #[test]
    fn test_service_falls_back_to_field_owner() {
        let catalog = sample_catalog();
        let mutation = MutationRequest::new("source_version_changed", "", "response_y")
            .validate(&catalog, Utc::now())
            .unwrap();
        assert_eq!(mutation.service_id, "b");
    }

    #[test]
    fn test_unknown_type_or_field_rejected() {
        let catalog = sample_catalog();
        for (kind, field) in [
            ("enum_removed", "response_x"),
            ("source_version_changed", "response_x"),
            ("enum_changed", "response_z"),
            ("", ""),
        ] {
            let err = MutationRequest::new(kind, "a", field)
                .validate(&catalog, Utc::now())
                .unwrap_err();
            assert_eq!(err.to_string(), "mutation requires valid type and fieldId");
        }
    }

    #[test]
    fn test_unknown_service_rejected() {
        let catalog = sample_catalog();
        let err = MutationRequest::new("enum_changed", "zeta", "response_x")
            .validate(&catalog, Utc::now())
            .unwrap_err();
        assert_eq!(err.to_string(), "mutation requires resolvable serviceId");
    }

    #[test]
    fn test_wire_shape() {
        let catalog = sample_catalog();
        let mutation = MutationRequest::new("enum_changed", "a", "response_x")
            .validate(&catalog, Utc::now())
            .unwrap();
        let json = serde_json::to_value(&mutation).unwrap();
        assert_eq!(json["type"], "enum_changed");
        assert_eq!(json["serviceId"], "a");
        assert_eq!(json["fieldId"], "response_x");
    }
}
