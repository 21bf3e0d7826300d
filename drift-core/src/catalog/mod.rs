//! Scenario Catalog
//!
//! Static reference data: which structural changes a (field, mutation type)
//! pair produces, who owns each field, the baseline topology, and escalation
//! chains per service. Loaded once, validated, then shared read-only behind
//! an `Arc` by every session.
//!
//! ## Structure
//! - `types`: wire shapes of the catalog document
//! - `escalation`: upstream chain derivation from the system registry

pub mod escalation;
pub mod types;

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::change::ChangeType;

pub use types::{
    CatalogDocument, CatalogEdge, Contact, DriftEdge, EscalationStep, FieldMetadata, Scenario,
    ScenarioChange, ServiceKind, ServiceNode, SystemMetadata, Truth,
};

/// Case-fold and trim a service/system identifier
pub fn normalize_id(raw: &str) -> String {
    raw.trim().to_lowercase()
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid catalog: {0}")]
    Invalid(String),
}

// ============================================================================
// CATALOG
// ============================================================================

/// Immutable, validated scenario catalog
#[derive(Debug, Clone)]
pub struct ScenarioCatalog {
    generated_at: Option<String>,
    truth: Truth,
    services: Vec<ServiceNode>,
    service_ids: HashSet<String>,
    edges: Vec<CatalogEdge>,
    field_metadata: BTreeMap<String, FieldMetadata>,
    fields_by_mutation: BTreeMap<ChangeType, Vec<String>>,
    scenarios: BTreeMap<String, BTreeMap<ChangeType, Scenario>>,
    escalation: BTreeMap<String, Vec<EscalationStep>>,
}

impl ScenarioCatalog {
    /// Load and validate a catalog JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_slice(&raw)?;
        log::info!(
            "Loaded scenario catalog from {} ({} services, {} edges, checksum {})",
            path.display(),
            catalog.services.len(),
            catalog.edges.len(),
            catalog.truth.lineage_checksum
        );
        Ok(catalog)
    }

    /// Parse raw JSON bytes; the checksum defaults to the sha256 of `raw`
    pub fn from_slice(raw: &[u8]) -> Result<Self, CatalogError> {
        let mut doc: CatalogDocument = serde_json::from_slice(raw)?;
        if doc.truth.lineage_checksum.trim().is_empty() {
            doc.truth.lineage_checksum = format!("sha256:{}", hex::encode(Sha256::digest(raw)));
        }
        Self::from_document(doc)
    }

    /// Validate and normalize an in-memory document
    pub fn from_document(doc: CatalogDocument) -> Result<Self, CatalogError> {
        let mut services = doc.services;
        let mut service_ids = HashSet::new();
        for service in &mut services {
            service.id = normalize_id(&service.id);
            if service.id.is_empty() {
                return Err(CatalogError::Invalid("service with empty id".to_string()));
            }
            if !service_ids.insert(service.id.clone()) {
                return Err(CatalogError::Invalid(format!("duplicate service id {:?}", service.id)));
            }
        }
        services.sort_by(|a, b| a.id.cmp(&b.id));

        let mut edges = doc.edges;
        for edge in &mut edges {
            if edge.field_id.trim().is_empty() {
                return Err(CatalogError::Invalid(format!("edge {} has no fieldId", edge.id)));
            }
            edge.from = normalize_id(&edge.from);
            edge.to = normalize_id(&edge.to);
        }
        edges.sort_by(|a, b| {
            a.from
                .cmp(&b.from)
                .then_with(|| a.to.cmp(&b.to))
                .then_with(|| a.field_id.cmp(&b.field_id))
        });

        let mut fields_by_mutation = doc.fields_by_mutation;
        for fields in fields_by_mutation.values_mut() {
            fields.sort();
            fields.dedup();
        }

        let mut chains: BTreeMap<String, Vec<EscalationStep>> = doc
            .escalation_by_system
            .into_iter()
            .map(|(id, chain)| (normalize_id(&id), chain))
            .collect();

        if !doc.systems.is_empty() {
            for service in &services {
                if chains.contains_key(&service.id) {
                    continue;
                }
                let chain = escalation::derive_chain(
                    &service.id,
                    &edges,
                    &services,
                    &doc.systems,
                    escalation::DEFAULT_MAX_DEPTH,
                );
                chains.insert(service.id.clone(), chain);
            }
        }

        Ok(Self {
            generated_at: doc.generated_at,
            truth: doc.truth,
            services,
            service_ids,
            edges,
            field_metadata: doc.field_metadata,
            fields_by_mutation,
            scenarios: doc.mutation_scenarios,
            escalation: chains,
        })
    }

    pub fn generated_at(&self) -> Option<&str> {
        self.generated_at.as_deref()
    }

    pub fn truth(&self) -> &Truth {
        &self.truth
    }

    pub fn services(&self) -> &[ServiceNode] {
        &self.services
    }

    pub fn edges(&self) -> &[CatalogEdge] {
        &self.edges
    }

    /// Whether the catalog declares a topology at all
    pub fn declares_services(&self) -> bool {
        !self.service_ids.is_empty()
    }

    pub fn has_service(&self, service_id: &str) -> bool {
        self.service_ids.contains(&normalize_id(service_id))
    }

    /// Owning service for a field, if declared and non-empty
    pub fn field_owner(&self, field_id: &str) -> Option<&str> {
        self.field_metadata
            .get(field_id)
            .map(|meta| meta.service_id.trim())
            .filter(|owner| !owner.is_empty())
    }

    /// Mutation types the catalog can inject, in wire-name order
    pub fn mutation_types(&self) -> Vec<ChangeType> {
        let mut kinds: Vec<ChangeType> = self.fields_by_mutation.keys().copied().collect();
        kinds.sort_by_key(|kind| kind.as_str());
        kinds
    }

    pub fn fields_for(&self, kind: ChangeType) -> &[String] {
        self.fields_by_mutation
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether `field_id` is a valid injection target for `kind`
    pub fn accepts(&self, kind: ChangeType, field_id: &str) -> bool {
        self.fields_for(kind)
            .binary_search_by(|candidate| candidate.as_str().cmp(field_id))
            .is_ok()
    }

    pub fn scenario(&self, field_id: &str, kind: ChangeType) -> Option<&Scenario> {
        self.scenarios.get(field_id).and_then(|by_type| by_type.get(&kind))
    }

    /// Ordered notification chain; empty for unknown services
    pub fn escalation_chain(&self, service_id: &str) -> Vec<EscalationStep> {
        self.escalation
            .get(&normalize_id(service_id))
            .cloned()
            .unwrap_or_default()
    }
}

// ============================================================================
// FIXTURES
// ============================================================================


// ============================================================================
// TESTS
// ============================================================================
