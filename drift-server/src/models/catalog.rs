//! Catalog summary model

use drift_core::catalog::{ServiceNode, Truth};
use drift_core::{ChangeType, ScenarioCatalog};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationTypeSummary {
    #[serde(rename = "type")]
    pub kind: ChangeType,
    pub field_count: usize,
    pub fields: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    pub truth: Truth,
    pub services: Vec<ServiceNode>,
    pub edge_count: usize,
    pub mutation_types: Vec<MutationTypeSummary>,
}

impl CatalogSummary {
    pub fn from_catalog(catalog: &ScenarioCatalog) -> Self {
        let mutation_types = catalog
            .mutation_types()
            .into_iter()
            .map(|kind| {
                let fields = catalog.fields_for(kind).to_vec();
                MutationTypeSummary {
                    kind,
                    field_count: fields.len(),
                    fields,
                }
            })
            .collect();

        Self {
            generated_at: catalog.generated_at().map(str::to_string),
            truth: catalog.truth().clone(),
            services: catalog.services().to_vec(),
            edge_count: catalog.edges().len(),
            mutation_types,
        }
    }
}
