//! Contract drift gate core
//!
//! Classifies field-level contract changes across a service graph, applies
//! time-bounded overrides, projects edge health and computes a PASS/BLOCK gate.
//!
//! Data flows one way per run:
//! mutations -> findings -> override filter -> active findings -> {topology, gate}.
//! Escalation lookup is a side query against the catalog.
//!
//! Everything except `session` and `store` is pure and synchronous.

pub mod catalog;
pub mod change;
pub mod compiler;
pub mod export;
pub mod gate;
pub mod mutation;
pub mod overrides;
pub mod policy;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod topology;

pub use catalog::{CatalogError, EscalationStep, ScenarioCatalog};
pub use change::{ChangeType, Guidance};
pub use compiler::{CatalogMissPolicy, Finding};
pub use export::{ArtifactEnvelope, ArtifactExport};
pub use gate::{Gate, RunSummary};
pub use mutation::{Mutation, MutationRequest};
pub use overrides::{ChangeSelector, Override, OverrideRequest};
pub use policy::{EnforcementMode, Policy, PolicyRequest, Severity};
pub use session::{EngineConfig, EngineError, SessionEngine, ValidationError};
pub use snapshot::Snapshot;
pub use store::{FileStore, MemoryStore, SnapshotStore, StoreError};
pub use topology::{EdgeLink, EdgeStatus};
