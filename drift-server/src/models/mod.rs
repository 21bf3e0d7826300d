//! Wire models for the HTTP surface
//!
//! Request bodies for session operations are the core request types
//! (`MutationRequest`, `PolicyRequest`, `OverrideRequest`); this module holds
//! response envelopes and query strings.

pub mod catalog;
pub mod session;

pub use catalog::CatalogSummary;
pub use session::{
    ArtifactQuery, CreateSession, EscalationQuery, EscalationResponse, SessionCreated, SessionList,
    SnapshotResponse,
};
