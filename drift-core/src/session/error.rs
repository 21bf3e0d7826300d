use crate::store::StoreError;

/// Client input rejected before any state change.
/// `Display` is the exact message returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("mutation requires valid type and fieldId")]
    MutationTypeOrField,

    #[error("mutation requires resolvable serviceId")]
    MutationService,

    #[error("policy requires valid mode and failOn")]
    Policy,

    #[error("override requires fieldId, expires, and reason")]
    OverrideFields,

    #[error("artifact export requires organization and project")]
    ArtifactScope,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("session not found")]
    SessionNotFound(String),

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

pub type EngineResult<T> = Result<T, EngineError>;
