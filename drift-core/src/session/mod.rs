//! Session Engine
//!
//! Orchestrates the pure pipeline against one durable snapshot per session.
//! Operations on the same session are serialized; different sessions run in
//! parallel.
//!
//! ## Structure
//! - `engine`: operations and per-session locking
//! - `error`: validation and operational errors

mod engine;
mod error;

pub use engine::{Clock, EngineConfig, SessionEngine};
pub use error::{EngineError, EngineResult, ValidationError};

/// Session ids double as storage keys; only `[A-Za-z0-9_-]`, at most 128 chars
pub fn is_valid_session_id(session_id: &str) -> bool {
    !session_id.is_empty()
        && session_id.len() <= 128
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
