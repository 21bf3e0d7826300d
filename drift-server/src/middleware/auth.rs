//! Authentication middleware
//!
//! Optional static bearer token. The configured token is kept only as a
//! SHA-256 digest and presented tokens are hashed before comparison.

use axum::{
    extract::{State, Request},
    middleware::Next,
    response::Response,
    http::header::AUTHORIZATION,
};
use sha2::{Sha256, Digest};

use crate::{AppState, AppError};

/// Middleware: require the API bearer token when auth is enabled
pub async fn require_api_token(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.token_hash.as_deref() else {
        return Ok(next.run(req).await);
    };

    let token = extract_bearer_token(&req)?;
    if hash_token(&token) != expected {
        tracing::warn!("Rejected request to {} with invalid API token", req.uri().path());
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(req).await)
}

/// Extract bearer token from Authorization header
fn extract_bearer_token(req: &Request) -> Result<String, AppError> {
    let auth_header = req.headers()
        .get(AUTHORIZATION)
        .ok_or(AppError::Unauthorized)?
        .to_str()
        .map_err(|_| AppError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthorized)?;

    Ok(token.to_string())
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable_hex() {
        let digest = hash_token("s3cret");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, hash_token("s3cret"));
        assert_ne!(digest, hash_token("s3cret "));
    }
}
