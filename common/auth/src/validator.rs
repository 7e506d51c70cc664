use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AuthError, AuthResult};

/// Hook invoked with the raw bearer token of every protected request.
///
/// Implementations decide whether the caller may proceed; the extractor turns
/// an `Err` into a 401 response.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, token: &str) -> AuthResult<()>;
}

pub type SharedTokenValidator = Arc<dyn TokenValidator>;

/// Accepts any non-empty token without inspecting it.
///
/// Placeholder until signature validation against the identity provider's
/// signing keys is wired in; swap it for a verifying implementation through
/// the application state.
#[derive(Debug, Clone, Copy, Default)]
pub struct PresenceOnlyValidator;

#[async_trait]
impl TokenValidator for PresenceOnlyValidator {
    async fn validate(&self, token: &str) -> AuthResult<()> {
        if token.trim().is_empty() {
            return Err(AuthError::InvalidAuthorization);
        }
        tracing::debug!(token_len = token.len(), "bearer token accepted without verification");
        Ok(())
    }
}
