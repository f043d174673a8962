use async_trait::async_trait;

use crate::errors::AuthError;
use crate::models::Principal;

/// Validates bearer tokens and returns principals (§6.1). The HTTP façade
/// and the identity service itself are out of scope; the core only depends
/// on this trait for authorization checks inside `DocumentService`.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn validate(&self, token: &str) -> Result<Principal, AuthError>;
}
