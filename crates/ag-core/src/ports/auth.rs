use async_trait::async_trait;

use super::ApiError;
use crate::session::{AuthGrant, User};

/// `/auth/*` endpoints.
///
/// `refresh` relies on the HttpOnly refresh cookie held by the transport.
#[async_trait]
pub trait AuthPort: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<AuthGrant, ApiError>;
    async fn login_with_google(&self, id_token: &str) -> Result<AuthGrant, ApiError>;
    async fn signup(&self, email: &str, password: &str) -> Result<AuthGrant, ApiError>;
    async fn refresh(&self) -> Result<AuthGrant, ApiError>;
    async fn logout(&self) -> Result<(), ApiError>;
    async fn me(&self) -> Result<User, ApiError>;
    async fn update_name(&self, name: &str) -> Result<(), ApiError>;
}

/// Re-authentication hook used by the transport when a request answers 401.
///
/// Implementations must coalesce concurrent calls into one refresh.
#[async_trait]
pub trait CredentialRefresher: Send + Sync {
    /// Returns `true` when a fresh credential is now available.
    async fn refresh_credentials(&self) -> bool;
}
