use async_trait::async_trait;

use crate::domain::session::SessionToken;
use crate::error::AppResult;

/// The external SSO provider: issues, refreshes and invalidates session
/// tokens. The client never implements the protocol itself; it only calls
/// the provider's standard OpenID-Connect endpoints.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> AppResult<SessionToken>;
    async fn refresh(&self, refresh_token: &str) -> AppResult<SessionToken>;
    async fn logout(&self, refresh_token: &str) -> AppResult<()>;
}

/// Where the HTTP layer obtains the bearer token for an outbound request.
/// The token is read per request; the HTTP layer never stores it.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn current_bearer(&self) -> Option<String>;
}
