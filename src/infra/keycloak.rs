use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;

use crate::domain::session::{SessionToken, decode_claims};
use crate::error::{AppError, AppResult};
use crate::infra::http::{error_for_response, transport_error};
use crate::services::IdentityService;

/// OpenID-Connect client against the configured Keycloak realm. Uses the
/// direct-access password grant for login and the standard refresh and
/// logout endpoints; the token itself is treated as opaque apart from its
/// claims payload.
pub struct KeycloakClient {
    http: Client,
    base_url: Option<String>,
    realm: Option<String>,
    client_id: Option<String>,
}

impl KeycloakClient {
    pub fn new(
        http: Client,
        base_url: Option<String>,
        realm: Option<String>,
        client_id: Option<String>,
    ) -> Self {
        Self {
            http,
            base_url,
            realm,
            client_id,
        }
    }

    fn realm_details(&self) -> AppResult<(&str, &str, &str)> {
        let base_url = self.base_url.as_deref().ok_or_else(|| {
            AppError::Configuration("Keycloak URL not configured".to_string())
        })?;
        let realm = self.realm.as_deref().ok_or_else(|| {
            AppError::Configuration("Keycloak realm not configured".to_string())
        })?;
        let client_id = self.client_id.as_deref().ok_or_else(|| {
            AppError::Configuration("Keycloak client id not configured".to_string())
        })?;
        Ok((base_url, realm, client_id))
    }

    fn realm_endpoint(base_url: &str, realm: &str, action: &str) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/{}",
            base_url.trim_end_matches('/'),
            realm,
            action
        )
    }

    async fn request_token(&self, params: &[(&str, &str)]) -> AppResult<SessionToken> {
        let (base_url, realm, _) = self.realm_details()?;

        let response = self
            .http
            .post(Self::realm_endpoint(base_url, realm, "token"))
            .form(params)
            .send()
            .await
            .map_err(|err| transport_error(err, "could not reach the identity provider"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, body = %body, "token request failed");
            return Err(AppError::Authentication(oidc_error_message(&body)));
        }

        let grant: TokenGrant = response.json().await.map_err(|err| {
            AppError::Authentication(format!("invalid token response: {err}"))
        })?;

        Ok(session_from_grant(grant, Utc::now().timestamp()))
    }
}

#[async_trait]
impl IdentityService for KeycloakClient {
    async fn login(&self, username: &str, password: &str) -> AppResult<SessionToken> {
        let (_, _, client_id) = self.realm_details()?;
        self.request_token(&[
            ("grant_type", "password"),
            ("client_id", client_id),
            ("username", username),
            ("password", password),
        ])
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> AppResult<SessionToken> {
        let (_, _, client_id) = self.realm_details()?;
        self.request_token(&[
            ("grant_type", "refresh_token"),
            ("client_id", client_id),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn logout(&self, refresh_token: &str) -> AppResult<()> {
        let (base_url, realm, client_id) = self.realm_details()?;

        let response = self
            .http
            .post(Self::realm_endpoint(base_url, realm, "logout"))
            .form(&[("client_id", client_id), ("refresh_token", refresh_token)])
            .send()
            .await
            .map_err(|err| transport_error(err, "could not reach the identity provider"))?;

        if !response.status().is_success() {
            return Err(error_for_response(response, "could not end the remote session").await);
        }
        Ok(())
    }
}

/// Token endpoint response. `refresh_expires_in` of zero means the refresh
/// token is bound to the SSO session rather than a fixed lifetime.
#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
    #[serde(default)]
    refresh_expires_in: Option<i64>,
}

fn session_from_grant(grant: TokenGrant, now: i64) -> SessionToken {
    let claims = decode_claims(&grant.access_token).unwrap_or_default();
    SessionToken {
        expires_at: now + grant.expires_in,
        refresh_expires_at: grant
            .refresh_expires_in
            .filter(|seconds| *seconds > 0)
            .map(|seconds| now + seconds),
        access_token: grant.access_token,
        refresh_token: grant.refresh_token,
        subject: claims.sub,
        username: claims.preferred_username,
    }
}

#[derive(Debug, Deserialize)]
struct OidcErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

fn oidc_error_message(body: &str) -> String {
    match serde_json::from_str::<OidcErrorBody>(body) {
        Ok(parsed) => parsed.error_description.unwrap_or(parsed.error),
        Err(_) => "the identity provider rejected the request".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::prelude::{BASE64_URL_SAFE_NO_PAD, Engine as _};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fake_jwt(claims: &serde_json::Value) -> String {
        let header = BASE64_URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
        let payload = BASE64_URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
        format!("{header}.{payload}.signature")
    }

    fn client(base_url: &str) -> KeycloakClient {
        KeycloakClient::new(
            Client::new(),
            Some(base_url.to_string()),
            Some("helpdesk".to_string()),
            Some("mesa-cli".to_string()),
        )
    }

    #[tokio::test]
    async fn login_posts_a_password_grant_and_parses_the_claims() {
        let server = MockServer::start().await;
        let access_token = fake_jwt(&serde_json::json!({
            "sub": "f3c9b2aa-1",
            "preferred_username": "ana"
        }));
        Mock::given(method("POST"))
            .and(path("/realms/helpdesk/protocol/openid-connect/token"))
            .and(body_string_contains("grant_type=password"))
            .and(body_string_contains("client_id=mesa-cli"))
            .and(body_string_contains("username=ana"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": access_token,
                "refresh_token": "refresh-1",
                "expires_in": 300,
                "refresh_expires_in": 1800
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = client(&server.uri()).login("ana", "secret").await.unwrap();
        assert_eq!(token.access_token, access_token);
        assert_eq!(token.refresh_token.as_deref(), Some("refresh-1"));
        assert_eq!(token.subject.as_deref(), Some("f3c9b2aa-1"));
        assert_eq!(token.username.as_deref(), Some("ana"));
    }

    #[tokio::test]
    async fn refresh_posts_a_refresh_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/realms/helpdesk/protocol/openid-connect/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=refresh-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "rotated",
                "refresh_token": "refresh-2",
                "expires_in": 300
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = client(&server.uri()).refresh("refresh-1").await.unwrap();
        assert_eq!(token.access_token, "rotated");
        assert_eq!(token.refresh_token.as_deref(), Some("refresh-2"));
    }

    #[tokio::test]
    async fn rejected_credentials_surface_the_provider_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/realms/helpdesk/protocol/openid-connect/token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Invalid user credentials"
            })))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .login("ana", "wrong")
            .await
            .unwrap_err();
        match err {
            AppError::Authentication(message) => {
                assert!(message.contains("Invalid user credentials"));
            }
            other => panic!("expected an authentication error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn logout_posts_the_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/realms/helpdesk/protocol/openid-connect/logout"))
            .and(body_string_contains("refresh_token=refresh-1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server.uri()).logout("refresh-1").await.unwrap();
    }

    #[tokio::test]
    async fn an_unconfigured_realm_is_a_configuration_error() {
        let client = KeycloakClient::new(Client::new(), None, None, None);
        let err = client.login("ana", "secret").await.unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn grant_conversion_computes_expiries_from_now() {
        let grant = TokenGrant {
            access_token: "opaque".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_in: 300,
            refresh_expires_in: Some(0),
        };
        let token = session_from_grant(grant, 1_000);
        assert_eq!(token.expires_at, 1_300);
        assert_eq!(token.refresh_expires_at, None);
        assert_eq!(token.subject, None);
    }
}
