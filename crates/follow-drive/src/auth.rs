//! Credential loading for the two supported credential kinds.

use crate::config::DRIVE_FILE_SCOPE;
use follow_core::{FollowError, FollowResult};
use gcp_auth::{CustomServiceAccount, TokenProvider};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Google's OAuth token endpoint, used when a credential file names none.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Which kind of credential file is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialMode {
    /// A service-account key (`"type": "service_account"`).
    ServiceAccount,
    /// A user-delegated OAuth token file (`"type": "authorized_user"`).
    AuthorizedUser,
}

impl CredentialMode {
    /// Maps the `USE_SERVICE_ACCOUNT` switch to a mode.
    pub fn from_flag(use_service_account: bool) -> Self {
        if use_service_account {
            Self::ServiceAccount
        } else {
            Self::AuthorizedUser
        }
    }
}

/// Source of bearer tokens for Drive requests.
#[derive(Clone)]
pub enum AccessToken {
    /// Tokens minted from a service-account key.
    ServiceAccount(Arc<CustomServiceAccount>),
    /// A token obtained once at authentication time.
    Bearer(String),
}

impl AccessToken {
    /// Returns the bearer token to send with a request.
    pub async fn bearer(&self) -> FollowResult<String> {
        match self {
            Self::ServiceAccount(sa) => sa
                .token(&[DRIVE_FILE_SCOPE])
                .await
                .map(|t| t.as_str().to_string())
                .map_err(|e| FollowError::Auth(format!("service account token: {e}"))),
            Self::Bearer(token) => Ok(token.clone()),
        }
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ServiceAccount(_) => f.write_str("AccessToken::ServiceAccount"),
            Self::Bearer(_) => f.write_str("AccessToken::Bearer(..)"),
        }
    }
}

#[derive(Deserialize)]
struct AuthorizedUserFile {
    #[serde(default)]
    client_id: String,
    #[serde(default)]
    client_secret: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Loads a credential file and proves it is accepted.
///
/// A service-account key must mint a token. An authorized-user file always
/// exchanges its refresh token when it has one, since a stored access token
/// may be expired or revoked; a stored token is only used when there is no
/// refresh token. Every failure is [`FollowError::Auth`].
pub async fn authenticate(
    http: &reqwest::Client,
    credentials_path: &Path,
    mode: CredentialMode,
) -> FollowResult<AccessToken> {
    let raw = tokio::fs::read_to_string(credentials_path)
        .await
        .map_err(|e| {
            FollowError::Auth(format!(
                "cannot read credentials '{}': {e}",
                credentials_path.display()
            ))
        })?;

    let token = match mode {
        CredentialMode::ServiceAccount => {
            let sa = CustomServiceAccount::from_json(&raw)
                .map_err(|e| FollowError::Auth(format!("invalid service account key: {e}")))?;
            let token = AccessToken::ServiceAccount(Arc::new(sa));
            token.bearer().await?;
            token
        }
        CredentialMode::AuthorizedUser => {
            let file: AuthorizedUserFile = serde_json::from_str(&raw)
                .map_err(|e| FollowError::Auth(format!("invalid authorized user file: {e}")))?;
            let refresh_token = file.refresh_token.as_deref().filter(|t| !t.is_empty());
            let stored_token = file.token.as_deref().filter(|t| !t.is_empty());
            match (refresh_token, stored_token) {
                (Some(refresh_token), _) => AccessToken::Bearer(
                    exchange_refresh_token(http, &file, refresh_token).await?,
                ),
                (None, Some(token)) => {
                    warn!("No refresh token; using the stored access token as is");
                    AccessToken::Bearer(token.to_string())
                }
                (None, None) => {
                    return Err(FollowError::Auth(
                        "authorized user file has neither refresh_token nor token".to_string(),
                    ))
                }
            }
        }
    };

    info!(mode = ?mode, "Authenticated with Google Drive");
    Ok(token)
}

async fn exchange_refresh_token(
    http: &reqwest::Client,
    file: &AuthorizedUserFile,
    refresh_token: &str,
) -> FollowResult<String> {
    let uri = file.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
    let resp = http
        .post(uri)
        .form(&[
            ("grant_type", "refresh_token"),
            ("client_id", file.client_id.as_str()),
            ("client_secret", file.client_secret.as_str()),
            ("refresh_token", refresh_token),
        ])
        .send()
        .await
        .map_err(|e| FollowError::Auth(format!("token request failed: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        warn!(status = %status, "Refresh token rejected");
        return Err(FollowError::Auth(format!(
            "token endpoint returned {status}: {body}"
        )));
    }

    let parsed: TokenResponse = resp
        .json()
        .await
        .map_err(|e| FollowError::Auth(format!("invalid token response: {e}")))?;
    Ok(parsed.access_token)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials_file(json: &serde_json::Value) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.to_string().as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_mode_from_flag() {
        assert_eq!(CredentialMode::from_flag(true), CredentialMode::ServiceAccount);
        assert_eq!(CredentialMode::from_flag(false), CredentialMode::AuthorizedUser);
    }

    #[tokio::test]
    async fn test_missing_file_is_auth_error() {
        let http = reqwest::Client::new();
        let err = authenticate(
            &http,
            Path::new("/nonexistent/credentials.json"),
            CredentialMode::AuthorizedUser,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, FollowError::Auth(_)));
    }

    #[tokio::test]
    async fn test_malformed_service_account_is_auth_error() {
        let http = reqwest::Client::new();
        let file = credentials_file(&serde_json::json!({"type": "service_account"}));
        let err = authenticate(&http, file.path(), CredentialMode::ServiceAccount)
            .await
            .unwrap_err();
        assert!(matches!(err, FollowError::Auth(_)));
    }

    #[tokio::test]
    async fn test_authorized_user_token_without_refresh_token() {
        let http = reqwest::Client::new();
        let file = credentials_file(&serde_json::json!({
            "type": "authorized_user",
            "client_id": "cid",
            "client_secret": "secret",
            "token": "ya29.present"
        }));
        let token = authenticate(&http, file.path(), CredentialMode::AuthorizedUser)
            .await
            .unwrap();
        assert_eq!(token.bearer().await.unwrap(), "ya29.present");
    }

    #[tokio::test]
    async fn test_authorized_user_without_any_token_is_auth_error() {
        let http = reqwest::Client::new();
        let file = credentials_file(&serde_json::json!({
            "client_id": "cid",
            "client_secret": "secret"
        }));
        let err = authenticate(&http, file.path(), CredentialMode::AuthorizedUser)
            .await
            .unwrap_err();
        assert!(matches!(err, FollowError::Auth(_)));
    }

    #[tokio::test]
    async fn test_stored_token_is_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("refresh_token=rt-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.renewed",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let file = credentials_file(&serde_json::json!({
            "client_id": "cid",
            "client_secret": "secret",
            "refresh_token": "rt-2",
            "token": "ya29.expired-long-ago",
            "expiry": "2020-01-01T00:00:00Z",
            "token_uri": format!("{}/token", server.uri())
        }));
        let token = authenticate(&http, file.path(), CredentialMode::AuthorizedUser)
            .await
            .unwrap();
        assert_eq!(token.bearer().await.unwrap(), "ya29.renewed");
    }

    #[tokio::test]
    async fn test_stale_token_with_revoked_refresh_token_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"error": "invalid_grant"})),
            )
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let file = credentials_file(&serde_json::json!({
            "client_id": "cid",
            "client_secret": "secret",
            "refresh_token": "revoked",
            "token": "ya29.expired-long-ago",
            "token_uri": format!("{}/token", server.uri())
        }));
        let err = authenticate(&http, file.path(), CredentialMode::AuthorizedUser)
            .await
            .unwrap_err();
        assert!(matches!(err, FollowError::Auth(_)));
    }

    #[tokio::test]
    async fn test_authorized_user_exchanges_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=rt-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.fresh",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let file = credentials_file(&serde_json::json!({
            "client_id": "cid",
            "client_secret": "secret",
            "refresh_token": "rt-1",
            "token_uri": format!("{}/token", server.uri())
        }));
        let token = authenticate(&http, file.path(), CredentialMode::AuthorizedUser)
            .await
            .unwrap();
        assert_eq!(token.bearer().await.unwrap(), "ya29.fresh");
    }

    #[tokio::test]
    async fn test_rejected_refresh_token_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"error": "invalid_grant"})),
            )
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let file = credentials_file(&serde_json::json!({
            "client_id": "cid",
            "client_secret": "secret",
            "refresh_token": "revoked",
            "token_uri": format!("{}/token", server.uri())
        }));
        let err = authenticate(&http, file.path(), CredentialMode::AuthorizedUser)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid_grant"));
    }
}
