//! Caller authentication.
//!
//! Every request to the analysis API (except `/health`) must carry a
//! bearer credential identifying the calling user. Verification happens
//! before any classification work begins, so an unauthenticated caller
//! never costs an AI API call.

use async_trait::async_trait;
use serde::Deserialize;

/// Minimum plausible token length; anything shorter is rejected without
/// a round trip to the auth service.
pub const MIN_TOKEN_LEN: usize = 20;

/// The verified identity of a caller, carried through the request as an
/// axum extension.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    /// The caller's own bearer token, forwarded to the storage backend
    /// so row-level security is enforced by the caller's identity.
    pub bearer_token: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authentication required. Please log in.")]
    MissingCredential,
    #[error("Invalid authentication token")]
    MalformedToken,
    /// The auth service examined the token and refused it.
    #[error("credential rejected: {0}")]
    Rejected(String),
    /// The auth service itself could not be reached or misbehaved.
    #[error("auth service error: {0}")]
    Backend(String),
}

/// Verifies a bearer token and resolves the calling user.
#[async_trait]
pub trait CredentialVerifier: Send + Sync + 'static {
    async fn verify(&self, bearer_token: &str) -> Result<AuthenticatedUser, AuthError>;
}

/// Shape of the auth service's user endpoint response.
#[derive(Deserialize)]
struct UserResponse {
    id: String,
}

/// Verifier backed by the managed auth service's `/auth/v1/user`
/// endpoint. The token is presented as-is; the service decides.
pub struct HttpCredentialVerifier {
    auth_url: String,
    api_key: String,
}

impl HttpCredentialVerifier {
    pub fn new(auth_url: String, api_key: String) -> Self {
        Self { auth_url, api_key }
    }
}

#[async_trait]
impl CredentialVerifier for HttpCredentialVerifier {
    async fn verify(&self, bearer_token: &str) -> Result<AuthenticatedUser, AuthError> {
        let url = format!("{}/auth/v1/user", self.auth_url);
        let api_key = self.api_key.clone();
        let token = bearer_token.to_string();

        // ureq is synchronous, so wrap in spawn_blocking.
        let user: UserResponse = tokio::task::spawn_blocking(move || {
            let agent = ureq::Agent::new_with_defaults();
            let response = agent
                .get(&url)
                .header("apikey", &api_key)
                .header("authorization", &format!("Bearer {token}"))
                .call()
                .map_err(|e| match e {
                    ureq::Error::StatusCode(code) if code == 401 || code == 403 => {
                        AuthError::Rejected(format!("HTTP {code}"))
                    }
                    other => AuthError::Backend(other.to_string()),
                })?;
            response
                .into_body()
                .read_json()
                .map_err(|e| AuthError::Backend(format!("user response decode: {e}")))
        })
        .await
        .map_err(|e| AuthError::Backend(format!("task join error: {e}")))??;

        Ok(AuthenticatedUser {
            user_id: user.id,
            bearer_token: bearer_token.to_string(),
        })
    }
}
