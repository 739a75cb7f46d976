use serde::{Deserialize, Serialize};

/// Email/password pair sent to the sign-up and sign-in endpoints.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// The account email address.
    pub email: String,

    /// The account password.
    pub password: String,
}

impl Credentials {
    /// Create a new credential pair.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

// Hand-written so passwords never end up in logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The body returned by a successful sign-up or sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Bearer token for subsequent requests and the chat handshake.
    pub access_token: String,

    /// The email the token was issued for.
    pub email: String,

    /// Backend user id, when the server includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Refresh token, when the server includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Token lifetime in seconds, when the server includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
}

/// The identity behind a bearer token, as reported by `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// The account email address.
    pub email: String,

    /// Backend user id, when the server includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Request body for `POST /auth/oauth`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthRequest {
    /// Provider name, e.g. `google`.
    pub provider: String,
}

/// Response body for `POST /auth/oauth`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthRedirect {
    /// Where the user should be sent to sign in with the provider.
    pub url: String,
}

/// Response body for the backend's liveness route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Free-form status text.
    pub message: String,
}
