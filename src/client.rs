use std::env;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, RequestBuilder, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{AUTH_FAILURES, AUTH_REQUESTS};
use crate::types::{
    AuthResponse, Credentials, HealthResponse, OAuthRedirect, OAuthRequest, Profile,
};

const DEFAULT_API_URL: &str = "http://localhost:8000/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The four auth exchanges the rest of the crate depends on.
///
/// Each call is a single request/response with no retry.  Every failure, whether the server
/// rejected the request or the request never completed, surfaces as
/// [`Error::Authentication`].
#[async_trait::async_trait]
pub trait AuthGateway: Send + Sync {
    /// Create an account and return its first token.
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthResponse>;

    /// Exchange credentials for a token.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthResponse>;

    /// Resolve a token to the identity it was issued for.
    async fn get_profile(&self, token: &str) -> Result<Profile>;

    /// Ask the backend where to send the user to sign in with `provider`.
    async fn get_oauth_redirect_url(&self, provider: &str) -> Result<String>;
}

/// HTTP client for the backend's `/auth` routes.
#[derive(Debug, Clone)]
pub struct AuthClient {
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
}

impl AuthClient {
    /// Create a new auth client.
    ///
    /// The base URL can be provided directly or read from the CONFIDANT_API_URL environment
    /// variable, falling back to a backend on localhost.
    pub fn new(base_url: Option<String>) -> Result<Self> {
        Self::with_options(base_url, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(base_url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let base_url = match base_url {
            Some(url) => url,
            None => env::var("CONFIDANT_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
        };
        let base_url = parse_base_url(&base_url)?;

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// The base every route is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Check that the backend is up, returning its status message.
    pub async fn health(&self) -> Result<String> {
        let request = self.client.get(self.endpoint("")?).headers(default_headers());
        let body: HealthResponse = self.execute(request, "Health check failed").await?;
        Ok(body.message)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B, failure: &str) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .client
            .post(self.endpoint(path)?)
            .headers(default_headers())
            .json(body);
        self.execute(request, failure).await
    }

    /// Send one request and decode its JSON body.  Any failure becomes an authentication
    /// error carrying `failure` as its message.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder, failure: &str) -> Result<T> {
        AUTH_REQUESTS.click();
        let result = async {
            let response = request.send().await.map_err(|e| {
                tracing::warn!(error = %e, timeout = ?self.timeout, "auth request did not complete");
                Error::authentication_with_source(failure, Box::new(e))
            })?;
            let status = response.status();
            if !status.is_success() {
                tracing::debug!(%status, "auth request rejected");
                return Err(Error::authentication(failure));
            }
            response
                .json::<T>()
                .await
                .map_err(|e| Error::authentication_with_source(failure, Box::new(e)))
        }
        .await;
        if result.is_err() {
            AUTH_FAILURES.click();
        }
        result
    }
}

#[async_trait::async_trait]
impl AuthGateway for AuthClient {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let body = Credentials::new(email, password);
        self.post_json("auth/signup", &body, "Signup failed").await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let body = Credentials::new(email, password);
        self.post_json("auth/signin", &body, "Signin failed").await
    }

    async fn get_profile(&self, token: &str) -> Result<Profile> {
        let mut headers = default_headers();
        let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| Error::authentication("Invalid token"))?;
        headers.insert(header::AUTHORIZATION, bearer);
        let request = self.client.get(self.endpoint("auth/me")?).headers(headers);
        self.execute(request, "Invalid token").await
    }

    async fn get_oauth_redirect_url(&self, provider: &str) -> Result<String> {
        let body = OAuthRequest {
            provider: provider.to_string(),
        };
        let redirect: OAuthRedirect = self
            .post_json("auth/oauth", &body, "OAuth URL fetch failed")
            .await?;
        Ok(redirect.url)
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

/// Parse a base URL so that relative routes resolve beneath it rather than replacing its
/// last path segment.
fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
