//! Completing an OAuth sign-in.
//!
//! The provider redirects back to the client with `access_token` in the URL fragment.  The token
//! is checked against the profile endpoint before it is stored.

use url::Url;

use crate::client::AuthGateway;
use crate::error::Result;
use crate::session::SessionStore;
use crate::storage::SessionStorage;

/// What [`handle_callback`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The fragment carried no token; the session was left alone.
    NoToken,
    /// The token was accepted and stored for this email.
    SignedIn(String),
}

/// Pull `access_token` out of a callback URL's fragment.
///
/// Accepts a full URL or a bare fragment (with or without the leading `#`).
pub fn token_from_fragment(callback: &str) -> Option<String> {
    let fragment = match Url::parse(callback) {
        Ok(url) => url.fragment().map(str::to_string)?,
        Err(_) => callback.trim_start_matches('#').to_string(),
    };
    url::form_urlencoded::parse(fragment.as_bytes())
        .find(|(key, _)| key == "access_token")
        .map(|(_, value)| value.into_owned())
        .filter(|token| !token.is_empty())
}

/// Validate the token in `callback` and, if it is good, store it in `store`.
///
/// Runs once; a rejected token is reported as an authentication error and the store is not
/// touched.
pub async fn handle_callback<G, S>(
    callback: &str,
    gateway: &G,
    store: &mut SessionStore<S>,
) -> Result<CallbackOutcome>
where
    G: AuthGateway + ?Sized,
    S: SessionStorage,
{
    let Some(token) = token_from_fragment(callback) else {
        tracing::debug!("oauth callback carried no access_token");
        return Ok(CallbackOutcome::NoToken);
    };
    let profile = gateway.get_profile(&token).await.map_err(|err| {
        tracing::warn!(error = %err, "oauth verification failed");
        err
    })?;
    store.set_session(token, profile.email.clone())?;
    Ok(CallbackOutcome::SignedIn(profile.email))
}
