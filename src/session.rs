//! The signed-in identity.
//!
//! A [`SessionStore`] holds a bearer token and the email it resolves to.  A token read back from
//! storage is not trusted until [`SessionStore::restore`] has checked it against the auth
//! gateway; until then `email` is `None` and [`SessionStore::is_authenticated`] is false.

use crate::client::AuthGateway;
use crate::error::Result;
use crate::observability::SESSION_INVALIDATIONS;
use crate::storage::SessionStorage;

/// What [`SessionStore::restore`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Nothing was persisted.
    NoToken,
    /// The token was accepted and resolved to this email.
    Authenticated(String),
    /// The token was rejected; the session and its persisted copy were cleared.
    Invalidated,
}

/// Current token and identity, backed by a [`SessionStorage`].
pub struct SessionStore<S: SessionStorage> {
    storage: S,
    token: Option<String>,
    email: Option<String>,
}

impl<S: SessionStorage> SessionStore<S> {
    /// Read any persisted token out of `storage`.  The token is held but not yet validated.
    pub fn load(storage: S) -> Result<Self> {
        let token = storage.load()?;
        Ok(Self {
            storage,
            token,
            email: None,
        })
    }

    /// The current token, validated or not.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// The validated identity.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// True once a token has been resolved to an identity.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.email.is_some()
    }

    /// Persist `token` and record it with its identity.
    pub fn set_session(&mut self, token: impl Into<String>, email: impl Into<String>) -> Result<()> {
        let token = token.into();
        self.storage.save(&token)?;
        self.token = Some(token);
        self.email = Some(email.into());
        Ok(())
    }

    /// Forget the session and its persisted copy.
    ///
    /// The in-memory token and email are always dropped together, even when removing the
    /// persisted copy fails; that failure is returned.
    pub fn clear(&mut self) -> Result<()> {
        self.token = None;
        self.email = None;
        self.storage.clear()
    }

    /// Validate the held token against `gateway`.
    pub async fn restore<G: AuthGateway + ?Sized>(&mut self, gateway: &G) -> Result<RestoreOutcome> {
        let Some(token) = self.token.clone() else {
            return Ok(RestoreOutcome::NoToken);
        };
        match gateway.get_profile(&token).await {
            Ok(profile) => {
                tracing::info!(email = %profile.email, "restored session");
                self.email = Some(profile.email.clone());
                Ok(RestoreOutcome::Authenticated(profile.email))
            }
            Err(err) => {
                tracing::info!(error = %err, "persisted token rejected; clearing session");
                SESSION_INVALIDATIONS.click();
                self.clear()?;
                Ok(RestoreOutcome::Invalidated)
            }
        }
    }

    /// Sign in through `gateway` and record the resulting session.
    pub async fn sign_in<G: AuthGateway + ?Sized>(
        &mut self,
        gateway: &G,
        email: &str,
        password: &str,
    ) -> Result<()> {
        let resp = gateway.sign_in(email, password).await?;
        self.set_session(resp.access_token, resp.email)
    }

    /// Create an account through `gateway` and record the resulting session.
    pub async fn sign_up<G: AuthGateway + ?Sized>(
        &mut self,
        gateway: &G,
        email: &str,
        password: &str,
    ) -> Result<()> {
        let resp = gateway.sign_up(email, password).await?;
        self.set_session(resp.access_token, resp.email)
    }
}
