//! Client-side session: access/refresh tokens across two stores.
//!
//! "Remember me" picks the persistent store, otherwise the session-scoped
//! store is used. A key lives in at most one of them: `set` targets exactly
//! one store and evicts any copy from the other, `clear` removes from both.

use anyhow::Result;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};

use crate::api::{AuthClient, TokenPair};
use crate::auth::storage::{FileStore, KeyValueStore};
use crate::config::paths;

/// Storage key of the access token.
pub const ACCESS_TOKEN: &str = "access_token";
/// Storage key of the refresh token.
pub const REFRESH_TOKEN: &str = "refresh_token";

/// Session backed by the credential files under `RESXIV_HOME` and the
/// runtime directory.
pub type FileSession = SessionStore<FileStore, FileStore>;

/// Opens the session at the default paths.
pub fn open_default() -> FileSession {
    SessionStore::new(
        FileStore::new(paths::credentials_path()),
        FileStore::new(paths::session_credentials_path()),
    )
}

/// Returns a masked version of a token for display (first 12 chars + ...).
pub fn mask_token(token: &str) -> String {
    if token.chars().count() <= 16 {
        return "***".to_string();
    }
    let head: String = token.chars().take(12).collect();
    format!("{head}...")
}

/// Token holder over a persistent store `P` and a session-scoped store `S`.
#[derive(Debug, Clone)]
pub struct SessionStore<P, S> {
    persistent: P,
    session: S,
}

impl<P: KeyValueStore, S: KeyValueStore> SessionStore<P, S> {
    pub fn new(persistent: P, session: S) -> Self {
        Self {
            persistent,
            session,
        }
    }

    pub fn persistent(&self) -> &P {
        &self.persistent
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// Writes `value` to the persistent store if `remember`, else to the
    /// session-scoped store.
    ///
    /// The other store is evicted before the write, so a failure never
    /// leaves the key in both.
    ///
    /// # Errors
    /// Returns an error if either store fails.
    pub fn set(&mut self, key: &str, value: &str, remember: bool) -> Result<()> {
        if remember {
            self.session.remove(key)?;
            self.persistent.set(key, value)
        } else {
            self.persistent.remove(key)?;
            self.session.set(key, value)
        }
    }

    /// Reads the persistent store first, then the session-scoped one.
    /// Empty values count as absent.
    ///
    /// # Errors
    /// Returns an error if a store cannot be read.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        if let Some(value) = self.persistent.get(key)?.filter(|v| !v.is_empty()) {
            return Ok(Some(value));
        }
        Ok(self.session.get(key)?.filter(|v| !v.is_empty()))
    }

    /// Removes `key` from both stores. Idempotent.
    ///
    /// Both stores are attempted even if the first one fails.
    ///
    /// # Errors
    /// Returns the first store error.
    pub fn clear(&mut self, key: &str) -> Result<()> {
        let persistent = self.persistent.remove(key);
        let session = self.session.remove(key);
        persistent?;
        session?;
        Ok(())
    }

    /// The access token, treating unreadable storage and tokens that cannot
    /// be sent as a header as no token.
    pub fn access_token(&self) -> Option<String> {
        self.token(ACCESS_TOKEN).filter(|token| {
            let usable = bearer_value(token).is_some();
            if !usable {
                tracing::warn!("stored access token is not a valid header value; ignoring it");
            }
            usable
        })
    }

    /// True iff a usable access token is present.
    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    /// True when the refresh token lives in the persistent store.
    pub fn is_remembered(&self) -> bool {
        self.persistent
            .get(REFRESH_TOKEN)
            .ok()
            .flatten()
            .is_some_and(|v| !v.is_empty())
    }

    /// Headers to attach to authenticated requests: empty without a token,
    /// otherwise exactly one `Authorization: Bearer <token>`.
    pub fn auth_header(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = self.access_token().as_deref().and_then(bearer_value) {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    /// Stores both tokens in the store selected by `remember`.
    ///
    /// # Errors
    /// Returns an error if a store cannot be written.
    pub fn store_tokens(&mut self, tokens: &TokenPair, remember: bool) -> Result<()> {
        self.set(ACCESS_TOKEN, &tokens.access_token, remember)?;
        self.set(REFRESH_TOKEN, &tokens.refresh_token, remember)?;
        tracing::debug!(remember, "stored session tokens");
        Ok(())
    }

    /// Removes both tokens from both stores.
    ///
    /// # Errors
    /// Returns the first store error; every removal is still attempted.
    pub fn clear_tokens(&mut self) -> Result<()> {
        let access = self.clear(ACCESS_TOKEN);
        let refresh = self.clear(REFRESH_TOKEN);
        access?;
        refresh?;
        Ok(())
    }

    /// Exchanges the refresh token for a new pair.
    ///
    /// The new pair goes to the store that held the old one. Any failure
    /// clears both tokens and reports `false` (not authenticated); there is
    /// no retry, callers send the user back to login.
    pub async fn refresh(&mut self, api: &AuthClient) -> bool {
        let remember = self.is_remembered();
        let Some(refresh_token) = self.token(REFRESH_TOKEN) else {
            tracing::debug!("no refresh token; session is not authenticated");
            self.discard_tokens();
            return false;
        };

        match api.refresh(&refresh_token).await {
            Ok(tokens) => match self.store_tokens(&tokens, remember) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(error = %format!("{e:#}"), "failed to store refreshed tokens");
                    self.discard_tokens();
                    false
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "token refresh failed; clearing session");
                self.discard_tokens();
                false
            }
        }
    }

    fn token(&self, key: &str) -> Option<String> {
        match self.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %format!("{e:#}"), "failed to read session token");
                None
            }
        }
    }

    fn discard_tokens(&mut self) {
        if let Err(e) = self.clear_tokens() {
            tracing::warn!(error = %format!("{e:#}"), "failed to clear session tokens");
        }
    }
}

fn bearer_value(token: &str) -> Option<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}")).ok()?;
    value.set_sensitive(true);
    Some(value)
}
