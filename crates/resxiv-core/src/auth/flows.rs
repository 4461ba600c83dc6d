//! End-to-end auth flows: one form submission plus its session side effects.

use anyhow::{Context, Result};

use crate::api::{
    ApiError, AuthClient, ForgotPasswordRequest, LoginRequest, RegisterRequest,
    ResetPasswordRequest, UserProfile,
};
use crate::auth::form::{
    ForgotPasswordForm, FormController, LoginForm, ResetPasswordForm, SignupForm,
};
use crate::auth::session::SessionStore;
use crate::auth::storage::KeyValueStore;

/// Shown after a forgot-password request whether or not the account exists.
pub const RESET_LINK_SENT: &str =
    "If an account exists for that email, a password reset link has been sent.";

/// Shown after signup when the backend sends no message of its own.
pub const SIGNUP_COMPLETE: &str =
    "Account created. Please check your email to verify your account.";

/// Shown after a password reset when the backend sends no message.
pub const PASSWORD_RESET_COMPLETE: &str =
    "Your password has been reset. Please log in with your new password.";

#[derive(Debug, Clone)]
pub struct LoginSuccess {
    pub user: UserProfile,
    /// Where the caller should navigate next.
    pub route: String,
}

/// Outcome of checking a reset token before the reset form is shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetTokenStatus {
    Valid,
    /// Invalid or expired, with the backend's explanation.
    Invalid(String),
}

/// Picks the post-login route.
///
/// `redirect` is honored only when it is a same-origin path (`/x`, not
/// `//host/x`); anything else falls back to `landing`.
pub fn resolve_landing_route(redirect: Option<&str>, landing: &str) -> String {
    match redirect {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        Some(path) => {
            tracing::debug!(redirect = path, "ignoring unsafe redirect");
            landing.to_string()
        }
        None => landing.to_string(),
    }
}

/// Submits the login form and stores the issued tokens.
///
/// Tokens go to the persistent store when the form's remember flag is set,
/// otherwise to the session-scoped one.
///
/// # Errors
/// Returns the submission error (field errors are on `ctrl`), or a storage
/// error if the tokens cannot be saved.
pub async fn login<P, S>(
    ctrl: &mut FormController<LoginForm>,
    api: &AuthClient,
    session: &mut SessionStore<P, S>,
    redirect: Option<&str>,
    landing: &str,
) -> Result<LoginSuccess>
where
    P: KeyValueStore,
    S: KeyValueStore,
{
    let remember = ctrl.form().remember;
    let response = ctrl
        .submit(|form| {
            let request = LoginRequest::from(form);
            async move { api.login(&request).await }
        })
        .await?;

    session
        .store_tokens(&response.tokens, remember)
        .context("Failed to save session tokens")?;
    tracing::info!(remember, "logged in");

    Ok(LoginSuccess {
        user: response.user,
        route: resolve_landing_route(redirect, landing),
    })
}

/// Submits the signup form. Returns the confirmation to show.
///
/// # Errors
/// Returns the submission error; field errors are on `ctrl`.
pub async fn signup(ctrl: &mut FormController<SignupForm>, api: &AuthClient) -> Result<String> {
    let ack = ctrl
        .submit(|form| {
            let request = RegisterRequest::from(form);
            async move { api.register(&request).await }
        })
        .await?;

    Ok(ack
        .message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| SIGNUP_COMPLETE.to_string()))
}

/// Requests a reset link. The confirmation never reveals whether the
/// account exists.
///
/// # Errors
/// Returns the submission error; field errors are on `ctrl`.
pub async fn forgot_password(
    ctrl: &mut FormController<ForgotPasswordForm>,
    api: &AuthClient,
) -> Result<&'static str> {
    ctrl.submit(|form| {
        let request = ForgotPasswordRequest::from(form);
        async move { api.forgot_password(&request).await }
    })
    .await?;

    Ok(RESET_LINK_SENT)
}

/// Asks the backend whether `token` can still be used for a reset.
///
/// # Errors
/// Returns an error only when the backend could not be asked.
pub async fn check_reset_token(api: &AuthClient, token: &str) -> Result<ResetTokenStatus> {
    let token = token.trim();
    if token.is_empty() {
        return Ok(ResetTokenStatus::Invalid(
            "Reset link is missing its token.".to_string(),
        ));
    }

    match api.validate_reset_token(token).await {
        Ok(()) => Ok(ResetTokenStatus::Valid),
        Err(ApiError::Rejected { message, .. }) => Ok(ResetTokenStatus::Invalid(message)),
        Err(e) => Err(e).context("Failed to check reset token"),
    }
}

/// Submits the reset form. On success every local token is dropped since
/// the backend ends prior sessions.
///
/// # Errors
/// Returns the submission error; field errors are on `ctrl`.
pub async fn reset_password<P, S>(
    ctrl: &mut FormController<ResetPasswordForm>,
    api: &AuthClient,
    session: &mut SessionStore<P, S>,
) -> Result<String>
where
    P: KeyValueStore,
    S: KeyValueStore,
{
    let ack = ctrl
        .submit(|form| {
            let request = ResetPasswordRequest::from(form);
            async move { api.reset_password(&request).await }
        })
        .await?;

    session.clear_tokens().context("Failed to clear session tokens")?;

    Ok(ack
        .message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| PASSWORD_RESET_COMPLETE.to_string()))
}

/// Ends the session. The server call is best-effort; local tokens are
/// cleared regardless of its outcome.
///
/// # Errors
/// Returns an error only if local tokens cannot be removed.
pub async fn logout<P, S>(api: &AuthClient, session: &mut SessionStore<P, S>) -> Result<()>
where
    P: KeyValueStore,
    S: KeyValueStore,
{
    if session.is_authenticated() {
        if let Err(e) = api.logout(session.auth_header()).await {
            tracing::warn!(error = %e, "server logout failed; clearing local session anyway");
        }
    } else {
        tracing::debug!("no access token; skipping server logout");
    }

    session.clear_tokens().context("Failed to clear session tokens")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::api::ApiSettings;

    #[test]
    fn test_redirect_to_relative_path() {
        assert_eq!(
            resolve_landing_route(Some("/papers/42?tab=notes"), "/projects"),
            "/papers/42?tab=notes"
        );
    }

    #[test]
    fn test_unsafe_redirect_falls_back() {
        for redirect in ["//evil.example/x", "https://evil.example", "papers", ""] {
            assert_eq!(resolve_landing_route(Some(redirect), "/projects"), "/projects");
        }
        assert_eq!(resolve_landing_route(None, "/home"), "/home");
    }

    #[tokio::test]
    async fn test_blank_reset_token_is_invalid_without_a_call() {
        // nothing listens on this port; a request would fail
        let api = AuthClient::new(&ApiSettings {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_millis(200),
        })
        .unwrap();

        let status = check_reset_token(&api, "   ").await.unwrap();
        assert!(matches!(status, ResetTokenStatus::Invalid(_)));
    }
}
