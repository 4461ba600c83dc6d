//! Account command handlers.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, Result};
use resxiv_core::api::AuthClient;
use resxiv_core::auth::flows::{self, ResetTokenStatus};
use resxiv_core::auth::form::{
    ForgotPasswordForm, FormController, FormSpec, LoginForm, ResetPasswordForm, SignupForm,
};
use resxiv_core::auth::session::{mask_token, open_default};
use resxiv_core::config::{Config, paths};

/// Reads one line from stdin, prompting only on a terminal.
fn read_secret(label: &str) -> Result<String> {
    if io::stdin().is_terminal() {
        print!("{label}: ");
        io::stdout().flush()?;
    }

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .with_context(|| format!("read {} from stdin", label.to_lowercase()))?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Prints field errors to stderr and picks the error to surface.
fn form_failure<F: FormSpec>(ctrl: &FormController<F>, err: anyhow::Error) -> anyhow::Error {
    for (field, error) in ctrl.errors().iter() {
        eprintln!("  {field}: {}", error.message(field));
    }
    match ctrl.errors().general() {
        Some(general) => anyhow::anyhow!("{general}"),
        None => err,
    }
}

pub async fn login(
    api: &AuthClient,
    config: &Config,
    email: &str,
    remember: bool,
    redirect: Option<&str>,
) -> Result<()> {
    let password = read_secret("Password")?;
    let mut ctrl = FormController::new(LoginForm {
        email: email.to_string(),
        password,
        remember,
    });
    let mut session = open_default();

    let success = flows::login(
        &mut ctrl,
        api,
        &mut session,
        redirect,
        &config.session.landing_route,
    )
    .await
    .map_err(|e| form_failure(&ctrl, e))?;

    let who = if success.user.email.is_empty() {
        email.trim()
    } else {
        success.user.email.as_str()
    };
    let token = session.access_token().unwrap_or_default();
    let saved_to = if remember {
        paths::credentials_path()
    } else {
        paths::session_credentials_path()
    };

    println!("✓ Logged in as {who} (token: {})", mask_token(&token));
    println!("  Credentials saved to: {}", saved_to.display());
    println!("  Continue to: {}", success.route);
    Ok(())
}

pub async fn signup(api: &AuthClient, name: &str, email: &str, accept_terms: bool) -> Result<()> {
    let password = read_secret("Password")?;
    let confirm_password = read_secret("Confirm password")?;
    let mut ctrl = FormController::new(SignupForm {
        name: name.to_string(),
        email: email.to_string(),
        password,
        confirm_password,
        accept_terms,
    });

    let message = flows::signup(&mut ctrl, api)
        .await
        .map_err(|e| form_failure(&ctrl, e))?;

    println!("✓ {message}");
    Ok(())
}

pub async fn forgot_password(api: &AuthClient, email: &str) -> Result<()> {
    let mut ctrl = FormController::new(ForgotPasswordForm {
        email: email.to_string(),
    });

    let message = flows::forgot_password(&mut ctrl, api)
        .await
        .map_err(|e| form_failure(&ctrl, e))?;

    println!("✓ {message}");
    Ok(())
}

pub async fn reset_password(api: &AuthClient, token: &str) -> Result<()> {
    if let ResetTokenStatus::Invalid(reason) = flows::check_reset_token(api, token).await? {
        anyhow::bail!("{reason}");
    }

    let password = read_secret("New password")?;
    let confirm_password = read_secret("Confirm password")?;
    let mut ctrl = FormController::new(ResetPasswordForm {
        token: token.to_string(),
        password,
        confirm_password,
    });
    let mut session = open_default();

    let message = flows::reset_password(&mut ctrl, api, &mut session)
        .await
        .map_err(|e| form_failure(&ctrl, e))?;

    println!("✓ {message}");
    Ok(())
}

pub async fn logout(api: &AuthClient) -> Result<()> {
    let mut session = open_default();
    let was_logged_in = session.is_authenticated();
    let removed_from = if session.is_remembered() {
        paths::credentials_path()
    } else {
        paths::session_credentials_path()
    };

    flows::logout(api, &mut session).await?;

    if was_logged_in {
        println!("✓ Logged out");
        println!("  Credentials removed from: {}", removed_from.display());
    } else {
        println!("Not logged in (no credentials found).");
    }
    Ok(())
}

pub fn status(api: &AuthClient) {
    let session = open_default();

    match session.access_token() {
        Some(token) => {
            println!("Logged in (token: {})", mask_token(&token));
            let scope = if session.is_remembered() {
                "remembered"
            } else {
                "this session only"
            };
            println!("  Scope: {scope}");
        }
        None => println!("Not logged in."),
    }
    println!("  API: {}", api.base_url());
}

pub async fn refresh(api: &AuthClient) -> Result<()> {
    let mut session = open_default();

    if !session.refresh(api).await {
        anyhow::bail!("Session expired. Please log in again.");
    }

    let token = session.access_token().unwrap_or_default();
    println!("✓ Session refreshed (token: {})", mask_token(&token));
    Ok(())
}
