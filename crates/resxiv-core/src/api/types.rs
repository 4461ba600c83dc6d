//! Request and response bodies of the auth API.

use serde::{Deserialize, Serialize};

use crate::auth::form::{ForgotPasswordForm, LoginForm, ResetPasswordForm, SignupForm};

/// Access/refresh token pair issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Profile returned with a successful login.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub email: String,
    #[serde(alias = "full_name", alias = "fullName")]
    pub name: Option<String>,
    #[serde(alias = "isVerified")]
    pub is_verified: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub remember_me: bool,
}

impl From<&LoginForm> for LoginRequest {
    fn from(form: &LoginForm) -> Self {
        Self {
            email: form.email.trim().to_string(),
            password: form.password.clone(),
            remember_me: form.remember,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub user: UserProfile,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub terms_accepted: bool,
}

impl From<&SignupForm> for RegisterRequest {
    fn from(form: &SignupForm) -> Self {
        Self {
            name: form.name.trim().to_string(),
            email: form.email.trim().to_string(),
            password: form.password.clone(),
            confirm_password: form.confirm_password.clone(),
            terms_accepted: form.accept_terms,
        }
    }
}

/// Generic acknowledgment (`{"message": ..}`), all fields optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Ack {
    pub message: Option<String>,
    pub user: Option<UserProfile>,
}

#[derive(Debug, Serialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

impl From<&ForgotPasswordForm> for ForgotPasswordRequest {
    fn from(form: &ForgotPasswordForm) -> Self {
        Self {
            email: form.email.trim().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl From<&ResetPasswordForm> for ResetPasswordRequest {
    fn from(form: &ResetPasswordForm) -> Self {
        Self {
            token: form.token.trim().to_string(),
            new_password: form.password.clone(),
            confirm_password: form.confirm_password.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde_json::Value;

    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}
