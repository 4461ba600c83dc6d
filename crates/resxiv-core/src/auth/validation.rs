//! Credential validation for the auth forms.
//!
//! Every field is checked on its own; a form is submittable when
//! [`FormErrors::is_empty`] holds for the result.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Minimum password length for new passwords.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Special characters accepted by the strength rule.
pub const PASSWORD_SPECIALS: &str = "@$!%*?&";

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// A form field that can carry an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Name,
    Email,
    Password,
    ConfirmPassword,
    Terms,
    Token,
}

impl Field {
    /// Wire name used by the backend for this field.
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::Password => "password",
            Field::ConfirmPassword => "confirm_password",
            Field::Terms => "terms_accepted",
            Field::Token => "token",
        }
    }

    /// Maps a backend field name onto a form field.
    ///
    /// Accepts both snake_case and the camelCase spellings the web client used.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "name" | "full_name" | "fullName" => Some(Field::Name),
            "email" => Some(Field::Email),
            "password" | "new_password" | "newPassword" => Some(Field::Password),
            "confirm_password" | "confirmPassword" => Some(Field::ConfirmPassword),
            "terms_accepted" | "termsAccepted" | "terms" => Some(Field::Terms),
            "token" => Some(Field::Token),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::Email => "Email",
            Field::Password => "Password",
            Field::ConfirmPassword => "Confirm password",
            Field::Terms => "Terms acceptance",
            Field::Token => "Reset token",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a single field failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    Required,
    InvalidFormat,
    TooShort,
    WeakPassword,
    Mismatch,
    /// The backend refused this value (e.g. the email is already registered).
    Rejected(String),
}

impl FieldError {
    /// Human-readable message for `field`.
    pub fn message(&self, field: Field) -> String {
        match (self, field) {
            (FieldError::Required, Field::Terms) => {
                "You must accept the terms and conditions".to_string()
            }
            (FieldError::Required, Field::ConfirmPassword) => {
                "Please confirm your password".to_string()
            }
            (FieldError::Required, _) => format!("{} is required", field.label()),
            (FieldError::InvalidFormat, _) => "Please enter a valid email address".to_string(),
            (FieldError::TooShort, _) => {
                format!("Password must be at least {MIN_PASSWORD_LEN} characters")
            }
            (FieldError::WeakPassword, _) => format!(
                "Password must contain uppercase, lowercase, number and special character ({PASSWORD_SPECIALS})"
            ),
            (FieldError::Mismatch, _) => "Passwords do not match".to_string(),
            (FieldError::Rejected(message), _) => message.clone(),
        }
    }
}

/// Per-field errors plus the reserved whole-form slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    fields: BTreeMap<Field, FieldError>,
    general: Option<String>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.general.is_none()
    }

    pub fn insert(&mut self, field: Field, error: FieldError) {
        self.fields.insert(field, error);
    }

    /// Records `result` under `field` when it is an error.
    pub fn check(&mut self, field: Field, result: Result<(), FieldError>) {
        if let Err(error) = result {
            self.insert(field, error);
        }
    }

    pub fn get(&self, field: Field) -> Option<&FieldError> {
        self.fields.get(&field)
    }

    /// Message for `field`, if it has an error.
    pub fn message(&self, field: Field) -> Option<String> {
        self.get(field).map(|e| e.message(field))
    }

    pub fn clear_field(&mut self, field: Field) {
        self.fields.remove(&field);
    }

    pub fn general(&self) -> Option<&str> {
        self.general.as_deref()
    }

    pub fn set_general(&mut self, message: impl Into<String>) {
        self.general = Some(message.into());
    }

    pub fn clear_general(&mut self) {
        self.general = None;
    }

    pub fn clear(&mut self) {
        self.fields.clear();
        self.general = None;
    }

    /// Field errors in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &FieldError)> {
        self.fields.iter().map(|(f, e)| (*f, e))
    }
}

/// Checks an email address.
///
/// # Errors
/// `Required` for blank input, `InvalidFormat` when the value is not
/// shaped like `local@domain.tld`.
pub fn validate_email(email: &str) -> Result<(), FieldError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(FieldError::Required);
    }
    if !EMAIL_RE.is_match(email) {
        return Err(FieldError::InvalidFormat);
    }
    Ok(())
}

/// Checks a password being chosen on signup or reset.
///
/// # Errors
/// `Required`, `TooShort` below [`MIN_PASSWORD_LEN`] characters, or
/// `WeakPassword` when a character class is missing.
pub fn validate_new_password(password: &str) -> Result<(), FieldError> {
    if password.is_empty() {
        return Err(FieldError::Required);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(FieldError::TooShort);
    }
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| PASSWORD_SPECIALS.contains(c));
    if !(has_lower && has_upper && has_digit && has_special) {
        return Err(FieldError::WeakPassword);
    }
    Ok(())
}

/// Checks a password typed on the login form. Presence only.
///
/// # Errors
/// `Required` for an empty password.
pub fn validate_login_password(password: &str) -> Result<(), FieldError> {
    if password.is_empty() {
        return Err(FieldError::Required);
    }
    Ok(())
}

/// Checks the confirmation against the password.
///
/// # Errors
/// `Required` when empty, `Mismatch` when it differs from `password`.
pub fn validate_confirm_password(password: &str, confirm: &str) -> Result<(), FieldError> {
    if confirm.is_empty() {
        return Err(FieldError::Required);
    }
    if confirm != password {
        return Err(FieldError::Mismatch);
    }
    Ok(())
}

/// Checks a free-text field that must not be blank.
///
/// # Errors
/// `Required` for blank input.
pub fn validate_required(value: &str) -> Result<(), FieldError> {
    if value.trim().is_empty() {
        return Err(FieldError::Required);
    }
    Ok(())
}
