//! Auth form values and the submission state machine.
//!
//! ```text
//! Idle --begin()--> Submitting --finish(Ok)--> Success --reset()--> Idle
//!   ^                    |
//!   |                    +--finish(Err)--> Failed --edit()/reset()--> Idle
//!   +-- begin() with validation errors stays Idle
//! ```
//!
//! `begin()` while `Submitting` is a no-op, so a double submit never issues
//! a second backend call.

use std::future::Future;

use crate::api::ApiError;
use crate::auth::validation::{
    Field, FieldError, FormErrors, validate_confirm_password, validate_email,
    validate_login_password, validate_new_password, validate_required,
};

/// Shown when a call fails without a usable backend message.
pub const GENERIC_ERROR: &str = "Something went wrong. Please try again.";

/// A form that can be validated and submitted.
pub trait FormSpec {
    /// Fields this form renders; backend errors on other fields go to `general`.
    const FIELDS: &'static [Field];
    /// General message for network and unknown failures.
    const FALLBACK_ERROR: &'static str = GENERIC_ERROR;

    /// Checks every field independently.
    fn validate(&self) -> FormErrors;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    /// "Remember me": keep tokens in the persistent store.
    pub remember: bool,
}

impl FormSpec for LoginForm {
    const FIELDS: &'static [Field] = &[Field::Email, Field::Password];
    const FALLBACK_ERROR: &'static str = "Login failed. Please try again.";

    fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        errors.check(Field::Email, validate_email(&self.email));
        errors.check(Field::Password, validate_login_password(&self.password));
        errors
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub accept_terms: bool,
}

impl FormSpec for SignupForm {
    const FIELDS: &'static [Field] = &[
        Field::Name,
        Field::Email,
        Field::Password,
        Field::ConfirmPassword,
        Field::Terms,
    ];
    const FALLBACK_ERROR: &'static str = "Registration failed. Please try again.";

    fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        errors.check(Field::Name, validate_required(&self.name));
        errors.check(Field::Email, validate_email(&self.email));
        errors.check(Field::Password, validate_new_password(&self.password));
        errors.check(
            Field::ConfirmPassword,
            validate_confirm_password(&self.password, &self.confirm_password),
        );
        if !self.accept_terms {
            errors.insert(Field::Terms, FieldError::Required);
        }
        errors
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForgotPasswordForm {
    pub email: String,
}

impl FormSpec for ForgotPasswordForm {
    const FIELDS: &'static [Field] = &[Field::Email];
    const FALLBACK_ERROR: &'static str = "Could not send the reset email. Please try again.";

    fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        errors.check(Field::Email, validate_email(&self.email));
        errors
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetPasswordForm {
    pub token: String,
    pub password: String,
    pub confirm_password: String,
}

impl FormSpec for ResetPasswordForm {
    const FIELDS: &'static [Field] = &[Field::Token, Field::Password, Field::ConfirmPassword];
    const FALLBACK_ERROR: &'static str = "Could not reset the password. Please try again.";

    fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        errors.check(Field::Token, validate_required(&self.token));
        errors.check(Field::Password, validate_new_password(&self.password));
        errors.check(
            Field::ConfirmPassword,
            validate_confirm_password(&self.password, &self.confirm_password),
        );
        errors
    }
}

/// Where a form is in its submit lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitState {
    #[default]
    Idle,
    Submitting,
    Success,
    Failed,
}

/// Why `begin()` refused to start a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitBlocked {
    #[error("Please fix the highlighted fields")]
    Invalid,
    #[error("A submission is already in progress")]
    InFlight,
    #[error("This form was already submitted")]
    Completed,
}

/// Outcome of [`FormController::submit`] when it did not succeed.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Blocked(#[from] SubmitBlocked),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Holds one form's values, errors and submit state.
#[derive(Debug, Clone, Default)]
pub struct FormController<F> {
    form: F,
    errors: FormErrors,
    state: SubmitState,
}

impl<F: FormSpec> FormController<F> {
    pub fn new(form: F) -> Self {
        Self {
            form,
            errors: FormErrors::new(),
            state: SubmitState::Idle,
        }
    }

    pub fn form(&self) -> &F {
        &self.form
    }

    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    pub fn state(&self) -> SubmitState {
        self.state
    }

    /// The loading flag: a backend call is in flight.
    pub fn is_loading(&self) -> bool {
        self.state == SubmitState::Submitting
    }

    pub fn is_success(&self) -> bool {
        self.state == SubmitState::Success
    }

    /// Applies a user edit to `field`.
    ///
    /// Clears that field's error. An edit after a failure returns the form to
    /// `Idle` and drops the stale general message. Edits are ignored while a
    /// call is in flight.
    pub fn edit(&mut self, field: Field, apply: impl FnOnce(&mut F)) {
        if self.is_loading() {
            tracing::debug!(%field, "ignoring edit while submitting");
            return;
        }
        apply(&mut self.form);
        self.errors.clear_field(field);
        if self.state == SubmitState::Failed {
            self.state = SubmitState::Idle;
            self.errors.clear_general();
        }
    }

    /// Tries to move to `Submitting`.
    ///
    /// Validation errors replace the error map and keep the form `Idle`.
    ///
    /// # Errors
    /// Returns why the submission cannot start.
    pub fn begin(&mut self) -> Result<&F, SubmitBlocked> {
        match self.state {
            SubmitState::Submitting => return Err(SubmitBlocked::InFlight),
            SubmitState::Success => return Err(SubmitBlocked::Completed),
            SubmitState::Idle | SubmitState::Failed => {}
        }

        let errors = self.form.validate();
        if !errors.is_empty() {
            self.errors = errors;
            self.state = SubmitState::Idle;
            return Err(SubmitBlocked::Invalid);
        }

        self.errors.clear();
        self.state = SubmitState::Submitting;
        Ok(&self.form)
    }

    /// Records the backend outcome of the submission started by `begin()`.
    ///
    /// The outcome is handed back so callers can use the success value.
    ///
    /// # Errors
    /// Returns the API error unchanged.
    pub fn finish<T>(&mut self, outcome: Result<T, ApiError>) -> Result<T, ApiError> {
        if self.state != SubmitState::Submitting {
            tracing::warn!(state = ?self.state, "finish() called without a submission in flight");
            return outcome;
        }

        match &outcome {
            Ok(_) => {
                self.state = SubmitState::Success;
            }
            Err(err) => {
                self.state = SubmitState::Failed;
                self.apply_api_error(err);
                tracing::debug!(error = %err, "form submission failed");
            }
        }
        outcome
    }

    /// Manual "try again" / "resend": back to `Idle` from `Success` or `Failed`.
    pub fn reset(&mut self) {
        if self.is_loading() {
            return;
        }
        self.state = SubmitState::Idle;
        self.errors.clear();
    }

    /// Runs `begin()`, awaits `call` once, then `finish()`.
    ///
    /// `call` is not invoked when `begin()` refuses.
    ///
    /// # Errors
    /// Returns `Blocked` when the submission could not start, or `Api` when
    /// the backend call failed.
    pub async fn submit<T, Fut>(&mut self, call: impl FnOnce(&F) -> Fut) -> Result<T, SubmitError>
    where
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let pending = call(self.begin()?);
        let outcome = pending.await;
        Ok(self.finish(outcome)?)
    }

    fn apply_api_error(&mut self, err: &ApiError) {
        match err {
            ApiError::Rejected {
                message, fields, ..
            } => {
                let mut matched = false;
                for (name, text) in fields {
                    if let Some(field) = Field::from_wire(name).filter(|f| F::FIELDS.contains(f)) {
                        self.errors.insert(field, FieldError::Rejected(text.clone()));
                        matched = true;
                    }
                }
                if !matched {
                    let text = if message.trim().is_empty() {
                        F::FALLBACK_ERROR
                    } else {
                        message.as_str()
                    };
                    self.errors.set_general(text);
                }
            }
            ApiError::Network(_) | ApiError::Unexpected(_) => {
                self.errors.set_general(F::FALLBACK_ERROR);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::BTreeMap;

    use super::*;

    fn valid_signup() -> SignupForm {
        SignupForm {
            name: "Ada Lovelace".into(),
            email: "ada@lab.org".into(),
            password: "Abcdef1@".into(),
            confirm_password: "Abcdef1@".into(),
            accept_terms: true,
        }
    }

    fn rejected(message: &str, fields: &[(&str, &str)]) -> ApiError {
        ApiError::Rejected {
            status: 400,
            message: message.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_signup_reports_every_invalid_field() {
        let form = SignupForm {
            name: " ".into(),
            email: "not-an-email".into(),
            password: "short".into(),
            confirm_password: "other".into(),
            accept_terms: false,
        };
        let errors = form.validate();
        assert_eq!(errors.get(Field::Name), Some(&FieldError::Required));
        assert_eq!(errors.get(Field::Email), Some(&FieldError::InvalidFormat));
        assert_eq!(errors.get(Field::Password), Some(&FieldError::TooShort));
        assert_eq!(errors.get(Field::ConfirmPassword), Some(&FieldError::Mismatch));
        assert_eq!(errors.get(Field::Terms), Some(&FieldError::Required));
    }

    #[test]
    fn test_mismatch_even_when_both_passwords_are_valid() {
        let mut form = valid_signup();
        form.confirm_password = "Zyxwvu9$".into();
        let errors = form.validate();
        assert_eq!(errors.get(Field::Password), None);
        assert_eq!(errors.get(Field::ConfirmPassword), Some(&FieldError::Mismatch));
    }

    #[test]
    fn test_reset_uses_same_strength_rule_as_signup() {
        let form = ResetPasswordForm {
            token: "tok".into(),
            password: "abcdefgh".into(),
            confirm_password: "abcdefgh".into(),
        };
        assert_eq!(form.validate().get(Field::Password), Some(&FieldError::WeakPassword));
    }

    #[test]
    fn test_login_accepts_legacy_weak_password() {
        let form = LoginForm {
            email: "ada@lab.org".into(),
            password: "abc".into(),
            remember: false,
        };
        assert!(form.validate().is_empty());
    }

    #[test]
    fn test_invalid_form_stays_idle() {
        let mut ctrl = FormController::new(ForgotPasswordForm {
            email: "nope".into(),
        });
        assert_eq!(ctrl.begin().unwrap_err(), SubmitBlocked::Invalid);
        assert_eq!(ctrl.state(), SubmitState::Idle);
        assert!(!ctrl.is_loading());
        assert_eq!(ctrl.errors().get(Field::Email), Some(&FieldError::InvalidFormat));
    }

    #[test]
    fn test_begin_clears_errors_and_sets_loading() {
        let mut ctrl = FormController::new(ForgotPasswordForm {
            email: "nope".into(),
        });
        let _ = ctrl.begin();
        ctrl.edit(Field::Email, |f| f.email = "ada@lab.org".into());
        assert!(ctrl.errors().is_empty());

        assert!(ctrl.begin().is_ok());
        assert!(ctrl.is_loading());
        assert_eq!(ctrl.state(), SubmitState::Submitting);
        assert!(ctrl.errors().is_empty());
    }

    #[test]
    fn test_second_begin_while_submitting_is_noop() {
        let mut ctrl = FormController::new(valid_signup());
        assert!(ctrl.begin().is_ok());
        assert_eq!(ctrl.begin().unwrap_err(), SubmitBlocked::InFlight);
        assert_eq!(ctrl.state(), SubmitState::Submitting);
    }

    #[test]
    fn test_success_is_terminal_until_reset() {
        let mut ctrl = FormController::new(valid_signup());
        ctrl.begin().unwrap();
        assert_eq!(ctrl.finish(Ok(())).ok(), Some(()));
        assert!(ctrl.is_success());
        assert!(!ctrl.is_loading());
        assert_eq!(ctrl.begin().unwrap_err(), SubmitBlocked::Completed);

        ctrl.reset();
        assert_eq!(ctrl.state(), SubmitState::Idle);
        assert!(ctrl.begin().is_ok());
    }

    #[test]
    fn test_rejection_message_goes_to_general() {
        let mut ctrl = FormController::new(LoginForm {
            email: "ada@lab.org".into(),
            password: "pw".into(),
            remember: false,
        });
        ctrl.begin().unwrap();
        let result: Result<(), _> = ctrl.finish(Err(rejected("Invalid email or password", &[])));
        assert!(result.is_err());
        assert_eq!(ctrl.state(), SubmitState::Failed);
        assert!(!ctrl.is_loading());
        assert_eq!(ctrl.errors().general(), Some("Invalid email or password"));
    }

    #[test]
    fn test_unknown_error_uses_fallback() {
        let mut ctrl = FormController::new(LoginForm {
            email: "ada@lab.org".into(),
            password: "pw".into(),
            remember: false,
        });
        ctrl.begin().unwrap();
        let _: Result<(), _> = ctrl.finish(Err(ApiError::Unexpected("garbled".into())));
        assert_eq!(ctrl.errors().general(), Some(LoginForm::FALLBACK_ERROR));
    }

    #[test]
    fn test_field_rejection_attaches_to_field() {
        let mut ctrl = FormController::new(valid_signup());
        ctrl.begin().unwrap();
        let _: Result<(), _> = ctrl.finish(Err(rejected(
            "Registration failed",
            &[("email", "Email already registered"), ("avatar", "too big")],
        )));
        assert_eq!(
            ctrl.errors().message(Field::Email).as_deref(),
            Some("Email already registered")
        );
        assert_eq!(ctrl.errors().general(), None);
    }

    #[test]
    fn test_edit_after_failure_returns_to_idle() {
        let mut ctrl = FormController::new(valid_signup());
        ctrl.begin().unwrap();
        let _: Result<(), _> = ctrl.finish(Err(rejected(
            "Registration failed",
            &[("email", "Email already registered")],
        )));
        assert_eq!(ctrl.state(), SubmitState::Failed);

        ctrl.edit(Field::Email, |f| f.email = "ada2@lab.org".into());
        assert_eq!(ctrl.state(), SubmitState::Idle);
        assert!(ctrl.errors().is_empty());
        assert_eq!(ctrl.form().email, "ada2@lab.org");
    }

    #[test]
    fn test_edit_ignored_while_submitting() {
        let mut ctrl = FormController::new(valid_signup());
        ctrl.begin().unwrap();
        ctrl.edit(Field::Name, |f| f.name = "Changed".into());
        assert_eq!(ctrl.form().name, "Ada Lovelace");
    }

    #[tokio::test]
    async fn test_submit_skips_call_when_in_flight() {
        let calls = Cell::new(0);
        let mut ctrl = FormController::new(valid_signup());
        ctrl.begin().unwrap();

        let result = ctrl
            .submit(|_| {
                calls.set(calls.get() + 1);
                async { Ok::<_, ApiError>(()) }
            })
            .await;

        assert!(matches!(
            result,
            Err(SubmitError::Blocked(SubmitBlocked::InFlight))
        ));
        assert_eq!(calls.get(), 0);
    }

    #[tokio::test]
    async fn test_submit_calls_once_and_finishes() {
        let calls = Cell::new(0);
        let mut ctrl = FormController::new(valid_signup());

        let value = ctrl
            .submit(|form| {
                calls.set(calls.get() + 1);
                let email = form.email.clone();
                async move { Ok::<_, ApiError>(email) }
            })
            .await
            .unwrap();

        assert_eq!(value, "ada@lab.org");
        assert_eq!(calls.get(), 1);
        assert!(ctrl.is_success());
    }

    #[tokio::test]
    async fn test_submit_skips_call_when_invalid() {
        let calls = Cell::new(0);
        let mut ctrl = FormController::new(SignupForm::default());

        let result = ctrl
            .submit(|_| {
                calls.set(calls.get() + 1);
                async { Ok::<_, ApiError>(()) }
            })
            .await;

        assert!(matches!(result, Err(SubmitError::Blocked(SubmitBlocked::Invalid))));
        assert_eq!(calls.get(), 0);
        assert!(ctrl.errors().get(Field::Email).is_some());
    }
}
