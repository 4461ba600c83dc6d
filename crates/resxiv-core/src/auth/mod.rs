//! Credential validation, form submission, and the client-side session.

pub mod flows;
pub mod form;
pub mod session;
pub mod storage;
pub mod validation;

pub use form::{FormController, FormSpec, SubmitBlocked, SubmitError, SubmitState};
pub use session::{FileSession, SessionStore, mask_token};
pub use validation::{Field, FieldError, FormErrors};
