//! ResXiv auth REST API.

pub mod client;
pub mod error;
pub mod types;

pub use client::{ApiSettings, AuthClient};
pub use error::{ApiError, ApiResult};
pub use types::{
    Ack, ForgotPasswordRequest, LoginRequest, LoginResponse, RegisterRequest,
    ResetPasswordRequest, TokenPair, UserProfile,
};
