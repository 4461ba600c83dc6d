//! Core ResXiv auth client (validation, form state, session, API).

pub mod api;
pub mod auth;
pub mod config;
pub mod logging;
