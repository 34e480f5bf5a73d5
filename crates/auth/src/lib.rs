//! `keystone-auth` — request-forgery protection primitives.
//!
//! This crate is intentionally decoupled from HTTP: it knows how to mint a
//! per-client secret and derive/verify tokens from it. Where the secret is
//! stored (cookie) and where tokens are read from (body, query, headers) is
//! the API layer's business.

pub mod csrf;

pub use csrf::{CsrfError, CsrfSecret, issue_token, verify_token};
