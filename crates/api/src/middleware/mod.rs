//! Request pipeline, in the order requests traverse it:
//!
//! `logging` → `errors` (terminal error rendering) → `cookies` → `json_body`
//! → `cors` (development only) → `security` → `csrf` → routes.

pub mod cookies;
pub mod cors;
pub mod csrf;
pub mod errors;
pub mod json_body;
pub mod logging;
pub mod security;
