//! `keystone-core` — error model shared between the persistence layer and the HTTP edge.
//!
//! This crate contains **no transport concerns**; it only describes failures in
//! a shape the API layer can normalize.

pub mod error;

pub use error::{ModelValidationError, ValidationIssue, ValidationKind};
