//! HTTP API: server bootstrap, middleware pipeline and error responses.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;

pub use app::build_app;
pub use app::errors::ApiError;
pub use config::{AppConfig, Environment};
