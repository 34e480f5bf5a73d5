use axum::{
    Router,
    routing::{get, post},
};

pub mod csrf;
pub mod system;

/// Routes bundled with the server. Business routers are merged next to these.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/api/csrf/restore", get(csrf::restore))
        .route("/api/test", post(system::echo))
}
