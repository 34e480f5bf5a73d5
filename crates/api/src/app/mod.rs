//! HTTP application wiring (Axum router + middleware pipeline).
//!
//! - `routes/`: bundled HTTP routes (health, CSRF token restore, echo)
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Router, middleware::from_fn, middleware::from_fn_with_state};
use tower_http::catch_panic::CatchPanicLayer;

use crate::{config::AppConfig, middleware};

pub mod errors;
pub mod routes;

/// Build the full HTTP router around `routes` (public entrypoint used by `main.rs`).
///
/// Middleware runs in this order for every request, including unmatched ones:
/// access log, error rendering, panic recovery, cookies, JSON body, CORS
/// (development only), `Cross-Origin-Resource-Policy`, CSRF, then `routes` or
/// the 404 fallback.
pub fn build_app(config: AppConfig, routes: Router) -> Router {
    let config = Arc::new(config);

    // Layers wrap everything added before them, so the innermost goes first.
    let mut app = Router::new()
        .merge(routes)
        .fallback(errors::not_found)
        .layer(from_fn_with_state(config.clone(), middleware::csrf::csrf_protection))
        .layer(middleware::security::cross_origin_resource_policy());

    if !config.is_production() {
        app = app.layer(middleware::cors::layer());
    }

    app.layer(from_fn_with_state(config.clone(), middleware::json_body::parse_json))
        .layer(from_fn(middleware::cookies::parse_cookies))
        .layer(CatchPanicLayer::custom(middleware::errors::panic_response))
        .layer(from_fn_with_state(config, middleware::errors::render_errors))
        .layer(middleware::logging::layer())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;

    async fn call(app: Router, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, serde_json::Value) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let headers = res.headers().clone();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, body)
    }

    #[tokio::test]
    async fn fallback_runs_through_the_pipeline() {
        let app = build_app(AppConfig::default(), routes::router());
        let req = Request::get("/missing").body(Body::empty()).unwrap();

        let (status, headers, body) = call(app, req).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(headers["cross-origin-resource-policy"], "cross-origin");
        assert!(headers.get_all("set-cookie").iter().any(|v| v.to_str().unwrap().starts_with("_csrf=")));
        assert_eq!(body["title"], "Resource Not Found");
        assert!(body["stack"].is_string());
    }

    #[tokio::test]
    async fn unrouted_method_is_not_found() {
        let app = build_app(AppConfig::default(), routes::router());
        let req = Request::get("/api/test").body(Body::empty()).unwrap();

        let (status, headers, body) = call(app, req).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(headers.get("allow").is_none());
        assert_eq!(headers["content-type"], "application/json");
        assert_eq!(body["title"], "Resource Not Found");
        assert_eq!(body["errors"][0], "The requested resource couldn't be found.");
        assert!(body["stack"].is_string());
    }

    #[tokio::test]
    async fn options_without_cors_is_not_found_in_production() {
        let app = build_app(AppConfig::production(), routes::router());
        let req = Request::options("/health").body(Body::empty()).unwrap();

        let (status, _, body) = call(app, req).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["title"], "Resource Not Found");
        assert!(body["stack"].is_null());
    }

    #[tokio::test]
    async fn rendered_errors_carry_content_length() {
        let app = build_app(AppConfig::default(), routes::router());
        let req = Request::get("/missing").body(Body::empty()).unwrap();

        let res = app.oneshot(req).await.unwrap();
        let declared: usize = res.headers()["content-length"].to_str().unwrap().parse().unwrap();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();

        assert_eq!(declared, bytes.len());
    }

    #[tokio::test]
    async fn health_is_plain_ok() {
        let app = build_app(AppConfig::production(), routes::router());
        let req = Request::get("/health").body(Body::empty()).unwrap();

        let (status, headers, body) = call(app, req).await;

        assert_eq!(status, StatusCode::OK);
        assert!(headers.get("access-control-allow-origin").is_none());
        assert!(body.is_null());
    }
}
