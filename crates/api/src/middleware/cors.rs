use axum::http::Method;
use tower_http::cors::{AllowHeaders, Any, CorsLayer};

/// Open CORS policy used outside production: any origin, the common verbs,
/// and whatever request headers the preflight asks for.
pub fn layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .allow_headers(AllowHeaders::mirror_request())
}
