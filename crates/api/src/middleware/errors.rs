//! Terminal error stage and panic recovery.

use std::{any::Any, sync::Arc};

use axum::{
    body::Body,
    extract::{Request, State},
    http::{
        HeaderValue, StatusCode,
        header::{ALLOW, CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    app::errors::{ApiError, ErrorReport},
    config::AppConfig,
};

/// Upper bound on how much of a framework rejection body is kept as the message.
const MAX_REJECTION_BODY: usize = 16 * 1024;

/// Terminal error stage.
///
/// Every error response leaving the app goes out as the uniform JSON body:
/// - [`ApiError`]s are logged and, outside production, re-rendered with the stack;
/// - a bare 405 (known path, unrouted method) becomes the 404 error;
/// - any other 4xx/5xx without a report (extractor rejections, ...) keeps its
///   status and uses the original body text as `message`.
pub async fn render_errors(
    State(config): State<Arc<AppConfig>>,
    req: Request,
    next: Next,
) -> Response {
    let res = next.run(req).await;
    let status = res.status();
    let report = res.extensions().get::<ErrorReport>().cloned();

    let (err, res, adopted) = match report {
        Some(ErrorReport(err)) => (err, res, false),
        None if status == StatusCode::METHOD_NOT_ALLOWED => {
            let (mut parts, _) = res.into_parts();
            parts.headers.remove(ALLOW);
            let err = Arc::new(ApiError::not_found());
            (err, Response::from_parts(parts, Body::empty()), true)
        }
        None if status.is_client_error() || status.is_server_error() => {
            let (parts, body) = res.into_parts();
            let err = Arc::new(adopt(status, body).await);
            (err, Response::from_parts(parts, Body::empty()), true)
        }
        None => return res,
    };

    let status = err.status();
    if status.is_server_error() {
        tracing::error!(status = status.as_u16(), code = err.code(), error = ?err, "request failed");
    } else {
        tracing::warn!(status = status.as_u16(), code = err.code(), error = %err, "request rejected");
    }

    let expose_stack = !config.is_production();
    if !adopted && !expose_stack {
        return res;
    }

    let body = match serde_json::to_vec(&err.body(expose_stack)) {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(error = %e, "could not serialize error body");
            return res;
        }
    };

    let (mut parts, _) = res.into_parts();
    parts.status = status;
    parts
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
    parts.extensions.insert(ErrorReport(err));
    Response::from_parts(parts, Body::from(body))
}

/// Wrap a response the framework produced on its own into an [`ApiError`].
async fn adopt(status: StatusCode, body: Body) -> ApiError {
    let text = axum::body::to_bytes(body, MAX_REJECTION_BODY)
        .await
        .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string())
        .unwrap_or_default();

    let message = if text.is_empty() {
        status.canonical_reason().unwrap_or("Server Error").to_string()
    } else {
        text
    };

    ApiError::new(message).with_status(status)
}

/// Response for a handler that panicked; used with `CatchPanicLayer::custom`.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    ApiError::new("Internal Server Error")
        .with_cause(anyhow::anyhow!("handler panicked: {detail}"))
        .into_response()
}
