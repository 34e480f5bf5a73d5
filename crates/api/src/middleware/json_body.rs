use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{HeaderMap, header::CONTENT_LENGTH, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;

use crate::{app::errors::ApiError, config::AppConfig, context::JsonBody};

/// Buffer and parse JSON request bodies into [`JsonBody`].
///
/// The raw bytes are put back on the request so downstream `Json` extractors
/// keep working. Non-JSON requests get an empty object.
pub async fn parse_json(
    State(config): State<Arc<AppConfig>>,
    req: Request,
    next: Next,
) -> Response {
    if !is_json(req.headers()) {
        let mut req = req;
        req.extensions_mut().insert(JsonBody::default());
        return next.run(req).await;
    }

    let limit = config.json_limit_bytes;
    if declared_length(req.headers()).is_some_and(|len| len > limit) {
        return ApiError::payload_too_large().into_response();
    }

    let (mut parts, body) = req.into_parts();
    let bytes = match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let inner = e.into_inner();
            if inner.is::<LengthLimitError>() {
                return ApiError::payload_too_large().into_response();
            }
            return ApiError::bad_request(format!("failed to read request body: {inner}"))
                .into_response();
        }
    };

    let value = match decode(&bytes) {
        Ok(value) => value,
        Err(err) => return err.into_response(),
    };

    parts.extensions.insert(JsonBody(value));
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

/// `application/json` and any `+json` media type.
pub fn is_json(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };

    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    essence == "application/json" || (essence.starts_with("application/") && essence.ends_with("+json"))
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Strict decoding: empty bodies become `{}`, and only objects or arrays are
/// accepted at the top level.
fn decode(bytes: &Bytes) -> Result<serde_json::Value, ApiError> {
    let first = bytes.iter().copied().find(|b| !b.is_ascii_whitespace());
    match first {
        None => return Ok(JsonBody::default().0),
        Some(b'{') | Some(b'[') => {}
        Some(other) => {
            return Err(ApiError::bad_request(format!(
                "Unexpected token {} in JSON: body must be an object or array",
                char::from(other)
            )));
        }
    }

    serde_json::from_slice(bytes).map_err(|e| ApiError::bad_request(e.to_string()))
}
