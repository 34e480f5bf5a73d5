use axum::{Extension, Json, http::StatusCode};
use serde_json::{Value, json};

use crate::context::JsonBody;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Echo the parsed JSON body back; proves body parsing and CSRF are wired.
pub async fn echo(Extension(body): Extension<JsonBody>) -> Json<Value> {
    Json(json!({ "requestBody": body.0 }))
}
