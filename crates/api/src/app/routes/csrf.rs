use axum::{
    Extension, Json,
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse},
};
use serde_json::json;

use crate::{app::errors::ApiError, context::CsrfContext};

/// Hand the client a fresh CSRF token, both as a script-readable
/// `XSRF-TOKEN` cookie and in the body.
pub async fn restore(Extension(csrf): Extension<CsrfContext>) -> Result<impl IntoResponse, ApiError> {
    let token = csrf.token()?;
    let cookie = csrf.readable_cookie(&token);

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(json!({ "XSRF-Token": token })),
    ))
}
