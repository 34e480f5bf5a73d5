use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Query, Request, State},
    http::{HeaderMap, HeaderValue, Method, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Response},
};

use keystone_auth::{CsrfError, CsrfSecret, verify_token};

use crate::{
    app::errors::ApiError,
    config::AppConfig,
    context::{CSRF_SECRET_COOKIE, CsrfContext, JsonBody, RequestCookies},
};

/// Field/parameter name carrying the token in bodies and query strings.
pub const TOKEN_FIELD: &str = "_csrf";

/// Headers checked for a token, in order.
pub const TOKEN_HEADERS: [&str; 4] = ["csrf-token", "xsrf-token", "x-csrf-token", "x-xsrf-token"];

/// Issue a CSRF secret to new clients and verify tokens on unsafe methods.
///
/// A new secret cookie is set on the response even when verification fails,
/// so the client can fetch a token and retry.
pub async fn csrf_protection(
    State(config): State<Arc<AppConfig>>,
    mut req: Request,
    next: Next,
) -> Response {
    let existing = req
        .extensions()
        .get::<RequestCookies>()
        .and_then(|c| c.get(CSRF_SECRET_COOKIE))
        .and_then(|v| CsrfSecret::parse(v).ok());

    let is_new = existing.is_none();
    let ctx = CsrfContext::new(
        existing.unwrap_or_else(CsrfSecret::generate),
        config.is_production(),
    );

    let mut res = match check(&req, &ctx) {
        Ok(()) => {
            req.extensions_mut().insert(ctx.clone());
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!(method = %req.method(), uri = %req.uri(), error = %e, "csrf check failed");
            ApiError::invalid_csrf_token(e).into_response()
        }
    };

    if is_new {
        match HeaderValue::from_str(&ctx.secret_cookie()) {
            Ok(v) => {
                res.headers_mut().append(SET_COOKIE, v);
            }
            Err(e) => tracing::warn!(error = %e, "could not encode csrf cookie"),
        }
    }

    res
}

fn check(req: &Request, ctx: &CsrfContext) -> Result<(), CsrfError> {
    if is_safe(req.method()) {
        return Ok(());
    }

    let token = find_token(req).ok_or(CsrfError::MissingToken)?;
    verify_token(ctx.secret(), &token)
}

/// Methods that never require a token.
pub fn is_safe(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD || *method == Method::OPTIONS
}

/// Locate a token: JSON body field, then query parameter, then headers.
fn find_token(req: &Request) -> Option<String> {
    let from_body = req
        .extensions()
        .get::<JsonBody>()
        .and_then(|b| b.0.get(TOKEN_FIELD))
        .and_then(|v| v.as_str())
        .map(str::to_string);
    if from_body.is_some() {
        return from_body;
    }

    let from_query = Query::<HashMap<String, String>>::try_from_uri(req.uri())
        .ok()
        .and_then(|Query(mut q)| q.remove(TOKEN_FIELD));
    if from_query.is_some() {
        return from_query;
    }

    token_from_headers(req.headers())
}

fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    TOKEN_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .next()
}
