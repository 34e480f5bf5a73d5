use std::collections::HashMap;

use axum::{
    extract::Request,
    http::{HeaderMap, header::COOKIE},
    middleware::Next,
    response::Response,
};
use cookie::Cookie;

use crate::context::RequestCookies;

/// Parse the `Cookie` header(s) into [`RequestCookies`].
pub async fn parse_cookies(mut req: Request, next: Next) -> Response {
    let cookies = read_cookies(req.headers());
    req.extensions_mut().insert(cookies);
    next.run(req).await
}

pub fn read_cookies(headers: &HeaderMap) -> RequestCookies {
    let mut cookies = HashMap::new();

    for header in headers.get_all(COOKIE) {
        let Ok(header) = header.to_str() else {
            continue;
        };

        // Malformed pairs are skipped rather than failing the request.
        for cookie in Cookie::split_parse_encoded(header).flatten() {
            cookies
                .entry(cookie.name().to_string())
                .or_insert_with(|| cookie.value().to_string());
        }
    }

    RequestCookies::new(cookies)
}
