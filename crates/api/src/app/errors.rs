//! Consistent error responses.
//!
//! Every failure leaving the router is an [`ApiError`]. Errors pass three
//! stages on their way out:
//!
//! 1. unmatched routes synthesize a 404 ([`not_found`]);
//! 2. data-layer validation failures are remapped to a `"Validation error"`
//!    with a flat list of messages ([`ApiError::from`]);
//! 3. the terminal stage renders `{title, message, errors, stack}` with the
//!    error's status, or 500 when it carries none
//!    ([`crate::middleware::errors::render_errors`]).

use std::sync::Arc;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use keystone_auth::CsrfError;
use keystone_core::ModelValidationError;

pub const NOT_FOUND_TITLE: &str = "Resource Not Found";
pub const NOT_FOUND_MESSAGE: &str = "The requested resource couldn't be found.";
pub const VALIDATION_TITLE: &str = "Validation error";
pub const DEFAULT_TITLE: &str = "Server Error";
pub const CSRF_CODE: &str = "EBADCSRFTOKEN";

#[derive(Debug)]
pub struct ApiError {
    status: Option<StatusCode>,
    title: Option<String>,
    message: String,
    errors: Option<Vec<String>>,
    code: Option<&'static str>,
    report: anyhow::Error,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status: None,
            title: None,
            report: anyhow::anyhow!(message.clone()),
            message,
            errors: None,
            code: None,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Attach the underlying failure; it shows up in the stack.
    pub fn with_cause(mut self, cause: anyhow::Error) -> Self {
        self.report = cause.context(self.message.clone());
        self
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn not_found() -> Self {
        Self::new(NOT_FOUND_MESSAGE)
            .with_status(StatusCode::NOT_FOUND)
            .with_title(NOT_FOUND_TITLE)
            .with_errors(vec![NOT_FOUND_MESSAGE.to_string()])
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(message)
            .with_status(StatusCode::BAD_REQUEST)
            .with_title("Bad Request")
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(message)
            .with_status(StatusCode::UNAUTHORIZED)
            .with_title("Unauthorized")
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(message).with_status(StatusCode::FORBIDDEN)
    }

    pub fn payload_too_large() -> Self {
        Self::new("request entity too large")
            .with_status(StatusCode::PAYLOAD_TOO_LARGE)
            .with_title("Payload Too Large")
    }

    pub fn invalid_csrf_token(cause: CsrfError) -> Self {
        let mut err = Self::forbidden("invalid csrf token").with_code(CSRF_CODE);
        err.report = anyhow::Error::new(cause).context("invalid csrf token");
        err
    }

    /// Status sent to the client; errors that never set one are server errors.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_TITLE)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn errors(&self) -> Option<&[String]> {
        self.errors.as_deref()
    }

    pub fn code(&self) -> Option<&'static str> {
        self.code
    }

    /// The error and its cause chain, as shown to developers.
    pub fn stack(&self) -> String {
        format!("{:?}", self.report)
    }

    /// JSON body; `stack` is only populated when `expose_stack` is set.
    pub fn body(&self, expose_stack: bool) -> ErrorBody<'_> {
        ErrorBody {
            title: self.title(),
            message: &self.message,
            errors: self.errors(),
            stack: expose_stack.then(|| self.stack()),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title(), self.message)
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub title: &'a str,
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<&'a [String]>,
    pub stack: Option<String>,
}

/// Remap a data-layer validation failure.
impl From<ModelValidationError> for ApiError {
    fn from(err: ModelValidationError) -> Self {
        let errors = err.messages();
        Self {
            status: Some(StatusCode::BAD_REQUEST),
            title: Some(VALIDATION_TITLE.to_string()),
            message: err.message.clone(),
            errors: Some(errors),
            code: None,
            report: anyhow::Error::new(err),
        }
    }
}

/// Opaque failures become 500s, unless they wrap a validation failure.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ModelValidationError>() {
            Ok(validation) => validation.into(),
            Err(err) => Self {
                status: None,
                title: None,
                message: err.to_string(),
                errors: None,
                code: None,
                report: err,
            },
        }
    }
}

impl From<CsrfError> for ApiError {
    fn from(err: CsrfError) -> Self {
        Self::invalid_csrf_token(err)
    }
}

/// Marker the terminal error stage looks for on outgoing responses.
#[derive(Debug, Clone)]
pub struct ErrorReport(pub Arc<ApiError>);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Safe for production as-is; the error stage re-renders it with the
        // stack outside production.
        let mut res = (self.status(), Json(self.body(false))).into_response();
        res.extensions_mut().insert(ErrorReport(Arc::new(self)));
        res
    }
}

/// Router fallback: synthesize the 404 error.
pub async fn not_found() -> ApiError {
    ApiError::not_found()
}

#[cfg(test)]
mod tests {
    use keystone_core::{ValidationIssue, ValidationKind};
    use serde_json::json;

    use super::*;

    fn validation_failure() -> ModelValidationError {
        ModelValidationError::new(vec![
            ValidationIssue::new(ValidationKind::Format, "Invalid email").at("email"),
            ValidationIssue::new(ValidationKind::Unique, "Username must be unique").at("username"),
        ])
    }

    #[test]
    fn not_found_shape() {
        let err = ApiError::not_found();
        let body = serde_json::to_value(err.body(false)).unwrap();

        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body,
            json!({
                "title": "Resource Not Found",
                "message": "The requested resource couldn't be found.",
                "errors": ["The requested resource couldn't be found."],
                "stack": null,
            })
        );
    }

    #[test]
    fn validation_errors_are_flattened() {
        let err = ApiError::from(validation_failure());

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.title(), "Validation error");
        assert_eq!(
            err.errors().unwrap(),
            ["Invalid email".to_string(), "Username must be unique".to_string()]
        );
    }

    #[test]
    fn wrapped_validation_errors_are_remapped() {
        let wrapped = anyhow::Error::new(validation_failure());
        let err = ApiError::from(wrapped);

        assert_eq!(err.title(), "Validation error");
        assert_eq!(err.errors().map(|e| e.len()), Some(2));
    }

    #[test]
    fn opaque_errors_default_to_500() {
        let err = ApiError::from(anyhow::anyhow!("database unreachable"));
        let body = serde_json::to_value(err.body(false)).unwrap();

        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["title"], "Server Error");
        assert_eq!(body["message"], "database unreachable");
        assert!(body.get("errors").is_none());
        assert!(body["stack"].is_null());
    }

    #[test]
    fn explicit_status_is_kept() {
        let err = ApiError::new("Invalid credentials")
            .with_status(StatusCode::UNAUTHORIZED)
            .with_title("Login failed");

        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.title(), "Login failed");
    }

    #[test]
    fn stack_includes_cause_chain() {
        let err = ApiError::invalid_csrf_token(CsrfError::Mismatch);
        let body = serde_json::to_value(err.body(true)).unwrap();
        let stack = body["stack"].as_str().unwrap();

        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.code(), Some("EBADCSRFTOKEN"));
        assert!(stack.contains("invalid csrf token"));
        assert!(stack.contains("csrf token does not match secret"));
    }
}
