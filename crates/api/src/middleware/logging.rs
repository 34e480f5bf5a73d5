//! Access log: one line per response with method, path, status, latency and
//! response size.

use std::time::Duration;

use axum::http::{Request, Response, header::CONTENT_LENGTH};
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    trace::{DefaultOnBodyChunk, DefaultOnEos, DefaultOnRequest, MakeSpan, OnResponse, TraceLayer},
};
use tracing::Span;

pub type AccessLogLayer = TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    AccessSpan,
    DefaultOnRequest,
    AccessLog,
    DefaultOnBodyChunk,
    DefaultOnEos,
    (),
>;

pub fn layer() -> AccessLogLayer {
    // Failures are logged by the error stage, which knows the error itself.
    TraceLayer::new_for_http()
        .make_span_with(AccessSpan)
        .on_response(AccessLog)
        .on_failure(())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AccessSpan;

impl<B> MakeSpan<B> for AccessSpan {
    fn make_span(&mut self, req: &Request<B>) -> Span {
        tracing::info_span!("request", method = %req.method(), uri = %req.uri())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AccessLog;

impl<B> OnResponse<B> for AccessLog {
    fn on_response(self, res: &Response<B>, latency: Duration, _span: &Span) {
        let length = res
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        tracing::info!(
            status = res.status().as_u16(),
            latency_ms = latency.as_secs_f64() * 1000.0,
            length,
            "response"
        );
    }
}
