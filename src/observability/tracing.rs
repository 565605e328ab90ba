//! Request spans.
//!
//! Every request runs inside a span carrying its method, path and
//! `x-request-id`, so all events logged while serving it can be correlated.

use axum::{body::Body, http::Request};
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::http::request::RequestIdExt;

/// Span for one HTTP request.
pub fn make_request_span(request: &Request<Body>) -> Span {
    let request_id = request.request_id().unwrap_or("-");

    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id,
    )
}

/// Trace layer opening [`make_request_span`] for each request.
pub fn http_trace_layer(
) -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, fn(&Request<Body>) -> Span> {
    TraceLayer::new_for_http().make_span_with(make_request_span as fn(&Request<Body>) -> Span)
}
