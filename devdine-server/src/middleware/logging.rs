//! Middleware for logging requests/responses for server-side
//! [axum::http::Request] and [axum::http::Response].

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::time::{Duration, Instant};

/// Header carrying the request identifier set by [`super::request_ulid`].
pub const REQUEST_ID: &str = "x-request-id";

/// What we know about a finished request.
#[derive(Debug)]
pub struct RequestSummary<'a> {
    /// Request method
    pub method: &'a Method,
    /// Request path, without the query
    pub path: &'a str,
    /// Request identifier, if one was set
    pub request_id: Option<&'a str>,
    /// Response status
    pub status: StatusCode,
    /// Time spent producing the response
    pub latency: Duration,
}

/// Where and at which level a [`RequestSummary`] gets logged.
pub trait RequestLogger: Send + Sync + 'static {
    /// Log the summary
    fn log(summary: &RequestSummary<'_>);
}

/// Logs every request at info level, server errors at error level.
#[derive(Clone, Copy, Debug)]
pub struct Logger;

impl RequestLogger for Logger {
    fn log(summary: &RequestSummary<'_>) {
        if summary.status.is_server_error() {
            tracing::error!(
                subject = "response",
                category = "http.response",
                method = %summary.method,
                path = summary.path,
                request_id = summary.request_id,
                status = summary.status.as_u16(),
                latency_ms = summary.latency.as_millis() as u64,
                "request failed"
            );
        } else {
            tracing::info!(
                subject = "response",
                category = "http.response",
                method = %summary.method,
                path = summary.path,
                request_id = summary.request_id,
                status = summary.status.as_u16(),
                latency_ms = summary.latency.as_millis() as u64,
                "request finished"
            );
        }
    }
}

/// Logs at debug level only. Meant for chatty endpoints like health probes.
#[derive(Clone, Copy, Debug)]
pub struct DebugOnlyLogger;

impl RequestLogger for DebugOnlyLogger {
    fn log(summary: &RequestSummary<'_>) {
        tracing::debug!(
            subject = "response",
            category = "http.response",
            method = %summary.method,
            path = summary.path,
            request_id = summary.request_id,
            status = summary.status.as_u16(),
            latency_ms = summary.latency.as_millis() as u64,
            "request finished"
        );
    }
}

/// Middleware function for logging the outcome of each request.
///
/// Bodies are never logged, they carry verification codes.
pub async fn log_request_response<L: RequestLogger>(
    request: Request<Body>,
    next: Next<Body>,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request
        .headers()
        .get(REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let response = next.run(request).await;

    L::log(&RequestSummary {
        method: &method,
        path: &path,
        request_id: request_id.as_deref(),
        status: response.status(),
        latency: start.elapsed(),
    });

    response
}
