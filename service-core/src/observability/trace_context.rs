//! Trace propagation for calls to third-party APIs.
//!
//! Kraken and Splitwise ignore these headers. Collectors in front of them, and
//! the mock servers used in tests, can still tie a request back to its sweep.

use opentelemetry::trace::TraceContextExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub const TRACEPARENT: &str = "traceparent";
pub const TRACESTATE: &str = "tracestate";

/// W3C `traceparent` and `tracestate` for the current span. Empty unless the
/// span is being exported.
pub fn trace_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();

    let context = Span::current().context();
    let span = context.span();
    let span_context = span.span_context();
    if !span_context.is_valid() {
        return headers;
    }

    let traceparent = format!(
        "00-{}-{}-{:02x}",
        span_context.trace_id(),
        span_context.span_id(),
        span_context.trace_flags().to_u8()
    );
    if let Ok(value) = HeaderValue::from_str(&traceparent) {
        headers.insert(TRACEPARENT, value);
    }

    let state = span_context.trace_state().header();
    if !state.is_empty()
        && let Ok(value) = HeaderValue::from_str(&state)
    {
        headers.insert(TRACESTATE, value);
    }

    headers
}

/// An outbound request that reads the trace context when sent, so it lands
/// in whichever span is current at that point.
pub struct TracedRequest(RequestBuilder);

impl TracedRequest {
    pub fn header(self, key: &str, value: &str) -> Self {
        Self(self.0.header(key, value))
    }

    pub fn bearer_auth(self, token: &str) -> Self {
        Self(self.0.bearer_auth(token))
    }

    pub fn json<T: serde::Serialize + ?Sized>(self, body: &T) -> Self {
        Self(self.0.json(body))
    }

    pub async fn send(self) -> Result<Response, reqwest::Error> {
        self.0.headers(trace_headers()).send().await
    }
}

pub trait TracedClientExt {
    fn traced_get(&self, url: &str) -> TracedRequest;
    fn traced_post(&self, url: &str) -> TracedRequest;
}

impl TracedClientExt for Client {
    fn traced_get(&self, url: &str) -> TracedRequest {
        TracedRequest(self.get(url))
    }

    fn traced_post(&self, url: &str) -> TracedRequest {
        TracedRequest(self.post(url))
    }
}
