//! HTTP 请求追踪层
//!
//! 每个请求一个 `http.request` span；启用 opentelemetry 时从请求头恢复远端上下文

use axum::http::Request;
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    trace::{MakeSpan, TraceLayer},
};
use tracing::{Span, info_span};

#[cfg(feature = "opentelemetry")]
use opentelemetry::{Context, propagation::Extractor, trace::TraceContextExt};
#[cfg(feature = "opentelemetry")]
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub type HttpTraceLayer = TraceLayer<SharedClassifier<ServerErrorsAsFailures>, RealmdMakeSpan>;

pub fn http_trace_layer() -> HttpTraceLayer {
    TraceLayer::new_for_http().make_span_with(RealmdMakeSpan)
}

#[derive(Clone, Debug, Default)]
pub struct RealmdMakeSpan;

impl<B> MakeSpan<B> for RealmdMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        // 令牌头不进入 span
        let span = info_span!(
            "http.request",
            method = %request.method(),
            path = %request.uri().path(),
            query = request.uri().query().unwrap_or(""),
            version = ?request.version()
        );

        #[cfg(feature = "opentelemetry")]
        if let Some(context) = extract_remote_context(request.headers()) {
            span.set_parent(context);
        }

        span
    }
}

#[cfg(feature = "opentelemetry")]
fn extract_remote_context(headers: &axum::http::HeaderMap) -> Option<Context> {
    struct HeaderExtractor<'a>(&'a axum::http::HeaderMap);

    impl Extractor for HeaderExtractor<'_> {
        fn get(&self, key: &str) -> Option<&str> {
            self.0.get(key).and_then(|value| value.to_str().ok())
        }

        fn keys(&self) -> Vec<&str> {
            self.0.keys().map(|name| name.as_str()).collect()
        }
    }

    let context = opentelemetry::global::get_text_map_propagator(|propagator| {
        propagator.extract(&HeaderExtractor(headers))
    });
    context
        .span()
        .span_context()
        .is_valid()
        .then_some(context.clone())
}
