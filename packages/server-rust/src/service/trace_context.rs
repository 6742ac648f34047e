//! W3C trace-context propagation for inbound calls.
//!
//! Transport adapters hand their header or metadata map to the
//! [`TraceContextPropagator`] through an [`Extractor`] and pass the resulting
//! parent [`Context`] into the endpoint. The tracing stage makes its span a
//! child of that parent, or a new root when the caller sent nothing usable.

use http::HeaderMap;
use opentelemetry::propagation::{Extractor, TextMapPropagator};
use opentelemetry::trace::TraceContextExt;
use opentelemetry::Context;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use tonic::metadata::{KeyRef, MetadataMap};

/// Header / metadata key carrying the inbound trace context.
pub const TRACEPARENT: &str = "traceparent";

struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(http::HeaderName::as_str).collect()
    }
}

struct MetadataExtractor<'a>(&'a MetadataMap);

impl Extractor for MetadataExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0
            .keys()
            .map(|k| match k {
                KeyRef::Ascii(k) => k.as_str(),
                KeyRef::Binary(k) => k.as_str(),
            })
            .collect()
    }
}

fn extract(extractor: &dyn Extractor) -> Option<Context> {
    let cx = TraceContextPropagator::new().extract_with_context(&Context::new(), extractor);
    if cx.span().span_context().is_valid() {
        Some(cx)
    } else {
        if extractor.get(TRACEPARENT).is_some() {
            tracing::debug!("ignoring malformed traceparent");
        }
        None
    }
}

/// Parent context carried by HTTP request headers, if any.
#[must_use]
pub fn extract_from_headers(headers: &HeaderMap) -> Option<Context> {
    extract(&HeaderExtractor(headers))
}

/// Parent context carried by gRPC request metadata, if any.
#[must_use]
pub fn extract_from_metadata(metadata: &MetadataMap) -> Option<Context> {
    extract(&MetadataExtractor(metadata))
}
