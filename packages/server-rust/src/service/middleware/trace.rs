//! Distributed-tracing middleware for operations.
//!
//! Opens an `endpoint` span around the rest of the chain. When the transport
//! extracted a parent context the span is attached to it with
//! [`OpenTelemetrySpanExt::set_parent`]; otherwise the installed
//! `OpenTelemetryLayer` starts a root trace. Inner stages receive the span's
//! own context as their parent.

use std::task::{Context, Poll};

use opentelemetry::trace::TraceContextExt;
use tower::{Layer, Service};
use tracing::{field, info_span, Instrument};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::OperationFuture;
use crate::service::operation::{Operation, OperationError, OperationResponse};

// ---------------------------------------------------------------------------
// TracingLayer
// ---------------------------------------------------------------------------

/// Tower layer that wraps each call in a span named after the operation.
#[derive(Debug, Clone, Copy)]
pub struct TracingLayer {
    operation: &'static str,
}

impl TracingLayer {
    #[must_use]
    pub fn new(operation: &'static str) -> Self {
        Self { operation }
    }
}

impl<S> Layer<S> for TracingLayer {
    type Service = TracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TracingService {
            inner,
            operation: self.operation,
        }
    }
}

// ---------------------------------------------------------------------------
// TracingService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TracingService<S> {
    inner: S,
    operation: &'static str,
}

impl<S> Service<Operation> for TracingService<S>
where
    S: Service<Operation, Response = OperationResponse, Error = OperationError> + Send,
    S::Future: Send + 'static,
{
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = OperationFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut op: Operation) -> Self::Future {
        let span = info_span!(
            "endpoint",
            otel.name = self.operation,
            otel.status_code = field::Empty,
            call_id = op.ctx().call_id,
            trace_id = field::Empty,
            span_id = field::Empty,
            parent_span_id = field::Empty,
        );

        if let Some(parent) = op.ctx_mut().parent.take() {
            span.record(
                "parent_span_id",
                field::display(parent.span().span_context().span_id()),
            );
            let _ = span.set_parent(parent);
        }

        // Without an OpenTelemetry layer the context is empty and carries no ids.
        let current = span.context();
        {
            let otel_span = current.span();
            let ids = otel_span.span_context();
            if ids.is_valid() {
                span.record("trace_id", field::display(ids.trace_id()));
                span.record("span_id", field::display(ids.span_id()));
            }
        }
        op.ctx_mut().parent = Some(current);

        let fut = span.in_scope(|| self.inner.call(op));

        Box::pin(
            async move {
                let result = fut.await;
                let status = match &result {
                    Ok(resp) if resp.is_ok() => "OK",
                    _ => "ERROR",
                };
                tracing::Span::current().record("otel.status_code", status);
                result
            }
            .instrument(span),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
