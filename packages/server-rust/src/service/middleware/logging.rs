//! Logging middleware for operations.
//!
//! Emits exactly one structured record per call once the outcome is known.
//! Records go through `tracing`, so a failing sink never reaches the caller.

use std::task::{Context, Poll};
use std::time::Instant;

use tower::{Layer, Service};
use tracing::{error, info, warn};

use super::OperationFuture;
use crate::service::operation::{Operation, OperationError, OperationResponse};

// ---------------------------------------------------------------------------
// LoggingLayer
// ---------------------------------------------------------------------------

/// Tower layer that logs operation name, input, outcome and elapsed time.
#[derive(Debug, Clone, Copy)]
pub struct LoggingLayer {
    operation: &'static str,
}

impl LoggingLayer {
    #[must_use]
    pub fn new(operation: &'static str) -> Self {
        Self { operation }
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = LoggingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoggingService {
            inner,
            operation: self.operation,
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoggingService<S> {
    inner: S,
    operation: &'static str,
}

impl<S> Service<Operation> for LoggingService<S>
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

    fn call(&mut self, op: Operation) -> Self::Future {
        let method = self.operation;
        let call_id = op.ctx().call_id;
        let input = op.input_summary();

        // Started before `call` so admission checks are part of the timing.
        let start = Instant::now();
        let fut = self.inner.call(op);

        Box::pin(async move {
            let result = fut.await;

            #[allow(clippy::cast_possible_truncation)]
            let took_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(resp) if resp.is_ok() => {
                    info!(method, call_id, input = %input, output = %resp, took_ms, "call complete");
                }
                Ok(resp) => {
                    warn!(method, call_id, input = %input, error = %resp, took_ms, "call failed");
                }
                Err(e) if e.is_rejection() => {
                    warn!(method, call_id, input = %input, error = %e, took_ms, "call rejected");
                }
                Err(e) => {
                    error!(method, call_id, input = %input, error = ?e, took_ms, "call errored");
                }
            }

            result
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
