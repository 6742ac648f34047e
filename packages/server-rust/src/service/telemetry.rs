//! Telemetry collaborators handed to every endpoint at construction.
//!
//! [`Telemetry`] holds the `tracing` dispatcher (spans and log records) and
//! the `metrics` recorder an endpoint reports to. The pipeline never reads
//! process-wide defaults: the binary passes the subscriber and Prometheus
//! recorder it built, tests pass capturing ones, and [`Telemetry::disabled`]
//! drops everything.

use std::sync::Arc;
use std::task::{Context, Poll};

use metrics::{NoopRecorder, Recorder};
use tower::{Layer, Service};
use tracing::instrument::WithSubscriber;
use tracing::Dispatch;

use super::middleware::OperationFuture;
use super::operation::{Operation, OperationError, OperationResponse};

/// Tracing dispatcher and metrics recorder used by one [`EndpointSet`].
///
/// [`EndpointSet`]: super::EndpointSet
#[derive(Clone)]
pub struct Telemetry {
    dispatch: Dispatch,
    recorder: Arc<dyn Recorder + Send + Sync>,
}

impl Telemetry {
    #[must_use]
    pub fn new(dispatch: Dispatch, recorder: Arc<dyn Recorder + Send + Sync>) -> Self {
        Self { dispatch, recorder }
    }

    /// Discards spans, log records and metrics.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Dispatch::none(), Arc::new(NoopRecorder))
    }

    #[must_use]
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Runs `f` with this recorder behind the `metrics` macros.
    pub fn record<T>(&self, f: impl FnOnce() -> T) -> T {
        metrics::with_local_recorder(self.recorder.as_ref(), f)
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::disabled()
    }
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry")
            .field("dispatch", &self.dispatch)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// DispatchLayer
// ---------------------------------------------------------------------------

/// Tower layer that runs the wrapped stages under a fixed `tracing`
/// dispatcher, both while building the call future and while polling it.
#[derive(Debug, Clone)]
pub struct DispatchLayer {
    dispatch: Dispatch,
}

impl DispatchLayer {
    #[must_use]
    pub fn new(dispatch: Dispatch) -> Self {
        Self { dispatch }
    }
}

impl<S> Layer<S> for DispatchLayer {
    type Service = DispatchService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DispatchService {
            inner,
            dispatch: self.dispatch.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DispatchService<S> {
    inner: S,
    dispatch: Dispatch,
}

impl<S> Service<Operation> for DispatchService<S>
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
        let inner = &mut self.inner;
        let fut = tracing::dispatcher::with_default(&self.dispatch, || inner.call(op));
        Box::pin(fut.with_subscriber(self.dispatch.clone()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
