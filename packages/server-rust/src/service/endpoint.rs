//! The set of decorated endpoints shared by every transport.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use addsvc_core::{AddService, ConcatRequest, ConcatResponse, SumRequest, SumResponse};
use opentelemetry::Context;
use tower::ServiceExt;

use super::config::ServerConfig;
use super::domain::BusinessService;
use super::middleware::{build_endpoint, Endpoint};
use super::operation::{operation_names, Operation, OperationContext, OperationError, OperationResponse};

/// One fully decorated endpoint per operation.
///
/// Built once at startup. Clones share the same rate limiters, circuit
/// breakers and call-id sequence, so HTTP and RPC callers draw from the same
/// limits.
#[derive(Clone)]
pub struct EndpointSet {
    sum: Endpoint,
    concat: Endpoint,
    call_ids: Arc<AtomicU64>,
    timeout_ms: u64,
}

impl EndpointSet {
    /// Wraps `svc` with the middleware stack configured in `config`.
    #[must_use]
    pub fn new(svc: Arc<dyn AddService>, config: &ServerConfig) -> Self {
        let sum = build_endpoint(
            operation_names::SUM,
            BusinessService::new(Arc::clone(&svc), operation_names::SUM),
            &config.sum,
            &config.telemetry,
        );
        let concat = build_endpoint(
            operation_names::CONCAT,
            BusinessService::new(svc, operation_names::CONCAT),
            &config.concat,
            &config.telemetry,
        );
        Self::from_endpoints(sum, concat, config.default_operation_timeout_ms)
    }

    /// Assembles a set from already built endpoints.
    #[must_use]
    pub fn from_endpoints(sum: Endpoint, concat: Endpoint, timeout_ms: u64) -> Self {
        Self {
            sum,
            concat,
            call_ids: Arc::new(AtomicU64::new(1)),
            timeout_ms,
        }
    }

    /// Deadline budget given to every business call.
    #[must_use]
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn context(&self, parent: Option<Context>) -> OperationContext {
        let call_id = self.call_ids.fetch_add(1, Ordering::Relaxed);
        OperationContext::new(call_id, self.timeout_ms).with_parent(parent)
    }

    /// Runs `Sum` through its endpoint.
    ///
    /// # Errors
    ///
    /// Returns the pipeline's [`OperationError`]; business errors are inside
    /// the returned [`SumResponse`].
    pub async fn sum(
        &self,
        parent: Option<Context>,
        request: SumRequest,
    ) -> Result<SumResponse, OperationError> {
        let op = Operation::Sum {
            ctx: self.context(parent),
            request,
        };
        match self.sum.clone().oneshot(op).await? {
            OperationResponse::Sum(resp) => Ok(resp),
            OperationResponse::Concat(_) => Err(OperationError::WrongOperation),
        }
    }

    /// Runs `Concat` through its endpoint.
    ///
    /// # Errors
    ///
    /// Returns the pipeline's [`OperationError`]; business errors are inside
    /// the returned [`ConcatResponse`].
    pub async fn concat(
        &self,
        parent: Option<Context>,
        request: ConcatRequest,
    ) -> Result<ConcatResponse, OperationError> {
        let op = Operation::Concat {
            ctx: self.context(parent),
            request,
        };
        match self.concat.clone().oneshot(op).await? {
            OperationResponse::Concat(resp) => Ok(resp),
            OperationResponse::Sum(_) => Err(OperationError::WrongOperation),
        }
    }
}

impl std::fmt::Debug for EndpointSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointSet")
            .field("timeout_ms", &self.timeout_ms)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
