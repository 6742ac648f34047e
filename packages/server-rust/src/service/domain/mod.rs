//! Innermost pipeline stage: adapts an [`AddService`] to `tower::Service<Operation>`.
//!
//! Each endpoint owns one `BusinessService` bound to a single operation name.
//! The stage enforces the operation deadline, so a slow implementation
//! surfaces as `OperationError::Timeout` to every outer stage.

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use addsvc_core::AddService;
use tower::Service;

use crate::service::middleware::OperationFuture;
use crate::service::operation::{Operation, OperationError, OperationResponse};

/// Dispatches one kind of [`Operation`] to the business service.
#[derive(Clone)]
pub struct BusinessService {
    svc: Arc<dyn AddService>,
    operation: &'static str,
}

impl BusinessService {
    #[must_use]
    pub fn new(svc: Arc<dyn AddService>, operation: &'static str) -> Self {
        Self { svc, operation }
    }
}

impl fmt::Debug for BusinessService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusinessService")
            .field("operation", &self.operation)
            .finish_non_exhaustive()
    }
}

impl Service<Operation> for BusinessService {
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = OperationFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        if op.name() != self.operation {
            return Box::pin(async { Err(OperationError::WrongOperation) });
        }

        let svc = Arc::clone(&self.svc);
        let deadline = op.ctx().deadline;
        let timeout_ms = op.ctx().call_timeout_ms;

        Box::pin(async move {
            let work = async move {
                match op {
                    Operation::Sum { request, .. } => {
                        OperationResponse::Sum(svc.sum(request.a, request.b).await)
                    }
                    Operation::Concat { request, .. } => {
                        OperationResponse::Concat(svc.concat(&request.a, &request.b).await)
                    }
                }
            };

            tokio::time::timeout_at(deadline, work)
                .await
                .map_err(|_elapsed| OperationError::Timeout { timeout_ms })
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use addsvc_core::{AddError, BasicService, ConcatRequest, ConcatResponse, SumRequest, SumResponse};
    use async_trait::async_trait;
    use tower::ServiceExt;

    use super::*;
    use crate::service::operation::{operation_names, OperationContext};

    fn sum_op(a: i64, b: i64, timeout_ms: u64) -> Operation {
        Operation::Sum {
            ctx: OperationContext::new(1, timeout_ms),
            request: SumRequest::new(a, b),
        }
    }

    /// Implementation that never finishes within any sensible deadline.
    struct Stalled;

    #[async_trait]
    impl AddService for Stalled {
        async fn sum(&self, a: i64, b: i64) -> SumResponse {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(a + b)
        }

        async fn concat(&self, a: &str, b: &str) -> ConcatResponse {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(format!("{a}{b}"))
        }
    }

    #[tokio::test]
    async fn dispatches_to_business_service() {
        let svc = BusinessService::new(Arc::new(BasicService::new()), operation_names::SUM);
        let resp = svc.clone().oneshot(sum_op(5, 3, 5000)).await.unwrap();
        assert_eq!(resp, OperationResponse::Sum(Ok(8)));

        let resp = svc.oneshot(sum_op(0, 0, 5000)).await.unwrap();
        assert_eq!(resp, OperationResponse::Sum(Err(AddError::TwoZeroes)));
    }

    #[tokio::test]
    async fn concat_dispatch() {
        let svc = BusinessService::new(Arc::new(BasicService::new()), operation_names::CONCAT);
        let op = Operation::Concat {
            ctx: OperationContext::new(1, 5000),
            request: ConcatRequest::new("foo", "bar"),
        };
        let resp = svc.oneshot(op).await.unwrap();
        assert_eq!(resp, OperationResponse::Concat(Ok("foobar".to_string())));
    }

    #[tokio::test]
    async fn rejects_operation_for_other_endpoint() {
        let svc = BusinessService::new(Arc::new(BasicService::new()), operation_names::CONCAT);
        let err = svc.oneshot(sum_op(1, 2, 5000)).await.unwrap_err();
        assert!(matches!(err, OperationError::WrongOperation));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_elapses_into_timeout() {
        let svc = BusinessService::new(Arc::new(Stalled), operation_names::SUM);
        let err = svc.oneshot(sum_op(1, 2, 50)).await.unwrap_err();
        assert!(matches!(err, OperationError::Timeout { timeout_ms: 50 }));
    }
}
