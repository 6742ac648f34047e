//! Pipeline composition: wraps a business stage with every middleware layer.

use tower::util::BoxCloneSyncService;
use tower::{Service, ServiceBuilder};

use super::circuit_breaker::CircuitBreakerLayer;
use super::instrument::InstrumentLayer;
use super::logging::LoggingLayer;
use super::rate_limit::RateLimitLayer;
use super::trace::TracingLayer;
use crate::service::config::EndpointConfig;
use crate::service::operation::{Operation, OperationError, OperationResponse};
use crate::service::telemetry::{DispatchLayer, Telemetry};

/// A fully decorated operation endpoint. Cheap to clone; clones share the
/// rate limiter and circuit breaker.
pub type Endpoint = BoxCloneSyncService<Operation, OperationResponse, OperationError>;

/// Build the endpoint for `operation` by wrapping `business` with middleware.
///
/// Layer order (outermost to innermost):
/// 1. `DispatchLayer` -- routes every span and record below to `telemetry`
/// 2. `InstrumentLayer` -- duration and usage metrics, including rejections
/// 3. `LoggingLayer` -- one record per call
/// 4. `TracingLayer` -- `endpoint` span around everything below
/// 5. `CircuitBreakerLayer` -- fail fast while the endpoint is failing
/// 6. `RateLimitLayer` -- token bucket, consulted only when the breaker admits
///
/// The breaker sits outside the limiter so an open breaker spends no tokens
/// and rate-limit rejections never count toward tripping it.
#[must_use]
pub fn build_endpoint<S>(
    operation: &'static str,
    business: S,
    config: &EndpointConfig,
    telemetry: &Telemetry,
) -> Endpoint
where
    S: Service<Operation, Response = OperationResponse, Error = OperationError>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
{
    let svc = ServiceBuilder::new()
        .layer(DispatchLayer::new(telemetry.dispatch().clone()))
        .layer(InstrumentLayer::new(operation, telemetry.clone()))
        .layer(LoggingLayer::new(operation))
        .layer(TracingLayer::new(operation))
        .layer(CircuitBreakerLayer::new(operation, config.breaker))
        .layer(RateLimitLayer::new(config.rate_limit))
        .service(business);

    BoxCloneSyncService::new(svc)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use addsvc_core::{AddError, BasicService, SumRequest};
    use tower::{service_fn, ServiceExt};

    use super::*;
    use crate::service::config::{BreakerConfig, RateLimitConfig};
    use crate::service::domain::BusinessService;
    use crate::service::operation::{operation_names, OperationContext};

    fn make_op(a: i64, b: i64) -> Operation {
        Operation::Sum {
            ctx: OperationContext::new(1, 5000),
            request: SumRequest::new(a, b),
        }
    }

    fn config(burst: u32, failure_threshold: u32) -> EndpointConfig {
        EndpointConfig {
            rate_limit: RateLimitConfig::new(1, burst),
            breaker: BreakerConfig {
                failure_threshold,
                ..BreakerConfig::default()
            },
        }
    }

    #[tokio::test]
    async fn endpoint_runs_business_logic() {
        let business = BusinessService::new(Arc::new(BasicService::new()), operation_names::SUM);
        let endpoint = build_endpoint(
            operation_names::SUM,
            business,
            &config(10, 5),
            &Telemetry::disabled(),
        );

        let resp = endpoint.clone().oneshot(make_op(5, 3)).await.unwrap();
        assert_eq!(resp, OperationResponse::Sum(Ok(8)));

        let resp = endpoint.oneshot(make_op(0, 0)).await.unwrap();
        assert_eq!(resp, OperationResponse::Sum(Err(AddError::TwoZeroes)));
    }

    #[tokio::test]
    async fn rate_limit_rejections_do_not_trip_breaker() {
        let business = BusinessService::new(Arc::new(BasicService::new()), operation_names::SUM);
        let endpoint = build_endpoint(
            operation_names::SUM,
            business,
            &config(1, 1),
            &Telemetry::disabled(),
        );

        assert!(endpoint.clone().oneshot(make_op(1, 2)).await.is_ok());
        for _ in 0..5 {
            let err = endpoint.clone().oneshot(make_op(1, 2)).await.unwrap_err();
            assert!(matches!(err, OperationError::RateLimited), "got {err:?}");
        }
    }

    #[tokio::test]
    async fn open_breaker_short_circuits_business() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let failing = service_fn(move |_op: Operation| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<OperationResponse, _>(OperationError::Internal(anyhow::anyhow!("down"))) }
        });
        let endpoint = build_endpoint(
            operation_names::SUM,
            failing,
            &config(3, 2),
            &Telemetry::disabled(),
        );

        for _ in 0..2 {
            let err = endpoint.clone().oneshot(make_op(1, 2)).await.unwrap_err();
            assert!(matches!(err, OperationError::Internal(_)));
        }
        for _ in 0..3 {
            let err = endpoint.clone().oneshot(make_op(1, 2)).await.unwrap_err();
            assert!(matches!(err, OperationError::CircuitOpen), "got {err:?}");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
