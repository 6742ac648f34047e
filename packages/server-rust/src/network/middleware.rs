//! Request-level layers wrapped around the `/sum` and `/concat` routes.
//!
//! These only deal with HTTP plumbing: request ids, access spans and a
//! backstop timeout. Anything that must behave the same for gRPC callers
//! lives in the operation pipeline instead.

use std::time::Duration;

use axum::http::header::HeaderName;
use axum::http::StatusCode;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Minimum headroom between the operation deadline and the HTTP timeout.
pub const TIMEOUT_MARGIN: Duration = Duration::from_secs(1);

/// HTTP timeout for endpoints whose business calls get `operation_timeout`.
///
/// The operation deadline must fire first: its `Timeout` error is classified
/// as a 500 and counted by the circuit breaker, while a request dropped by
/// the HTTP layer is answered with a bare 408 and never reaches either.
#[must_use]
pub fn effective_request_timeout(configured: Duration, operation_timeout: Duration) -> Duration {
    configured.max(operation_timeout + TIMEOUT_MARGIN)
}

/// The composed Tower layer type produced by [`build_http_layers`].
type HttpLayers = tower::layer::util::Stack<
    PropagateRequestIdLayer,
    tower::layer::util::Stack<
        TimeoutLayer,
        tower::layer::util::Stack<
            TraceLayer<
                tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
            >,
            tower::layer::util::Stack<
                SetRequestIdLayer<MakeRequestUuid>,
                tower::layer::util::Identity,
            >,
        >,
    >,
>;

/// Layers for the addsvc router, outermost first:
///
/// 1. `SetRequestId` -- keeps the caller's `X-Request-Id` or mints one
/// 2. `Tracing` -- one access span per HTTP exchange
/// 3. `Timeout` -- 408 backstop, see [`effective_request_timeout`]
/// 4. `PropagateRequestId` -- echoes `X-Request-Id` on the response
#[must_use]
pub fn build_http_layers(request_timeout: Duration) -> HttpLayers {
    let x_request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(PropagateRequestIdLayer::new(x_request_id))
        .into_inner()
}
