//! Tower middleware layers for the endpoint pipeline.
//!
//! - [`instrument`]: Request duration histogram and domain usage counters
//! - [`logging`]: One structured log record per call
//! - [`trace`]: `endpoint` span continuing the caller's trace
//! - [`circuit_breaker`]: Fail fast while the endpoint keeps failing
//! - [`rate_limit`]: Token-bucket admission
//! - [`pipeline`]: Composes all layers into a single endpoint

use std::future::Future;
use std::pin::Pin;

use crate::service::operation::{OperationError, OperationResponse};

pub mod circuit_breaker;
pub mod instrument;
pub mod logging;
pub mod pipeline;
pub mod rate_limit;
pub mod trace;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerLayer, CircuitState};
pub use instrument::{describe_metrics, InstrumentLayer};
pub use logging::LoggingLayer;
pub use pipeline::{build_endpoint, Endpoint};
pub use rate_limit::RateLimitLayer;
pub use trace::TracingLayer;

/// Boxed future returned by every middleware service.
pub type OperationFuture =
    Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;
