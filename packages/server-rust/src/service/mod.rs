//! Operation pipeline shared by every transport.
//!
//! 1. **Operations** (`operation`): typed calls carrying an `OperationContext`
//! 2. **Middleware** (`middleware`): Tower layers (metrics, logging, tracing,
//!    circuit breaking, rate limiting)
//! 3. **Domain** (`domain`): the innermost stage calling the business service
//! 4. **Endpoints** (`endpoint`): one decorated endpoint per operation
//! 5. **Classification** (`classify`): maps errors to transport statuses
//! 6. **Telemetry** (`telemetry`): the tracing and metrics sinks injected
//!    into every endpoint

pub mod classify;
pub mod config;
pub mod domain;
pub mod endpoint;
pub mod middleware;
pub mod operation;
pub mod telemetry;
pub mod trace_context;

// Re-export key types for convenient access.
pub use classify::{ClassifiedError, ErrorClass, ErrorKind};
pub use config::{BreakerConfig, EndpointConfig, RateLimitConfig, ServerConfig};
pub use endpoint::EndpointSet;
pub use operation::{operation_names, Operation, OperationContext, OperationError, OperationResponse};
pub use telemetry::Telemetry;
pub use trace_context::{extract_from_headers, extract_from_metadata};
