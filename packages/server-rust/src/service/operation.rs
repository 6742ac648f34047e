//! Operation types dispatched through the endpoint pipeline.

use std::fmt;

use addsvc_core::{ConcatRequest, ConcatResponse, SumRequest, SumResponse};
use tokio::time::Instant;

/// Operation names, used as endpoint labels, span names and metric labels.
pub mod operation_names {
    pub const SUM: &str = "Sum";
    pub const CONCAT: &str = "Concat";
}

/// Context carried with every operation through the pipeline.
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub call_id: u64,
    /// Parent trace context. Set by the transport when the caller sent one,
    /// then replaced by the tracing stage with its own span's context.
    pub parent: Option<opentelemetry::Context>,
    /// Instant after which the business call is abandoned.
    pub deadline: Instant,
    /// Budget the deadline was derived from, reported on timeout.
    pub call_timeout_ms: u64,
}

impl OperationContext {
    /// Creates a context whose deadline is `call_timeout_ms` from now.
    #[must_use]
    pub fn new(call_id: u64, call_timeout_ms: u64) -> Self {
        Self {
            call_id,
            parent: None,
            deadline: Instant::now() + std::time::Duration::from_millis(call_timeout_ms),
            call_timeout_ms,
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: Option<opentelemetry::Context>) -> Self {
        self.parent = parent;
        self
    }
}

/// Typed operation variants dispatched through the pipeline.
#[derive(Debug, Clone)]
pub enum Operation {
    Sum {
        ctx: OperationContext,
        request: SumRequest,
    },
    Concat {
        ctx: OperationContext,
        request: ConcatRequest,
    },
}

impl Operation {
    /// The operation name, one of [`operation_names`].
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sum { .. } => operation_names::SUM,
            Self::Concat { .. } => operation_names::CONCAT,
        }
    }

    #[must_use]
    pub fn ctx(&self) -> &OperationContext {
        match self {
            Self::Sum { ctx, .. } | Self::Concat { ctx, .. } => ctx,
        }
    }

    pub fn ctx_mut(&mut self) -> &mut OperationContext {
        match self {
            Self::Sum { ctx, .. } | Self::Concat { ctx, .. } => ctx,
        }
    }

    /// Short rendering of the arguments for log records.
    #[must_use]
    pub fn input_summary(&self) -> String {
        match self {
            Self::Sum { request, .. } => format!("a={} b={}", request.a, request.b),
            Self::Concat { request, .. } => format!("a={:?} b={:?}", request.a, request.b),
        }
    }
}

/// Response from the innermost stage.
///
/// Business failures live inside the envelope; only pipeline failures use
/// [`OperationError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResponse {
    Sum(SumResponse),
    Concat(ConcatResponse),
}

impl OperationResponse {
    /// Whether the envelope carries a value rather than a business error.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        match self {
            Self::Sum(r) => r.is_ok(),
            Self::Concat(r) => r.is_ok(),
        }
    }

    /// Short rendering of the outcome for log records.
    #[must_use]
    pub fn output_summary(&self) -> String {
        match self {
            Self::Sum(Ok(v)) => v.to_string(),
            Self::Concat(Ok(v)) => format!("{v:?}"),
            Self::Sum(Err(e)) | Self::Concat(Err(e)) => e.to_string(),
        }
    }
}

impl fmt::Display for OperationResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.output_summary())
    }
}

/// Errors raised by the pipeline itself rather than by a business operation.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("circuit breaker is open")]
    CircuitOpen,
    #[error("operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("endpoint received an operation it does not serve")]
    WrongOperation,
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl OperationError {
    /// Rejections issued by a control stage before the business call ran.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::RateLimited | Self::CircuitOpen)
    }
}
