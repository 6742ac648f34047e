//! Error classification shared by the HTTP and RPC adapters.
//!
//! Every error that reaches a transport boundary is turned into a
//! [`ClassifiedError`] first, so both transports agree on the error kind,
//! its class and the message the caller sees.

use addsvc_core::AddError;
use http::StatusCode;
use tonic::Code;

use super::operation::OperationError;

/// Message returned to callers in place of internal error details.
pub const INTERNAL_MESSAGE: &str = "internal error";

/// Closed set of error categories exposed at the transport boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    TwoZeroes,
    IntOverflow,
    MaxSizeExceeded,
    RateLimited,
    CircuitOpen,
    /// The request body or message could not be decoded.
    BadRequest,
    Internal,
}

/// Coarse class of an [`ErrorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Caused by the caller's input. Never retried.
    Client,
    /// Refused by a control stage before the business call ran.
    Rejected,
    /// Unexpected failure inside the server.
    Server,
}

impl ErrorKind {
    #[must_use]
    pub fn class(self) -> ErrorClass {
        match self {
            Self::TwoZeroes | Self::IntOverflow | Self::MaxSizeExceeded | Self::BadRequest => {
                ErrorClass::Client
            }
            Self::RateLimited | Self::CircuitOpen => ErrorClass::Rejected,
            Self::Internal => ErrorClass::Server,
        }
    }

    /// HTTP status for this kind.
    #[must_use]
    pub fn http_status(self) -> StatusCode {
        match self {
            Self::TwoZeroes | Self::IntOverflow | Self::MaxSizeExceeded | Self::BadRequest => {
                StatusCode::BAD_REQUEST
            }
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::CircuitOpen => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// gRPC status code for this kind.
    ///
    /// Business errors travel in the reply's `err` field; the code is still
    /// defined so both transports classify identically.
    #[must_use]
    pub fn grpc_code(self) -> Code {
        match self {
            Self::TwoZeroes | Self::IntOverflow | Self::MaxSizeExceeded | Self::BadRequest => {
                Code::InvalidArgument
            }
            Self::RateLimited => Code::ResourceExhausted,
            Self::CircuitOpen => Code::Unavailable,
            Self::Internal => Code::Internal,
        }
    }
}

impl From<AddError> for ErrorKind {
    fn from(err: AddError) -> Self {
        match err {
            AddError::TwoZeroes => Self::TwoZeroes,
            AddError::IntOverflow => Self::IntOverflow,
            AddError::MaxSizeExceeded => Self::MaxSizeExceeded,
        }
    }
}

/// An error ready to be encoded by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ClassifiedError {
    /// Business errors are surfaced verbatim.
    #[must_use]
    pub fn business(err: AddError) -> Self {
        Self {
            kind: err.into(),
            message: err.to_string(),
        }
    }

    /// Pipeline errors. Internal detail is logged here and replaced with a
    /// generic message.
    #[must_use]
    pub fn operation(err: &OperationError) -> Self {
        let kind = match err {
            OperationError::RateLimited => ErrorKind::RateLimited,
            OperationError::CircuitOpen => ErrorKind::CircuitOpen,
            OperationError::Timeout { .. }
            | OperationError::WrongOperation
            | OperationError::Internal(_) => ErrorKind::Internal,
        };

        let message = if kind == ErrorKind::Internal {
            tracing::error!(error = ?err, "internal error at transport boundary");
            INTERNAL_MESSAGE.to_string()
        } else {
            err.to_string()
        };

        Self { kind, message }
    }

    /// Wire decode failures, rejected before the pipeline runs.
    #[must_use]
    pub fn bad_request(detail: impl std::fmt::Display) -> Self {
        Self {
            kind: ErrorKind::BadRequest,
            message: format!("bad request: {detail}"),
        }
    }

    #[must_use]
    pub fn class(&self) -> ErrorClass {
        self.kind.class()
    }

    #[must_use]
    pub fn http_status(&self) -> StatusCode {
        self.kind.http_status()
    }

    #[must_use]
    pub fn grpc_code(&self) -> Code {
        self.kind.grpc_code()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
