//! Transport-agnostic request/response envelopes, one pair per operation.
//!
//! A response is a [`Reply`]: either the value or the business error, never
//! both. Wire adapters translate to and from these types.

use serde::{Deserialize, Serialize};

use crate::error::AddError;

/// Outcome of a business operation.
pub type Reply<T> = Result<T, AddError>;

/// Envelope for the `Sum` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SumRequest {
    pub a: i64,
    pub b: i64,
}

/// Envelope for the `Concat` operation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConcatRequest {
    pub a: String,
    pub b: String,
}

/// Outcome of `Sum`.
pub type SumResponse = Reply<i64>;

/// Outcome of `Concat`.
pub type ConcatResponse = Reply<String>;

impl SumRequest {
    #[must_use]
    pub fn new(a: i64, b: i64) -> Self {
        Self { a, b }
    }
}

impl ConcatRequest {
    #[must_use]
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
        }
    }
}
