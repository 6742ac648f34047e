//! The `Sum` and `Concat` business operations.
//!
//! [`sum`] and [`concat`] hold the rules; [`BasicService`] exposes them
//! through the [`AddService`] trait the server decorates.

use async_trait::async_trait;

use crate::envelope::{ConcatResponse, SumResponse};
use crate::error::AddError;

/// Largest permitted `Sum` result.
pub const INT_MAX: i64 = i32::MAX as i64;

/// Smallest permitted `Sum` result.
pub const INT_MIN: i64 = i32::MIN as i64;

/// Maximum byte length of a `Concat` result.
pub const MAX_CONCAT_LEN: usize = 10;

/// The business operations exposed by the service.
///
/// Implementations are pure computations: no I/O, no shared state. The
/// endpoint pipeline treats them as an injected capability.
#[async_trait]
pub trait AddService: Send + Sync {
    /// Sums two integers.
    async fn sum(&self, a: i64, b: i64) -> SumResponse;

    /// Concatenates two strings.
    async fn concat(&self, a: &str, b: &str) -> ConcatResponse;
}

/// Reference implementation of [`AddService`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicService;

impl BasicService {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Sums `a` and `b`, rejecting two zeroes and results outside the 32-bit
/// signed range.
///
/// # Errors
///
/// - [`AddError::TwoZeroes`] when both inputs are zero
/// - [`AddError::IntOverflow`] when the result leaves `[INT_MIN, INT_MAX]`
pub fn sum(a: i64, b: i64) -> SumResponse {
    if a == 0 && b == 0 {
        return Err(AddError::TwoZeroes);
    }

    let v = a.checked_add(b).ok_or(AddError::IntOverflow)?;
    if !(INT_MIN..=INT_MAX).contains(&v) {
        return Err(AddError::IntOverflow);
    }
    Ok(v)
}

/// Concatenates `a` and `b` when the result fits in [`MAX_CONCAT_LEN`] bytes.
///
/// # Errors
///
/// Returns [`AddError::MaxSizeExceeded`] when the combined length is too large.
pub fn concat(a: &str, b: &str) -> ConcatResponse {
    if a.len() + b.len() > MAX_CONCAT_LEN {
        return Err(AddError::MaxSizeExceeded);
    }

    let mut v = String::with_capacity(a.len() + b.len());
    v.push_str(a);
    v.push_str(b);
    Ok(v)
}

#[async_trait]
impl AddService for BasicService {
    async fn sum(&self, a: i64, b: i64) -> SumResponse {
        sum(a, b)
    }

    async fn concat(&self, a: &str, b: &str) -> ConcatResponse {
        concat(a, b)
    }
}
