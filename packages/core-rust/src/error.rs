//! Business errors returned by [`AddService`](crate::AddService).
//!
//! These are deterministic, caller-input-driven failures. Their `Display`
//! text is part of the wire contract: both transports send it verbatim.

use serde::{Deserialize, Serialize};

/// Validation failure produced by a business operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum AddError {
    /// Both summands were zero.
    #[error("can't sum two zeroes")]
    TwoZeroes,
    /// The sum falls outside the 32-bit signed range.
    #[error("integer overflow")]
    IntOverflow,
    /// The concatenated string would exceed [`MAX_CONCAT_LEN`](crate::MAX_CONCAT_LEN) bytes.
    #[error("result exceeds maximum size")]
    MaxSizeExceeded,
}
