//! `addsvc` core — the `Sum`/`Concat` business operations and their envelopes.

pub mod envelope;
pub mod error;
pub mod service;

pub use envelope::{ConcatRequest, ConcatResponse, Reply, SumRequest, SumResponse};
pub use error::AddError;
pub use service::{AddService, BasicService, INT_MAX, INT_MIN, MAX_CONCAT_LEN};
