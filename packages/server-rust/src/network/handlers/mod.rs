//! HTTP handler definitions for the addsvc HTTP adapter.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports all handler functions for convenient access
//! when building the router.

pub mod add;

pub use add::{concat_handler, sum_handler, HttpError};

use crate::service::EndpointSet;

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Cloning is cheap: the endpoints are boxed services sharing their limiters
/// and breakers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Decorated endpoints, the same instance the RPC adapter uses.
    pub endpoints: EndpointSet,
}
