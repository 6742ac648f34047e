//! `POST /sum` and `POST /concat` handlers.
//!
//! Bodies are decoded here rather than with axum's `Json` extractor so that
//! malformed input is classified like every other error and answered with
//! `{"error": ...}`.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::service::classify::ClassifiedError;
use crate::service::trace_context::extract_from_headers;
use addsvc_core::{AddError, ConcatRequest, Reply, SumRequest};

/// JSON body of a `POST /sum` request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SumBody {
    #[serde(rename = "A", alias = "a")]
    pub a: i64,
    #[serde(rename = "B", alias = "b")]
    pub b: i64,
}

/// JSON body of a `POST /concat` request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConcatBody {
    #[serde(rename = "A", alias = "a")]
    pub a: String,
    #[serde(rename = "B", alias = "b")]
    pub b: String,
}

/// Successful response body.
#[derive(Debug, Serialize)]
pub struct ValueBody<T> {
    pub v: T,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

/// A classified error rendered as `{"error": ...}` with its HTTP status.
#[derive(Debug)]
pub struct HttpError(pub ClassifiedError);

impl From<ClassifiedError> for HttpError {
    fn from(err: ClassifiedError) -> Self {
        Self(err)
    }
}

impl From<AddError> for HttpError {
    fn from(err: AddError) -> Self {
        Self(ClassifiedError::business(err))
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.0.http_status();
        let body = ErrorBody {
            error: &self.0.message,
        };
        (status, Json(body)).into_response()
    }
}

fn decode<T: DeserializeOwned>(body: &Bytes) -> Result<T, HttpError> {
    serde_json::from_slice(body).map_err(|e| ClassifiedError::bad_request(e).into())
}

fn respond<T: Serialize>(reply: Reply<T>) -> Result<Json<ValueBody<T>>, HttpError> {
    Ok(Json(ValueBody { v: reply? }))
}

/// Handles `POST /sum` with a JSON body `{"A": int, "B": int}`.
///
/// # Errors
///
/// Returns an [`HttpError`] for malformed bodies, business errors and
/// pipeline rejections.
pub async fn sum_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ValueBody<i64>>, HttpError> {
    let req: SumBody = decode(&body)?;
    let reply = state
        .endpoints
        .sum(extract_from_headers(&headers), SumRequest::new(req.a, req.b))
        .await
        .map_err(|e| ClassifiedError::operation(&e))?;
    respond(reply)
}

/// Handles `POST /concat` with a JSON body `{"A": string, "B": string}`.
///
/// # Errors
///
/// Returns an [`HttpError`] for malformed bodies, business errors and
/// pipeline rejections.
pub async fn concat_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ValueBody<String>>, HttpError> {
    let req: ConcatBody = decode(&body)?;
    let reply = state
        .endpoints
        .concat(extract_from_headers(&headers), ConcatRequest::new(req.a, req.b))
        .await
        .map_err(|e| ClassifiedError::operation(&e))?;
    respond(reply)
}
