//! Shared response envelope types for API handlers.
//!
//! Every body is `{ "data": ... }`; errors use `{ "error", "code" }` from
//! [`crate::error::AppError`].

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// `200 OK` with an enveloped body.
pub type DataJson<T> = Json<DataResponse<T>>;

/// `201 Created` with an enveloped body.
pub type Created<T> = (StatusCode, DataJson<T>);

/// Wrap `data` in the envelope.
pub fn data<T: Serialize>(data: T) -> DataJson<T> {
    Json(DataResponse { data })
}

pub fn created<T: Serialize>(data: T) -> Created<T> {
    (StatusCode::CREATED, Json(DataResponse { data }))
}
