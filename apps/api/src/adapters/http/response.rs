use axum::{Json, http::StatusCode};
use serde::Serialize;
use woosell_types::ApiResponse;

pub type Envelope<T> = (StatusCode, Json<ApiResponse<T>>);

pub fn ok<T: Serialize>(data: T) -> Envelope<T> {
    (StatusCode::OK, Json(ApiResponse::ok(data)))
}

pub fn created<T: Serialize>(data: T) -> Envelope<T> {
    (StatusCode::CREATED, Json(ApiResponse::ok(data)))
}
