//! Success response helpers. Bodies are the bare DTO or DTO array, without an envelope.

use axum::{http::StatusCode, Json};
use serde::Serialize;

pub fn ok_one<T: Serialize>(data: T) -> (StatusCode, Json<T>) {
    (StatusCode::OK, Json(data))
}

pub fn ok_many<T: Serialize>(data: Vec<T>) -> (StatusCode, Json<Vec<T>>) {
    (StatusCode::OK, Json(data))
}

/// Plain-text acknowledgement of a delete.
pub fn deleted() -> (StatusCode, &'static str) {
    (StatusCode::OK, "deleted")
}
