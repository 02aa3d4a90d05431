//! Standard response envelope helpers.

use crate::result::ActionResult;
use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct Meta {
    pub message: String,
}

#[derive(Serialize)]
pub struct Listing<T> {
    pub data: T,
    pub meta: Meta,
}

#[derive(Serialize)]
pub struct One<T> {
    pub data: T,
}

/// `{data, meta: {message: "N items found"}}`.
pub fn listing<T: Serialize>(data: T, count: u64) -> (StatusCode, Json<Listing<T>>) {
    (
        StatusCode::OK,
        Json(Listing {
            data,
            meta: Meta {
                message: format!("{} items found", count),
            },
        }),
    )
}

pub fn one<T: Serialize>(data: T) -> (StatusCode, Json<One<T>>) {
    (StatusCode::OK, Json(One { data }))
}

/// Action envelope: 200 on success, 422 otherwise.
pub fn action_result(result: &ActionResult) -> (StatusCode, Json<serde_json::Value>) {
    let status = if result.is_success() {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    (status, Json(result.to_value()))
}
