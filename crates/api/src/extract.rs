//! Extractors whose rejections render as the error envelope.

use axum::extract::{FromRequest, FromRequestParts};

use crate::response::ApiError;

/// JSON body; malformed input is a `VALIDATION` error.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string; malformed input is a `VALIDATION` error.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Path parameters; malformed ids are a `VALIDATION` error.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);
