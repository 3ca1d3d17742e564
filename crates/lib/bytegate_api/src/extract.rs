//! Extractors whose rejections use the service's JSON error body.

use axum::extract::{FromRequest, FromRequestParts, Json, Path};

use crate::error::AppError;

/// `Json<T>` that rejects with a 400 `validation_error` body.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// `Path<T>` that rejects with a 400 `validation_error` body.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
pub struct AppPath<T>(pub T);
