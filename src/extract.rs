//! Drop-in replacements for axum's `Json`, `Path` and `Query` extractors whose
//! rejections are rendered as `AppError::InvalidInput`.

use axum::extract::{FromRequest, FromRequestParts};

use crate::app_error::AppError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct Path<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct Query<T>(pub T);
