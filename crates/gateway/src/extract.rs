//! Request extractors with structured rejections

use axum::extract::{FromRequest, FromRequestParts};
use tenderdesk_common::errors::AppError;

/// `Json` whose rejections render as `AppError` bodies
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// `Path` whose rejections render as `AppError` bodies
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);
