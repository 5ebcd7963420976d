//! Content-Length validation for upload routes

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tenderdesk_common::errors::AppError;

/// Reject requests whose declared length exceeds the limit, before the body is read
pub async fn content_length_limit(
    State(limit): State<usize>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(content_length) = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<usize>().ok())
    {
        if content_length > limit {
            tracing::warn!(
                content_length = content_length,
                max_size = limit,
                "Request payload too large"
            );
            return Err(AppError::PayloadTooLarge { limit });
        }
    }

    Ok(next.run(request).await)
}
