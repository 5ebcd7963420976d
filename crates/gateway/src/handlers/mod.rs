//! API handlers module

pub mod auth;
pub mod documents;
pub mod health;
pub mod insights;
pub mod tenders;

use axum::http::Uri;
use tenderdesk_common::errors::AppError;

/// Fallback for unknown routes
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound {
        resource_type: "Endpoint".to_string(),
        id: uri.path().to_string(),
    }
}
