//! Document upload handler

use axum::{
    extract::{
        multipart::{Multipart, MultipartError, MultipartRejection},
        State,
    },
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::extract::ApiPath;
use tenderdesk_common::{
    auth::AuthContext,
    config::AppConfig,
    errors::{AppError, Result},
    services::{TenderService, Upload},
};

#[derive(Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub document_id: i64,
}

/// Attach the multipart `file` field to a tender
pub async fn upload_document(
    State(tenders): State<Arc<TenderService>>,
    State(config): State<Arc<AppConfig>>,
    auth: AuthContext,
    ApiPath(tender_id): ApiPath<i64>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    let limit = config.server.max_upload_bytes;
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!(error = %e, "Upload is not a multipart body");
        no_file()
    })?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
        upload = Some(Upload { filename, bytes });
        break;
    }

    let upload = upload.ok_or_else(no_file)?;
    let document_id = tenders
        .upload_document(auth.user_id, tender_id, upload)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: "Document uploaded successfully".to_string(),
            document_id,
        }),
    ))
}

fn no_file() -> AppError {
    AppError::Validation {
        message: "No file provided".to_string(),
        field: Some("file".to_string()),
    }
}

fn multipart_error(err: MultipartError, limit: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge { limit }
    } else {
        AppError::InvalidFormat {
            message: err.body_text(),
        }
    }
}
