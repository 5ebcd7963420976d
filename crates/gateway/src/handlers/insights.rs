//! Analytics and report download handlers

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use tenderdesk_common::{
    auth::AuthContext,
    errors::{AppError, Result},
    services::{AnalyticsReport, InsightsService},
};

const DEFAULT_REPORT_TYPE: &str = "summary";

#[derive(Debug, Default, Deserialize)]
pub struct ReportRequest {
    #[serde(rename = "type")]
    pub report_type: Option<String>,
}

pub async fn analytics(
    State(insights): State<Arc<InsightsService>>,
    auth: AuthContext,
) -> Json<AnalyticsReport> {
    Json(insights.analytics(auth.user_id))
}

/// Render the PDF report as an attachment
pub async fn generate_report(
    State(insights): State<Arc<InsightsService>>,
    auth: AuthContext,
    body: Bytes,
) -> Result<Response> {
    // An empty body asks for the default report
    let request: ReportRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ReportRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::InvalidFormat {
            message: e.to_string(),
        })?
    };

    let report_type = request
        .report_type
        .unwrap_or_else(|| DEFAULT_REPORT_TYPE.to_string());
    let report = insights.report(auth.user_id, &report_type)?;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        report.filename
    ))
    .map_err(|e| AppError::Internal {
        message: format!("Invalid report filename header: {}", e),
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        report.bytes,
    )
        .into_response())
}
