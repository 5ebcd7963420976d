//! Tender handlers: dashboard, listing, creation and detail

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::extract::{ApiJson, ApiPath};
use tenderdesk_common::{
    auth::AuthContext,
    errors::Result,
    services::{CreateTenderInput, DashboardStats, TenderDetail, TenderService, TenderView},
};

/// Request to create a tender
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTenderRequest {
    #[validate(length(max = 500))]
    pub title: Option<String>,

    #[validate(length(max = 20000))]
    pub description: Option<String>,

    #[validate(length(max = 500))]
    pub client: Option<String>,

    pub value: Option<f64>,

    /// `YYYY-MM-DD`
    pub deadline: Option<String>,

    #[validate(length(max = 100))]
    pub category: Option<String>,
}

impl From<CreateTenderRequest> for CreateTenderInput {
    fn from(r: CreateTenderRequest) -> Self {
        Self {
            title: r.title,
            description: r.description,
            client: r.client,
            value: r.value,
            deadline: r.deadline,
            category: r.category,
        }
    }
}

#[derive(Serialize)]
pub struct CreateTenderResponse {
    pub message: String,
    pub tender_id: i64,
    pub risk_score: f64,
    pub profit_prediction: f64,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub stats: DashboardStats,
}

#[derive(Serialize)]
pub struct TenderListResponse {
    pub tenders: Vec<TenderView>,
}

pub async fn dashboard_stats(
    State(tenders): State<Arc<TenderService>>,
    auth: AuthContext,
) -> Result<Json<StatsResponse>> {
    let stats = tenders.dashboard_stats(auth.user_id).await?;
    Ok(Json(StatsResponse { stats }))
}

pub async fn list_tenders(
    State(tenders): State<Arc<TenderService>>,
    auth: AuthContext,
) -> Result<Json<TenderListResponse>> {
    let tenders = tenders.list(auth.user_id).await?;
    Ok(Json(TenderListResponse { tenders }))
}

/// Create a tender and score it
pub async fn create_tender(
    State(tenders): State<Arc<TenderService>>,
    auth: AuthContext,
    ApiJson(request): ApiJson<CreateTenderRequest>,
) -> Result<(StatusCode, Json<CreateTenderResponse>)> {
    request.validate()?;

    let created = tenders.create(auth.user_id, request.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateTenderResponse {
            message: "Tender created successfully".to_string(),
            tender_id: created.tender_id,
            risk_score: created.risk_score,
            profit_prediction: created.profit_prediction,
        }),
    ))
}

pub async fn get_tender(
    State(tenders): State<Arc<TenderService>>,
    auth: AuthContext,
    ApiPath(tender_id): ApiPath<i64>,
) -> Result<Json<TenderDetail>> {
    let detail = tenders.detail(auth.user_id, tender_id).await?;
    Ok(Json(detail))
}
