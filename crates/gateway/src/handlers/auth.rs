//! Registration, login and current-user handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::extract::ApiJson;
use tenderdesk_common::{
    auth::AuthContext,
    errors::Result,
    services::{AccountService, AuthSession, RegisterInput, UserProfile},
};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(max = 200))]
    pub name: Option<String>,

    #[validate(length(max = 254))]
    pub email: Option<String>,

    #[validate(length(max = 1024))]
    pub password: Option<String>,

    #[validate(length(max = 200))]
    pub company: Option<String>,
}

impl From<RegisterRequest> for RegisterInput {
    fn from(r: RegisterRequest) -> Self {
        Self {
            name: r.name,
            email: r.email,
            password: r.password,
            company: r.company,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct MeResponse {
    pub user: UserProfile,
}

/// Create an account
pub async fn register(
    State(accounts): State<Arc<AccountService>>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthSession>)> {
    request.validate()?;

    let session = accounts.register(request.into()).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Exchange credentials for a token
pub async fn login(
    State(accounts): State<Arc<AccountService>>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<AuthSession>> {
    let session = accounts.login(request.email, request.password).await?;
    Ok(Json(session))
}

/// Profile of the authenticated user
pub async fn me(
    State(accounts): State<Arc<AccountService>>,
    auth: AuthContext,
) -> Result<Json<MeResponse>> {
    let user = accounts.current_user(auth.user_id).await?;
    Ok(Json(MeResponse { user }))
}
