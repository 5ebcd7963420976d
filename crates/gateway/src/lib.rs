//! TenderDesk API Gateway
//!
//! HTTP surface of the TenderDesk backend.
//! Handles:
//! - Authentication of protected routes
//! - Per-address rate limiting on account endpoints
//! - Upload size limits
//! - Request routing
//! - Observability (logging, metrics, request ids)

pub mod extract;
pub mod handlers;
pub mod middleware;

use axum::{
    extract::{DefaultBodyLimit, FromRef},
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use middleware::rate_limit::{limit_by_address, RateLimits};
use std::sync::Arc;
use tenderdesk_common::{
    auth::JwtManager,
    config::AppConfig,
    db::{DbPool, Repository},
    extraction::TextExtractor,
    prediction::Predictor,
    report::ReportRenderer,
    services::{AccountService, InsightsService, TenderService},
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Application state shared across handlers
#[derive(Clone, FromRef)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repo: Repository,
    pub jwt: Arc<JwtManager>,
    pub accounts: Arc<AccountService>,
    pub tenders: Arc<TenderService>,
    pub insights: Arc<InsightsService>,
    pub metrics: Option<PrometheusHandle>,
    #[from_ref(skip)]
    pub limits: RateLimits,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        pool: DbPool,
        predictor: Arc<dyn Predictor>,
        extractor: Arc<dyn TextExtractor>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let repo = Repository::new(pool);
        let jwt = Arc::new(JwtManager::new(
            &config.auth.jwt_secret,
            config.auth.token_ttl_secs,
        ));

        let accounts = AccountService::new(repo.clone(), jwt.clone());
        let tenders = TenderService::new(
            repo.clone(),
            predictor,
            extractor,
            config.server.upload_dir.clone(),
        );
        let insights = InsightsService::new(ReportRenderer::new());
        let limits = RateLimits::new(&config.rate_limit);

        Self {
            config: Arc::new(config),
            repo,
            jwt,
            accounts: Arc::new(accounts),
            tenders: Arc::new(tenders),
            insights: Arc::new(insights),
            metrics,
            limits,
        }
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();
    let upload_limit = config.server.max_upload_bytes;

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let auth_routes = Router::new()
        .route(
            "/register",
            post(handlers::auth::register).route_layer(from_fn_with_state(
                state.limits.register.clone(),
                limit_by_address,
            )),
        )
        .route(
            "/login",
            post(handlers::auth::login).route_layer(from_fn_with_state(
                state.limits.login.clone(),
                limit_by_address,
            )),
        )
        .route("/me", get(handlers::auth::me));

    let api_routes = Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))

        .nest("/auth", auth_routes)
        .route("/dashboard/stats", get(handlers::tenders::dashboard_stats))

        // Tender endpoints
        .route(
            "/tenders",
            get(handlers::tenders::list_tenders).post(handlers::tenders::create_tender),
        )
        .route("/tenders/{id}", get(handlers::tenders::get_tender))
        .route(
            "/tenders/{id}/documents",
            post(handlers::documents::upload_document)
                .layer(DefaultBodyLimit::max(upload_limit))
                .route_layer(from_fn_with_state(
                    upload_limit,
                    middleware::upload_limit::content_length_limit,
                )),
        )

        .route("/analytics", get(handlers::insights::analytics))
        .route("/reports/generate", post(handlers::insights::generate_report));

    // Compose the app
    Router::new()
        .nest("/api", api_routes)
        .route("/metrics", get(handlers::health::metrics))
        .fallback(handlers::not_found)
        .layer(from_fn(middleware::request_metrics::track_requests))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(cors_layer(&config.server.cors_origins))
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// CORS for the configured origins; an empty list allows any origin
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if allowed.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(allowed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}
