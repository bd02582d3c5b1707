use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use tower_http::limit::RequestBodyLimitLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use folio_core::error::AppError;
use folio_core::job::JobStatus;

use crate::auth::require_api_key;
use crate::dto::{
    CrawlJobListResponse, CrawlJobResponse, CreateCrawlJobRequest, CreateCrawlJobResponse,
    ErrorResponse, HealthResponse, ListCrawlJobsQuery,
};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

const DEFAULT_LIST_LIMIT: usize = 20;
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Build the full router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/v1/crawl-jobs", post(create_crawl_job).get(list_crawl_jobs))
        .route("/v1/crawl-jobs/{id}", get(get_crawl_job))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    let public = Router::new()
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    public.merge(api).with_state(state)
}

// ---------------------------------------------------------------------------
// Crawl jobs
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/v1/crawl-jobs",
    request_body = CreateCrawlJobRequest,
    responses(
        (status = 202, description = "Crawl started", body = CreateCrawlJobResponse),
        (status = 400, description = "Invalid target URL", body = ErrorResponse),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Server is shutting down", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "crawl-jobs"
)]
pub async fn create_crawl_job(
    State(state): State<Arc<AppState>>,
    axum::Json(body): axum::Json<CreateCrawlJobRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let job = state.jobs.start_job(&body.url).await?;

    let response = CreateCrawlJobResponse {
        message: "Crawl started".to_string(),
        job_id: job.id,
        url: job.target_url,
        status: job.status.to_string(),
    };

    Ok((StatusCode::ACCEPTED, axum::Json(response)))
}

#[utoipa::path(
    get,
    path = "/v1/crawl-jobs",
    params(ListCrawlJobsQuery),
    responses(
        (status = 200, description = "Most recent crawl jobs", body = CrawlJobListResponse),
        (status = 400, description = "Unknown status filter", body = ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "crawl-jobs"
)]
pub async fn list_crawl_jobs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListCrawlJobsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status_filter = query
        .status
        .map(|s| s.parse::<JobStatus>().map_err(AppError::ValidationError))
        .transpose()?;

    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let jobs = state.jobs.list_jobs(status_filter, limit).await?;
    let total = jobs.len();

    let response = CrawlJobListResponse {
        jobs: jobs.into_iter().map(CrawlJobResponse::from).collect(),
        total,
    };

    Ok(axum::Json(response))
}

#[utoipa::path(
    get,
    path = "/v1/crawl-jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Crawl job ID")
    ),
    responses(
        (status = 200, description = "Crawl job status", body = CrawlJobResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "crawl-jobs"
)]
pub async fn get_crawl_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    match state.jobs.get_job(id).await? {
        Some(job) => Ok(axum::Json(CrawlJobResponse::from(job)).into_response()),
        None => {
            let body = ErrorResponse {
                error: "not_found".to_string(),
                message: format!("Crawl job not found: {id}"),
            };
            Ok((StatusCode::NOT_FOUND, axum::Json(body)).into_response())
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let healthy = match state.db.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            false
        }
    };

    let (status, response) = if healthy {
        (
            StatusCode::OK,
            HealthResponse {
                status: "healthy",
                database: "ok",
            },
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            HealthResponse {
                status: "unhealthy",
                database: "error",
            },
        )
    };

    (status, axum::Json(response))
}
