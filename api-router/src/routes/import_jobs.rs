use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use common::storage::types::{
    import_job::{ImportJob, JobListQuery, JobSortField, JobStatus, DEFAULT_REQUESTED_COUNT},
    paged::SortDirection,
};
use serde::{Deserialize, Serialize};

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct CreateImportJobParams {
    pub source: Option<String>,
    #[serde(default = "default_count")]
    pub count: u32,
}

fn default_count() -> u32 {
    DEFAULT_REQUESTED_COUNT
}

#[derive(Debug, Deserialize)]
pub struct ListImportJobsParams {
    pub status: Option<JobStatus>,
    pub source: Option<String>,
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub size: u32,
    #[serde(default = "default_sort")]
    pub sort: String,
    #[serde(default = "default_direction")]
    pub direction: String,
}

fn default_page_size() -> u32 {
    10
}

fn default_sort() -> String {
    "createdAt".to_string()
}

fn default_direction() -> String {
    "DESC".to_string()
}

/// Job row as exposed over the API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJobDto {
    pub id: String,
    pub source: String,
    pub requested_count: u32,
    pub imported_count: Option<u32>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl From<ImportJob> for ImportJobDto {
    fn from(job: ImportJob) -> Self {
        Self {
            id: job.id,
            source: job.source.as_str().to_string(),
            requested_count: job.requested_count,
            imported_count: job.imported_count,
            status: job.status,
            created_at: job.created_at,
            completed_at: job.completed_at,
            error_message: job.error_message,
        }
    }
}

/// Accept an import job and hand it to the worker pool. Responds 202; the
/// job advances to a terminal state in the background.
pub async fn create_import_job(
    State(state): State<ApiState>,
    Query(params): Query<CreateImportJobParams>,
) -> Result<impl IntoResponse, ApiError> {
    let job = ImportJob::create(params.source.as_deref(), params.count, &state.db).await?;
    state.importer.dispatch(job.id.clone()).await?;

    Ok((StatusCode::ACCEPTED, Json(ImportJobDto::from(job))))
}

pub async fn get_import_job(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let job = ImportJob::find_by_id(&id, &state.db).await?;
    Ok(Json(ImportJobDto::from(job)))
}

pub async fn list_import_jobs(
    State(state): State<ApiState>,
    Query(params): Query<ListImportJobsParams>,
) -> Result<impl IntoResponse, ApiError> {
    if params.size == 0 {
        return Err(ApiError::ValidationError(
            "page size must be positive".to_string(),
        ));
    }

    let query = JobListQuery {
        status: params.status,
        source: params.source,
        page: params.page,
        size: params.size,
        sort: JobSortField::parse(&params.sort)?,
        direction: SortDirection::parse(&params.direction)?,
    };

    let page = ImportJob::list(&query, &state.db).await?;
    Ok(Json(page.map(ImportJobDto::from)))
}
