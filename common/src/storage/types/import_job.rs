use state_machines::state_machine;
use surrealdb::sql::Datetime as SurrealDatetime;
use uuid::Uuid;

use crate::{error::AppError, storage::db::SurrealDbClient, stored_object};

use super::paged::{PagedResult, SortDirection};

pub const DEFAULT_REQUESTED_COUNT: u32 = 5;

/// Storage/wire token standing for "import from every known source".
///
/// The model keeps the sentinel as a distinct [`ImportSource`] variant; the
/// token only exists at the serde boundary. A real source literally named
/// "ALL" cannot be represented and deserializes as the sentinel.
pub const ALL_SOURCES_TOKEN: &str = "ALL";

#[derive(Debug, Default, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub enum JobStatus {
    #[serde(rename = "PENDING")]
    #[default]
    Pending,
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "FAILED")]
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// The origin a job imports from: one named source, or every known source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSource {
    AllSources,
    Named(String),
}

impl ImportSource {
    /// Normalize the optional source of a creation request. Absent or blank
    /// means "all known sources".
    pub fn from_request(source: Option<&str>) -> Self {
        match source.map(str::trim) {
            None | Some("") => ImportSource::AllSources,
            Some(name) if name == ALL_SOURCES_TOKEN => ImportSource::AllSources,
            Some(name) => ImportSource::Named(name.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ImportSource::AllSources => ALL_SOURCES_TOKEN,
            ImportSource::Named(name) => name,
        }
    }
}

impl Serialize for ImportSource {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ImportSource {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if raw == ALL_SOURCES_TOKEN {
            Ok(ImportSource::AllSources)
        } else {
            Ok(ImportSource::Named(raw))
        }
    }
}

impl fmt::Display for ImportSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
enum JobTransition {
    Start,
    Complete,
    Fail,
}

impl JobTransition {
    fn as_str(&self) -> &'static str {
        match self {
            JobTransition::Start => "start",
            JobTransition::Complete => "complete",
            JobTransition::Fail => "fail",
        }
    }
}

mod lifecycle {
    use super::state_machine;

    state_machine! {
        name: JobLifecycleMachine,
        initial: Pending,
        states: [Pending, InProgress, Completed, Failed],
        events {
            start {
                transition: { from: Pending, to: InProgress }
            }
            complete {
                transition: { from: InProgress, to: Completed }
            }
            fail {
                transition: { from: InProgress, to: Failed }
            }
        }
    }

    pub(super) fn pending() -> JobLifecycleMachine<(), Pending> {
        JobLifecycleMachine::new(())
    }

    pub(super) fn in_progress() -> JobLifecycleMachine<(), InProgress> {
        pending()
            .start()
            .expect("start transition from Pending should exist")
    }
}

fn invalid_transition(status: &JobStatus, event: JobTransition) -> AppError {
    AppError::Validation(format!(
        "Invalid job transition: {} -> {}",
        status.as_str(),
        event.as_str()
    ))
}

fn compute_next_status(status: &JobStatus, event: JobTransition) -> Result<JobStatus, AppError> {
    match (status, event) {
        (JobStatus::Pending, JobTransition::Start) => lifecycle::pending()
            .start()
            .map(|_| JobStatus::InProgress)
            .map_err(|_| invalid_transition(status, event)),
        (JobStatus::InProgress, JobTransition::Complete) => lifecycle::in_progress()
            .complete()
            .map(|_| JobStatus::Completed)
            .map_err(|_| invalid_transition(status, event)),
        (JobStatus::InProgress, JobTransition::Fail) => lifecycle::in_progress()
            .fail()
            .map(|_| JobStatus::Failed)
            .map_err(|_| invalid_transition(status, event)),
        _ => Err(invalid_transition(status, event)),
    }
}

stored_object!(ImportJob, "import_job", {
    source: ImportSource,
    requested_count: u32,
    imported_count: Option<u32>,
    status: JobStatus,
    #[serde(
        serialize_with = "serialize_option_datetime",
        deserialize_with = "deserialize_option_datetime",
        default
    )]
    completed_at: Option<chrono::DateTime<chrono::Utc>>,
    error_message: Option<String>
});

impl ImportJob {
    pub fn new(source: ImportSource, requested_count: u32) -> Self {
        let now = chrono::Utc::now();

        Self {
            id: Uuid::new_v4().to_string(),
            source,
            requested_count,
            imported_count: None,
            status: JobStatus::Pending,
            completed_at: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validate and persist a new PENDING job. No import work is started
    /// here; creation and execution are decoupled so listings observe the
    /// PENDING job immediately.
    pub async fn create(
        source: Option<&str>,
        requested_count: u32,
        db: &SurrealDbClient,
    ) -> Result<Self, AppError> {
        if requested_count == 0 {
            return Err(AppError::Validation(
                "requested count must be positive".to_string(),
            ));
        }

        let job = Self::new(ImportSource::from_request(source), requested_count);
        db.store_item(job.clone()).await?;
        Ok(job)
    }

    pub async fn find_by_id(id: &str, db: &SurrealDbClient) -> Result<Self, AppError> {
        db.get_item::<ImportJob>(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Import job {id} not found")))
    }

    /// PENDING -> IN_PROGRESS, persisted before any fetch work so a crash
    /// mid-import leaves a diagnosable IN_PROGRESS row rather than a lost
    /// transition. Guarded on the stored status; a stale caller gets an
    /// invalid-transition error instead of overwriting.
    pub async fn mark_in_progress(&self, db: &SurrealDbClient) -> Result<Self, AppError> {
        let next = compute_next_status(&self.status, JobTransition::Start)?;
        debug_assert_eq!(next, JobStatus::InProgress);

        const START_QUERY: &str = r#"
            UPDATE type::thing($table, $id)
            SET status = $in_progress,
                updated_at = $now
            WHERE status = $pending
            RETURN *;
        "#;

        let now = chrono::Utc::now();
        let mut result = db
            .client
            .query(START_QUERY)
            .bind(("table", Self::table_name()))
            .bind(("id", self.id.clone()))
            .bind(("in_progress", JobStatus::InProgress.as_str()))
            .bind(("pending", JobStatus::Pending.as_str()))
            .bind(("now", SurrealDatetime::from(now)))
            .await?;

        let updated: Option<ImportJob> = result.take(0)?;
        updated.ok_or_else(|| invalid_transition(&self.status, JobTransition::Start))
    }

    /// IN_PROGRESS -> COMPLETED with the count of persisted videos.
    pub async fn mark_completed(
        &self,
        imported_count: u32,
        db: &SurrealDbClient,
    ) -> Result<Self, AppError> {
        let next = compute_next_status(&self.status, JobTransition::Complete)?;
        debug_assert_eq!(next, JobStatus::Completed);

        const COMPLETE_QUERY: &str = r#"
            UPDATE type::thing($table, $id)
            SET status = $completed,
                imported_count = $imported_count,
                completed_at = $now,
                error_message = NONE,
                updated_at = $now
            WHERE status = $in_progress
            RETURN *;
        "#;

        let now = chrono::Utc::now();
        let mut result = db
            .client
            .query(COMPLETE_QUERY)
            .bind(("table", Self::table_name()))
            .bind(("id", self.id.clone()))
            .bind(("completed", JobStatus::Completed.as_str()))
            .bind(("in_progress", JobStatus::InProgress.as_str()))
            .bind(("imported_count", i64::from(imported_count)))
            .bind(("now", SurrealDatetime::from(now)))
            .await?;

        let updated: Option<ImportJob> = result.take(0)?;
        updated.ok_or_else(|| invalid_transition(&self.status, JobTransition::Complete))
    }

    /// IN_PROGRESS -> FAILED with a diagnostic message. No partial import
    /// count is recorded; videos persisted before the failure remain.
    pub async fn mark_failed(
        &self,
        error_message: &str,
        db: &SurrealDbClient,
    ) -> Result<Self, AppError> {
        let next = compute_next_status(&self.status, JobTransition::Fail)?;
        debug_assert_eq!(next, JobStatus::Failed);

        const FAIL_QUERY: &str = r#"
            UPDATE type::thing($table, $id)
            SET status = $failed,
                imported_count = NONE,
                error_message = $error_message,
                completed_at = $now,
                updated_at = $now
            WHERE status = $in_progress
            RETURN *;
        "#;

        let now = chrono::Utc::now();
        let mut result = db
            .client
            .query(FAIL_QUERY)
            .bind(("table", Self::table_name()))
            .bind(("id", self.id.clone()))
            .bind(("failed", JobStatus::Failed.as_str()))
            .bind(("in_progress", JobStatus::InProgress.as_str()))
            .bind(("error_message", error_message.to_string()))
            .bind(("now", SurrealDatetime::from(now)))
            .await?;

        let updated: Option<ImportJob> = result.take(0)?;
        updated.ok_or_else(|| invalid_transition(&self.status, JobTransition::Fail))
    }

    /// Filtered, sorted, paginated job history.
    ///
    /// Filter precedence follows the original API contract: a status filter
    /// wins over a source filter; filters are never combined. The total is
    /// counted in a separate query and may lag the content slice when jobs
    /// are created concurrently.
    pub async fn list(
        query: &JobListQuery,
        db: &SurrealDbClient,
    ) -> Result<PagedResult<ImportJob>, AppError> {
        #[derive(Deserialize)]
        struct CountResult {
            count: i64,
        }

        let filter = if query.status.is_some() {
            "WHERE status = $status"
        } else if query.source.is_some() {
            "WHERE source = $source"
        } else {
            ""
        };

        // Sort column and direction come from closed enums, never from raw
        // user input.
        let list_sql = format!(
            "SELECT * FROM type::table($table) {filter} ORDER BY {column} {direction} LIMIT $limit START $start",
            column = query.sort.column(),
            direction = query.direction.keyword(),
        );
        let count_sql =
            format!("SELECT count() AS count FROM type::table($table) {filter} GROUP ALL");

        let mut list_request = db
            .client
            .query(list_sql)
            .bind(("table", Self::table_name()))
            .bind(("limit", i64::from(query.size)))
            .bind(("start", i64::from(query.page) * i64::from(query.size)));
        let mut count_request = db
            .client
            .query(count_sql)
            .bind(("table", Self::table_name()));

        if let Some(status) = query.status {
            list_request = list_request.bind(("status", status.as_str()));
            count_request = count_request.bind(("status", status.as_str()));
        } else if let Some(source) = &query.source {
            list_request = list_request.bind(("source", source.clone()));
            count_request = count_request.bind(("source", source.clone()));
        }

        let content: Vec<ImportJob> = list_request.await?.take(0)?;
        let total: Option<CountResult> = count_request.await?.take(0)?;

        Ok(PagedResult {
            content,
            page: query.page,
            size: query.size,
            sort: query.sort.api_name().to_string(),
            direction: query.direction.keyword().to_string(),
            total_elements: total.map(|c| c.count).unwrap_or(0).max(0) as u64,
        })
    }
}

/// Sortable job fields, addressed by their wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSortField {
    CreatedAt,
    CompletedAt,
    Status,
    Source,
    RequestedCount,
    ImportedCount,
}

impl JobSortField {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw {
            "createdAt" => Ok(JobSortField::CreatedAt),
            "completedAt" => Ok(JobSortField::CompletedAt),
            "status" => Ok(JobSortField::Status),
            "source" => Ok(JobSortField::Source),
            "requestedCount" => Ok(JobSortField::RequestedCount),
            "importedCount" => Ok(JobSortField::ImportedCount),
            _ => Err(AppError::Validation(format!(
                "Unsupported sort field: {raw}"
            ))),
        }
    }

    pub fn api_name(&self) -> &'static str {
        match self {
            JobSortField::CreatedAt => "createdAt",
            JobSortField::CompletedAt => "completedAt",
            JobSortField::Status => "status",
            JobSortField::Source => "source",
            JobSortField::RequestedCount => "requestedCount",
            JobSortField::ImportedCount => "importedCount",
        }
    }

    fn column(&self) -> &'static str {
        match self {
            JobSortField::CreatedAt => "created_at",
            JobSortField::CompletedAt => "completed_at",
            JobSortField::Status => "status",
            JobSortField::Source => "source",
            JobSortField::RequestedCount => "requested_count",
            JobSortField::ImportedCount => "imported_count",
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobListQuery {
    pub status: Option<JobStatus>,
    pub source: Option<String>,
    pub page: u32,
    pub size: u32,
    pub sort: JobSortField,
    pub direction: SortDirection,
}

impl Default for JobListQuery {
    fn default() -> Self {
        Self {
            status: None,
            source: None,
            page: 0,
            size: 10,
            sort: JobSortField::CreatedAt,
            direction: SortDirection::Desc,
        }
    }
}
