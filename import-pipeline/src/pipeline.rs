use std::sync::Arc;

use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        types::{
            import_job::{ImportJob, ImportSource},
            video::CandidateVideo,
        },
    },
};
use tokio::time::Duration;
use tracing::{info, info_span, warn, Instrument};

use crate::{fetcher::SourceFetcher, ingestor::VideoIngestor};

/// Executes one import job end to end: fetch from the external catalog,
/// validate and persist, record the outcome on the job row.
pub struct ImportPipeline {
    db: Arc<SurrealDbClient>,
    fetcher: Arc<dyn SourceFetcher>,
    ingestor: VideoIngestor,
    fetch_timeout: Duration,
}

impl ImportPipeline {
    pub fn new(
        db: Arc<SurrealDbClient>,
        fetcher: Arc<dyn SourceFetcher>,
        fetch_timeout: Duration,
    ) -> Self {
        let ingestor = VideoIngestor::new(db.clone());
        Self {
            db,
            fetcher,
            ingestor,
            fetch_timeout,
        }
    }

    /// Drive the job with the given id to a terminal state.
    ///
    /// Import failures are absorbed into the job row as FAILED; the returned
    /// `Err` only covers cases where no outcome could be recorded (job
    /// missing, not PENDING, or the status write itself failed).
    pub async fn run_job(&self, job_id: &str) -> Result<ImportJob, AppError> {
        let job = ImportJob::find_by_id(job_id, &self.db).await?;
        let span = info_span!(
            "import_job",
            job_id = %job.id,
            source = %job.source,
            requested = job.requested_count,
        );

        async {
            // Persisted before any fetch work; a listing made right after
            // dispatch sees IN_PROGRESS.
            let running = job.mark_in_progress(&self.db).await?;

            match self.execute(&running).await {
                Ok(imported_count) => {
                    info!(imported_count, "import job completed");
                    running.mark_completed(imported_count, &self.db).await
                }
                Err(err) => {
                    warn!(error = %err, "import job failed");
                    running.mark_failed(&err.to_string(), &self.db).await
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, job: &ImportJob) -> Result<u32, AppError> {
        let candidates = match &job.source {
            ImportSource::AllSources => {
                let mut all = Vec::new();
                for source in self.fetcher.known_sources() {
                    all.extend(self.timed_fetch(source, job.requested_count).await?);
                }
                all
            }
            ImportSource::Named(name) => self.timed_fetch(name, job.requested_count).await?,
        };

        let stored = self.ingestor.ingest(candidates).await?;
        u32::try_from(stored.len())
            .map_err(|_| AppError::InternalError("imported count overflow".to_string()))
    }

    async fn timed_fetch(
        &self,
        source: &str,
        count: u32,
    ) -> Result<Vec<CandidateVideo>, AppError> {
        tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(source, count))
            .await
            .map_err(|_| {
                AppError::Processing(format!(
                    "Fetch from {source} timed out after {}s",
                    self.fetch_timeout.as_secs()
                ))
            })?
    }
}
