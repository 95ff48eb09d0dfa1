use std::sync::Arc;

use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        types::video::{CandidateVideo, Video},
    },
};
use tracing::debug;

/// Validates fetched candidates and persists them to the catalog.
pub struct VideoIngestor {
    db: Arc<SurrealDbClient>,
}

impl VideoIngestor {
    pub fn new(db: Arc<SurrealDbClient>) -> Self {
        Self { db }
    }

    /// Persist a batch one by one. The first invalid candidate or storage
    /// error aborts the batch; videos stored before the failure stay in the
    /// catalog.
    pub async fn ingest(&self, candidates: Vec<CandidateVideo>) -> Result<Vec<Video>, AppError> {
        let mut stored = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let video = Video::create(candidate, &self.db).await?;
            debug!(video_id = %video.id, source = %video.source, "stored imported video");
            stored.push(video);
        }
        Ok(stored)
    }
}
