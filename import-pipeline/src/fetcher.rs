use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{error::AppError, storage::types::video::CandidateVideo};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::info;

/// Sources the external catalog exposes. A job for "all sources" fans out
/// over exactly this list.
pub const KNOWN_SOURCES: [&str; 3] = ["YouTube", "Vimeo", "Internal"];

/// Seam to the external video catalog. One implementor per upstream; the
/// pipeline only sees this trait. An "all sources" job fans out over
/// `known_sources`, one timed `fetch` per source.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Fetch up to `count` videos from one named source.
    async fn fetch(&self, source: &str, count: u32) -> Result<Vec<CandidateVideo>, AppError>;

    fn known_sources(&self) -> &'static [&'static str] {
        &KNOWN_SOURCES
    }
}

const TITLES: [&str; 10] = [
    "Introduction to Spring Boot",
    "Advanced Java Programming",
    "Microservices Architecture",
    "Cloud Computing Fundamentals",
    "DevOps Best Practices",
    "Docker and Kubernetes",
    "React.js for Beginners",
    "Machine Learning Basics",
    "Data Science with Python",
    "Blockchain Technology",
];

const DESCRIPTIONS: [&str; 10] = [
    "Learn the basics of Spring Boot framework",
    "Advanced techniques for Java developers",
    "Understanding microservices architecture and implementation",
    "Introduction to cloud computing concepts",
    "Best practices for DevOps implementation",
    "Containerization with Docker and orchestration with Kubernetes",
    "Getting started with React.js for frontend development",
    "Introduction to machine learning algorithms",
    "Data analysis and visualization with Python",
    "Understanding blockchain technology and applications",
];

const ID_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const VIDEO_ID_LEN: usize = 11;
const MIN_DURATION_SECS: u32 = 30;
const MAX_DURATION_SECS: u32 = 1800;

/// Stand-in for the real catalog integration: synthesizes plausible video
/// metadata instead of calling out. Deterministic for a fixed seed, which
/// tests and demo deployments rely on.
pub struct SimulatedVideoClient {
    rng: Mutex<StdRng>,
}

impl SimulatedVideoClient {
    pub fn new() -> Self {
        Self::from_seed(rand::random::<u64>())
    }

    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn base_url(source: &str) -> &'static str {
        match source {
            "YouTube" => "https://youtube.com/watch?v=",
            "Vimeo" => "https://vimeo.com/",
            _ => "https://internal.globalmedia.com/videos/",
        }
    }

    fn synthesize(&self, source: &str, count: u32) -> Result<Vec<CandidateVideo>, AppError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| AppError::InternalError("fetcher rng lock poisoned".to_string()))?;

        let earliest = NaiveDate::from_ymd_opt(2020, 1, 1)
            .ok_or_else(|| AppError::InternalError("invalid catalog epoch".to_string()))?;
        let today = chrono::Utc::now().date_naive();
        let day_span = (today - earliest).num_days().max(1);

        let mut videos = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let video_id: String = (0..VIDEO_ID_LEN)
                .map(|_| ID_CHARS[rng.random_range(0..ID_CHARS.len())] as char)
                .collect();

            videos.push(CandidateVideo {
                title: TITLES[rng.random_range(0..TITLES.len())].to_string(),
                description: Some(DESCRIPTIONS[rng.random_range(0..DESCRIPTIONS.len())].to_string()),
                url: format!("{}{}", Self::base_url(source), video_id),
                source: source.to_string(),
                upload_date: earliest + chrono::Duration::days(rng.random_range(0..day_span)),
                duration_in_seconds: rng.random_range(MIN_DURATION_SECS..MAX_DURATION_SECS),
            });
        }

        Ok(videos)
    }
}

impl Default for SimulatedVideoClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceFetcher for SimulatedVideoClient {
    async fn fetch(&self, source: &str, count: u32) -> Result<Vec<CandidateVideo>, AppError> {
        if !KNOWN_SOURCES.contains(&source) {
            return Err(AppError::Processing(format!(
                "Unknown video source: {source}"
            )));
        }

        info!(%source, count, "fetching videos from source");
        self.synthesize(source, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seeded_fetch_is_deterministic() {
        let first = SimulatedVideoClient::from_seed(7);
        let second = SimulatedVideoClient::from_seed(7);

        let a = first.fetch("YouTube", 5).await.expect("fetch");
        let b = second.fetch("YouTube", 5).await.expect("fetch");
        assert_eq!(a, b);

        let different_seed = SimulatedVideoClient::from_seed(8);
        let c = different_seed.fetch("YouTube", 5).await.expect("fetch");
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn test_fetched_videos_are_plausible_and_valid() {
        let client = SimulatedVideoClient::from_seed(42);
        let videos = client.fetch("Vimeo", 20).await.expect("fetch");
        assert_eq!(videos.len(), 20);

        let earliest = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let today = chrono::Utc::now().date_naive();

        for video in &videos {
            video.validate().expect("candidate should be valid");
            assert_eq!(video.source, "Vimeo");
            assert!(video.url.starts_with("https://vimeo.com/"));
            assert!(TITLES.contains(&video.title.as_str()));
            assert!((MIN_DURATION_SECS..MAX_DURATION_SECS).contains(&video.duration_in_seconds));
            assert!(video.upload_date >= earliest && video.upload_date <= today);
        }
    }

    #[tokio::test]
    async fn test_source_specific_urls() {
        let client = SimulatedVideoClient::from_seed(1);

        let youtube = client.fetch("YouTube", 1).await.expect("fetch");
        assert!(youtube[0].url.starts_with("https://youtube.com/watch?v="));
        // The generated video id is always eleven characters.
        assert_eq!(
            youtube[0].url.len(),
            "https://youtube.com/watch?v=".len() + VIDEO_ID_LEN
        );

        let internal = client.fetch("Internal", 1).await.expect("fetch");
        assert!(internal[0]
            .url
            .starts_with("https://internal.globalmedia.com/videos/"));
    }

    #[tokio::test]
    async fn test_unknown_source_is_rejected() {
        let client = SimulatedVideoClient::from_seed(3);
        let result = client.fetch("Dailymotion", 5).await;
        assert!(matches!(result, Err(AppError::Processing(_))));
    }

    #[tokio::test]
    async fn test_zero_count_yields_empty_batch() {
        let client = SimulatedVideoClient::from_seed(11);
        let videos = client.fetch("YouTube", 0).await.expect("fetch");
        assert!(videos.is_empty());
    }
}
