use std::collections::HashMap;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{error::AppError, storage::db::SurrealDbClient, stored_object};

use super::paged::{PagedResult, SortDirection};

/// Video metadata as fetched from an external source, not yet persisted.
/// Validation happens here so every stored [`Video`] is known-good.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CandidateVideo {
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub source: String,
    pub upload_date: NaiveDate,
    pub duration_in_seconds: u32,
}

impl CandidateVideo {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("title must not be blank".to_string()));
        }
        if self.source.trim().is_empty() {
            return Err(AppError::Validation("source must not be blank".to_string()));
        }
        url::Url::parse(&self.url)
            .map_err(|e| AppError::Validation(format!("invalid url {}: {e}", self.url)))?;
        if self.duration_in_seconds == 0 {
            return Err(AppError::Validation(
                "duration must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

stored_object!(Video, "video", {
    title: String,
    description: Option<String>,
    url: String,
    source: String,
    upload_date: NaiveDate,
    duration_in_seconds: u32
});

impl Video {
    pub fn new(candidate: CandidateVideo) -> Self {
        let now = chrono::Utc::now();

        Self {
            id: Uuid::new_v4().to_string(),
            title: candidate.title,
            description: candidate.description,
            url: candidate.url,
            source: candidate.source,
            upload_date: candidate.upload_date,
            duration_in_seconds: candidate.duration_in_seconds,
            created_at: now,
            updated_at: now,
        }
    }

    pub async fn create(
        candidate: CandidateVideo,
        db: &SurrealDbClient,
    ) -> Result<Self, AppError> {
        candidate.validate()?;
        let video = Self::new(candidate);
        db.store_item(video.clone()).await?;
        Ok(video)
    }

    pub async fn find_by_id(id: &str, db: &SurrealDbClient) -> Result<Self, AppError> {
        db.get_item::<Video>(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Video {id} not found")))
    }

    /// Filtered, sorted, paginated catalog view. One filter applies at a
    /// time: source, then an upload-date range (both bounds required), then
    /// a duration range (both bounds required).
    pub async fn list(
        query: &VideoListQuery,
        db: &SurrealDbClient,
    ) -> Result<PagedResult<Video>, AppError> {
        #[derive(Deserialize)]
        struct CountResult {
            count: i64,
        }

        let filter = if query.source.is_some() {
            "WHERE source = $source"
        } else if query.date_range().is_some() {
            "WHERE upload_date >= $start_date AND upload_date <= $end_date"
        } else if query.duration_range().is_some() {
            "WHERE duration_in_seconds >= $min_duration AND duration_in_seconds <= $max_duration"
        } else {
            ""
        };

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

        if let Some(source) = &query.source {
            list_request = list_request.bind(("source", source.clone()));
            count_request = count_request.bind(("source", source.clone()));
        } else if let Some((start, end)) = query.date_range() {
            list_request = list_request
                .bind(("start_date", start))
                .bind(("end_date", end));
            count_request = count_request
                .bind(("start_date", start))
                .bind(("end_date", end));
        } else if let Some((min, max)) = query.duration_range() {
            list_request = list_request
                .bind(("min_duration", i64::from(min)))
                .bind(("max_duration", i64::from(max)));
            count_request = count_request
                .bind(("min_duration", i64::from(min)))
                .bind(("max_duration", i64::from(max)));
        }

        let content: Vec<Video> = list_request.await?.take(0)?;
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

    /// Catalog statistics, recomputed from the stored rows on every call.
    pub async fn statistics(db: &SurrealDbClient) -> Result<VideoStatistics, AppError> {
        #[derive(Deserialize)]
        struct SourceCount {
            source: String,
            count: i64,
        }

        #[derive(Deserialize)]
        struct SourceMean {
            source: String,
            mean_duration: f64,
        }

        let counts: Vec<SourceCount> = db
            .client
            .query("SELECT source, count() AS count FROM type::table($table) GROUP BY source")
            .bind(("table", Self::table_name()))
            .await?
            .take(0)?;

        let means: Vec<SourceMean> = db
            .client
            .query(
                "SELECT source, math::mean(duration_in_seconds) AS mean_duration \
                 FROM type::table($table) GROUP BY source",
            )
            .bind(("table", Self::table_name()))
            .await?
            .take(0)?;

        let mut total_videos = 0u64;
        let mut video_count_by_source = HashMap::new();
        for row in counts {
            let count = row.count.max(0) as u64;
            total_videos += count;
            video_count_by_source.insert(row.source, count);
        }

        let average_duration_by_source = means
            .into_iter()
            .map(|row| (row.source, format_duration(row.mean_duration as u64)))
            .collect();

        Ok(VideoStatistics {
            video_count_by_source,
            average_duration_by_source,
            total_videos,
        })
    }
}

/// Seconds rendered as HH:MM:SS, hours growing past two digits if needed.
fn format_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[derive(Debug, Clone, serde::Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatistics {
    pub video_count_by_source: HashMap<String, u64>,
    pub average_duration_by_source: HashMap<String, String>,
    pub total_videos: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoSortField {
    Title,
    Source,
    UploadDate,
    DurationInSeconds,
    CreatedAt,
}

impl VideoSortField {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw {
            "title" => Ok(VideoSortField::Title),
            "source" => Ok(VideoSortField::Source),
            "uploadDate" => Ok(VideoSortField::UploadDate),
            "durationInSeconds" => Ok(VideoSortField::DurationInSeconds),
            "createdAt" => Ok(VideoSortField::CreatedAt),
            _ => Err(AppError::Validation(format!(
                "Unsupported sort field: {raw}"
            ))),
        }
    }

    pub fn api_name(&self) -> &'static str {
        match self {
            VideoSortField::Title => "title",
            VideoSortField::Source => "source",
            VideoSortField::UploadDate => "uploadDate",
            VideoSortField::DurationInSeconds => "durationInSeconds",
            VideoSortField::CreatedAt => "createdAt",
        }
    }

    fn column(&self) -> &'static str {
        match self {
            VideoSortField::Title => "title",
            VideoSortField::Source => "source",
            VideoSortField::UploadDate => "upload_date",
            VideoSortField::DurationInSeconds => "duration_in_seconds",
            VideoSortField::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone)]
pub struct VideoListQuery {
    pub source: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub min_duration: Option<u32>,
    pub max_duration: Option<u32>,
    pub page: u32,
    pub size: u32,
    pub sort: VideoSortField,
    pub direction: SortDirection,
}

impl VideoListQuery {
    fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.start_date.zip(self.end_date)
    }

    fn duration_range(&self) -> Option<(u32, u32)> {
        self.min_duration.zip(self.max_duration)
    }
}

impl Default for VideoListQuery {
    fn default() -> Self {
        Self {
            source: None,
            start_date: None,
            end_date: None,
            min_duration: None,
            max_duration: None,
            page: 0,
            size: 10,
            sort: VideoSortField::UploadDate,
            direction: SortDirection::Desc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_db() -> SurrealDbClient {
        let namespace = "test_ns";
        let database = Uuid::new_v4().to_string();
        SurrealDbClient::memory(namespace, &database)
            .await
            .expect("in-memory surrealdb")
    }

    fn candidate(source: &str, day: u32, duration: u32) -> CandidateVideo {
        CandidateVideo {
            title: format!("{source} clip {day}"),
            description: Some("a clip".to_string()),
            url: format!("https://example.com/{source}/{day}"),
            source: source.to_string(),
            upload_date: NaiveDate::from_ymd_opt(2023, 6, day).expect("valid date"),
            duration_in_seconds: duration,
        }
    }

    #[test]
    fn test_candidate_validation() {
        assert!(candidate("YouTube", 1, 60).validate().is_ok());

        let mut blank_title = candidate("YouTube", 1, 60);
        blank_title.title = "   ".to_string();
        assert!(matches!(
            blank_title.validate(),
            Err(AppError::Validation(_))
        ));

        let mut bad_url = candidate("YouTube", 1, 60);
        bad_url.url = "not a url".to_string();
        assert!(matches!(bad_url.validate(), Err(AppError::Validation(_))));

        let mut zero_duration = candidate("YouTube", 1, 60);
        zero_duration.duration_in_seconds = 0;
        assert!(matches!(
            zero_duration.validate(),
            Err(AppError::Validation(_))
        ));

        let mut blank_source = candidate("YouTube", 1, 60);
        blank_source.source = String::new();
        assert!(matches!(
            blank_source.validate(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "00:00:00");
        assert_eq!(format_duration(59), "00:00:59");
        assert_eq!(format_duration(61), "00:01:01");
        assert_eq!(format_duration(3661), "01:01:01");
        assert_eq!(format_duration(360_000), "100:00:00");
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_candidate() {
        let db = memory_db().await;
        let mut invalid = candidate("YouTube", 1, 60);
        invalid.title = String::new();

        let result = Video::create(invalid, &db).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let all = db
            .get_all_stored_items::<Video>()
            .await
            .expect("fetch all");
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let db = memory_db().await;
        let video = Video::create(candidate("Vimeo", 5, 120), &db)
            .await
            .expect("create");

        let found = Video::find_by_id(&video.id, &db).await.expect("find");
        assert_eq!(found, video);

        let missing = Video::find_by_id("nope", &db).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = memory_db().await;
        for (source, day, duration) in [
            ("YouTube", 1, 100),
            ("YouTube", 10, 500),
            ("Vimeo", 5, 300),
            ("Internal", 20, 900),
        ] {
            Video::create(candidate(source, day, duration), &db)
                .await
                .expect("create");
        }

        let by_source = Video::list(
            &VideoListQuery {
                source: Some("YouTube".to_string()),
                ..VideoListQuery::default()
            },
            &db,
        )
        .await
        .expect("list by source");
        assert_eq!(by_source.total_elements, 2);
        assert!(by_source.content.iter().all(|v| v.source == "YouTube"));

        let by_dates = Video::list(
            &VideoListQuery {
                start_date: NaiveDate::from_ymd_opt(2023, 6, 4),
                end_date: NaiveDate::from_ymd_opt(2023, 6, 12),
                ..VideoListQuery::default()
            },
            &db,
        )
        .await
        .expect("list by dates");
        assert_eq!(by_dates.total_elements, 2);

        // A single date bound is ignored, not half-applied.
        let open_ended = Video::list(
            &VideoListQuery {
                start_date: NaiveDate::from_ymd_opt(2023, 6, 4),
                ..VideoListQuery::default()
            },
            &db,
        )
        .await
        .expect("list open ended");
        assert_eq!(open_ended.total_elements, 4);

        let by_duration = Video::list(
            &VideoListQuery {
                min_duration: Some(200),
                max_duration: Some(600),
                ..VideoListQuery::default()
            },
            &db,
        )
        .await
        .expect("list by duration");
        assert_eq!(by_duration.total_elements, 2);

        // Source wins over the other filters.
        let precedence = Video::list(
            &VideoListQuery {
                source: Some("Internal".to_string()),
                min_duration: Some(1),
                max_duration: Some(2),
                ..VideoListQuery::default()
            },
            &db,
        )
        .await
        .expect("list precedence");
        assert_eq!(precedence.total_elements, 1);
        assert_eq!(precedence.content[0].source, "Internal");
    }

    #[tokio::test]
    async fn test_list_sorting() {
        let db = memory_db().await;
        for (source, day, duration) in [("A", 3, 300), ("B", 1, 100), ("C", 2, 200)] {
            Video::create(candidate(source, day, duration), &db)
                .await
                .expect("create");
        }

        let by_duration = Video::list(
            &VideoListQuery {
                sort: VideoSortField::DurationInSeconds,
                direction: SortDirection::Asc,
                ..VideoListQuery::default()
            },
            &db,
        )
        .await
        .expect("sorted list");
        let durations: Vec<u32> = by_duration
            .content
            .iter()
            .map(|v| v.duration_in_seconds)
            .collect();
        assert_eq!(durations, vec![100, 200, 300]);
        assert_eq!(by_duration.sort, "durationInSeconds");
    }

    #[tokio::test]
    async fn test_statistics() {
        let db = memory_db().await;

        let empty = Video::statistics(&db).await.expect("empty stats");
        assert_eq!(empty.total_videos, 0);
        assert!(empty.video_count_by_source.is_empty());

        for (source, day, duration) in [
            ("YouTube", 1, 60),
            ("YouTube", 2, 120),
            ("Vimeo", 3, 3661),
        ] {
            Video::create(candidate(source, day, duration), &db)
                .await
                .expect("create");
        }

        let stats = Video::statistics(&db).await.expect("stats");
        assert_eq!(stats.total_videos, 3);
        assert_eq!(stats.video_count_by_source.get("YouTube"), Some(&2));
        assert_eq!(stats.video_count_by_source.get("Vimeo"), Some(&1));
        assert_eq!(
            stats.average_duration_by_source.get("YouTube"),
            Some(&"00:01:30".to_string())
        );
        assert_eq!(
            stats.average_duration_by_source.get("Vimeo"),
            Some(&"01:01:01".to_string())
        );
    }

    #[test]
    fn test_sort_field_whitelist() {
        assert_eq!(
            VideoSortField::parse("uploadDate").expect("known field"),
            VideoSortField::UploadDate
        );
        assert!(VideoSortField::parse("upload_date").is_err());
        assert!(VideoSortField::parse("description").is_err());
    }
}
