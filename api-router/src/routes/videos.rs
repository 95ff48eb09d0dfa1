use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use common::storage::types::{
    paged::SortDirection,
    video::{CandidateVideo, Video, VideoListQuery, VideoSortField},
};
use serde::{Deserialize, Serialize};

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListVideosParams {
    pub source: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub min_duration: Option<u32>,
    pub max_duration: Option<u32>,
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
    "uploadDate".to_string()
}

fn default_direction() -> String {
    "DESC".to_string()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDto {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub source: String,
    pub upload_date: NaiveDate,
    pub duration_in_seconds: u32,
    pub created_at: DateTime<Utc>,
}

impl From<Video> for VideoDto {
    fn from(video: Video) -> Self {
        Self {
            id: video.id,
            title: video.title,
            description: video.description,
            url: video.url,
            source: video.source,
            upload_date: video.upload_date,
            duration_in_seconds: video.duration_in_seconds,
            created_at: video.created_at,
        }
    }
}

pub async fn list_videos(
    State(state): State<ApiState>,
    Query(params): Query<ListVideosParams>,
) -> Result<impl IntoResponse, ApiError> {
    if params.size == 0 {
        return Err(ApiError::ValidationError(
            "page size must be positive".to_string(),
        ));
    }

    let query = VideoListQuery {
        source: params.source,
        start_date: params.start_date,
        end_date: params.end_date,
        min_duration: params.min_duration,
        max_duration: params.max_duration,
        page: params.page,
        size: params.size,
        sort: VideoSortField::parse(&params.sort)?,
        direction: SortDirection::parse(&params.direction)?,
    };

    let page = Video::list(&query, &state.db).await?;
    Ok(Json(page.map(VideoDto::from)))
}

pub async fn get_video(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let video = Video::find_by_id(&id, &state.db).await?;
    Ok(Json(VideoDto::from(video)))
}

/// Manual catalog entry, bypassing the import pipeline.
pub async fn create_video(
    State(state): State<ApiState>,
    Json(candidate): Json<CandidateVideo>,
) -> Result<impl IntoResponse, ApiError> {
    let video = Video::create(candidate, &state.db).await?;
    Ok((StatusCode::CREATED, Json(VideoDto::from(video))))
}

pub async fn video_statistics(
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ApiError> {
    let statistics = Video::statistics(&state.db).await?;
    Ok(Json(statistics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_params_defaults() {
        let params: ListVideosParams = serde_json::from_value(json!({})).expect("parse");
        assert_eq!(params.page, 0);
        assert_eq!(params.size, 10);
        assert_eq!(params.sort, "uploadDate");
        assert_eq!(params.direction, "DESC");
        assert!(params.start_date.is_none());
    }

    #[test]
    fn test_list_params_parse_dates() {
        let params: ListVideosParams = serde_json::from_value(json!({
            "startDate": "2022-01-01",
            "endDate": "2022-12-31",
            "minDuration": 60,
        }))
        .expect("parse");
        assert_eq!(params.start_date, NaiveDate::from_ymd_opt(2022, 1, 1));
        assert_eq!(params.end_date, NaiveDate::from_ymd_opt(2022, 12, 31));
        assert_eq!(params.min_duration, Some(60));
    }

    #[test]
    fn test_dto_serialization_shape() {
        let video = Video::new(CandidateVideo {
            title: "A clip".to_string(),
            description: None,
            url: "https://vimeo.com/abc".to_string(),
            source: "Vimeo".to_string(),
            upload_date: NaiveDate::from_ymd_opt(2021, 7, 9).expect("valid date"),
            duration_in_seconds: 321,
        });

        let serialized = serde_json::to_value(VideoDto::from(video)).expect("serialize");
        assert_eq!(serialized["uploadDate"], "2021-07-09");
        assert_eq!(serialized["durationInSeconds"], 321);
        assert_eq!(serialized["source"], "Vimeo");
        assert!(serialized["description"].is_null());
    }
}
