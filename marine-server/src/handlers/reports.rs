//! Read endpoints over recorded videos and piracy cases.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::db::{PiracyCaseRecord, VideoRecord};
use crate::error::ApiError;
use crate::state::AppState;

/// List all piracy cases, newest first
#[utoipa::path(
    get,
    path = "/reports",
    tag = "Reports",
    responses(
        (status = 200, description = "Recorded piracy cases", body = [PiracyCaseRecord]),
        (status = 500, description = "Database failure")
    )
)]
pub async fn list_reports_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<PiracyCaseRecord>>, ApiError> {
    let cases = state.store.list_piracy_cases().await?;
    Ok(Json(cases.into_iter().map(PiracyCaseRecord::from).collect()))
}

/// Fetch one video record
#[utoipa::path(
    get,
    path = "/videos/{id}",
    tag = "Videos",
    params(("id" = i64, Path, description = "Video id")),
    responses(
        (status = 200, description = "Video found", body = VideoRecord),
        (status = 404, description = "No such video")
    )
)]
pub async fn get_video_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<VideoRecord>, ApiError> {
    state
        .store
        .find_video(id)
        .await?
        .map(|video| Json(VideoRecord::from(video)))
        .ok_or_else(|| ApiError::not_found(format!("Video {} not found", id)))
}

/// List the videos a user uploaded, newest first
#[utoipa::path(
    get,
    path = "/users/{user_email}/videos",
    tag = "Videos",
    params(("user_email" = String, Path, description = "Owner email")),
    responses((status = 200, description = "The user's videos", body = [VideoRecord]))
)]
pub async fn list_user_videos_handler(
    State(state): State<AppState>,
    Path(user_email): Path<String>,
) -> Result<Json<Vec<VideoRecord>>, ApiError> {
    if user_email.trim().is_empty() {
        return Err(ApiError::bad_request("Missing user_email route parameter"));
    }

    let videos = state.store.list_videos_for_user(&user_email).await?;
    Ok(Json(videos.into_iter().map(VideoRecord::from).collect()))
}
