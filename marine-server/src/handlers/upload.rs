//! Upload handler
//!
//! Handles POST /upload: the file is stored, fingerprinted and recorded before
//! the response is sent; matching, discovery and the upload announcement run
//! afterwards in the background.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::ingest::VideoMetadata;
use crate::multipart::MultipartFields;
use crate::state::AppState;

/// Response for a successful upload
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    /// Generated video id
    #[schema(example = 42)]
    pub id: i64,
    /// Stored filename
    #[schema(example = "match-highlights.mp4")]
    pub filename: String,
    /// Content fingerprint (MD5, hex-encoded)
    #[schema(example = "d41d8cd98f00b204e9800998ecf8427e")]
    pub fingerprint: String,
}

/// Upload a video for piracy tracking
///
/// Accepts multipart/form-data with:
/// - **file** (required): the video; its multipart filename names the stored file
/// - **name** (optional): title
/// - **description** (optional)
/// - **user_email** (optional): owner
#[utoipa::path(
    post,
    path = "/upload",
    tag = "Videos",
    request_body(
        content_type = "multipart/form-data",
        description = "Video file with optional metadata"
    ),
    responses(
        (status = 200, description = "Upload stored and recorded", body = UploadResponse),
        (status = 400, description = "Missing file, invalid filename, unsupported type or too large"),
        (status = 500, description = "Storage or database failure")
    )
)]
pub async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut fields = MultipartFields::parse(&mut multipart, state.max_file_size).await?;
    let file = fields.take_file()?;

    let filename = file
        .file_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::bad_request("The 'file' field must carry a filename"))?
        .to_string();

    let metadata = VideoMetadata {
        user_email: fields.get_text("user_email").map(str::to_string),
        title: fields.get_text("name").map(str::to_string),
        description: fields.get_text("description").map(str::to_string),
    };

    let video = state.intake.ingest(&filename, &file.data, metadata).await?;

    // Handles are dropped: the jobs are detached from this request.
    state.fanout.schedule(&video);

    Ok(Json(UploadResponse {
        id: video.id,
        filename: video.filename,
        fingerprint: video.fingerprint,
    }))
}
