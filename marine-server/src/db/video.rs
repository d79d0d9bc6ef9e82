//! Video entity
//!
//! A video row is immutable after insert except for `flagged`, which
//! downstream processes set when a match crosses the piracy threshold.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// Video entity from database
#[derive(Debug, Clone, FromRow)]
pub struct Video {
    pub id: i64,
    pub filename: String,
    pub fingerprint: String,
    pub user_email: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub hash_vector: Option<Vec<u8>>,
    pub audio_spectrum: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
    pub flagged: bool,
}

/// DTO for inserting a new video
#[derive(Debug, Clone, Default)]
pub struct NewVideo {
    pub filename: String,
    pub fingerprint: String,
    pub user_email: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Video response DTO for API responses
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VideoRecord {
    /// Surrogate id assigned on insert
    #[schema(example = 42)]
    pub id: i64,

    /// Client-supplied filename
    #[schema(example = "match-highlights.mp4")]
    pub filename: String,

    /// Content fingerprint (MD5, hex-encoded)
    #[schema(example = "d41d8cd98f00b204e9800998ecf8427e")]
    pub fingerprint: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Similarity hash vector (hex-encoded), written by the matching service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_vector: Option<String>,

    /// Audio spectrum fingerprint (hex-encoded), written by the matching service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_spectrum: Option<String>,

    #[schema(value_type = String, example = "2026-01-08T10:00:00Z")]
    pub created_at: DateTime<Utc>,

    /// Whether a piracy match has been detected for this video
    pub flagged: bool,
}

impl From<Video> for VideoRecord {
    fn from(video: Video) -> Self {
        Self {
            id: video.id,
            filename: video.filename,
            fingerprint: video.fingerprint,
            user_email: video.user_email,
            title: video.title,
            description: video.description,
            hash_vector: video.hash_vector.map(hex::encode),
            audio_spectrum: video.audio_spectrum.map(hex::encode),
            created_at: video.created_at,
            flagged: video.flagged,
        }
    }
}
