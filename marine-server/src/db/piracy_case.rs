//! Piracy case entity
//!
//! Append-only record of a located copy of an uploaded video.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// Piracy case entity from database
#[derive(Debug, Clone, FromRow)]
pub struct PiracyCase {
    pub id: i64,
    pub video_id: i64,
    pub piracy_url: String,
    pub match_score: f64,
    pub detected_at: DateTime<Utc>,
}

/// DTO for appending a piracy case
#[derive(Debug, Clone, PartialEq)]
pub struct NewPiracyCase {
    pub video_id: i64,
    pub piracy_url: String,
    pub match_score: f64,
}

/// Result of appending a piracy case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written with this id
    Inserted(i64),
    /// The same (video, url, score) was already recorded
    Duplicate,
}

/// Piracy case response DTO for API responses
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PiracyCaseRecord {
    #[schema(example = 1)]
    pub id: i64,

    #[schema(example = 42)]
    pub video_id: i64,

    /// Where the copy was found
    #[schema(example = "https://pirate.example/x")]
    pub piracy_url: String,

    /// Match score in [0, 100]
    #[schema(example = 91.5)]
    pub match_score: f64,

    #[schema(value_type = String, example = "2026-01-08T10:00:00Z")]
    pub detected_at: DateTime<Utc>,
}

impl From<PiracyCase> for PiracyCaseRecord {
    fn from(case: PiracyCase) -> Self {
        Self {
            id: case.id,
            video_id: case.video_id,
            piracy_url: case.piracy_url,
            match_score: case.match_score,
            detected_at: case.detected_at,
        }
    }
}
