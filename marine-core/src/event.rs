//! Detection event wire codec.
//!
//! Two encodings share the broker topic:
//!
//! - **JSON frames** (default): `{"type":"piracy_found","video_id":42,"url":"...","score":91.5}`
//! - **Legacy text frames**: `VideoUploaded:<id>` and `PiracyFound:<id>:<url>:<score>`
//!
//! Legacy `PiracyFound` frames are split on the first colon (video id) and the
//! last colon (score); everything in between is the URL. URLs routinely contain
//! colons (`https://`, ports), so a plain split would truncate them.
//!
//! The split cannot tell a missing score from a trailing port:
//! `PiracyFound:1:http://host:80` decodes as url `http://host` with score 80.
//! Producers that may emit such URLs should use JSON frames.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MarineError, Result};

/// Prefix of a legacy "piracy found" frame.
pub const PIRACY_FOUND_PREFIX: &str = "PiracyFound:";

/// Prefix of a legacy "video uploaded" frame.
pub const VIDEO_UPLOADED_PREFIX: &str = "VideoUploaded:";

/// Inclusive bounds of a match score.
const SCORE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=100.0;

/// A notification travelling over the broker topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DetectionEvent {
    /// A video was persisted and is ready for downstream processing.
    VideoUploaded { video_id: i64 },
    /// A copy of a video was located at `url` with the given match score.
    PiracyFound { video_id: i64, url: String, score: f64 },
}

/// Encoding used when writing frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameFormat {
    #[default]
    Json,
    Legacy,
}

impl FromStr for FrameFormat {
    type Err = MarineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "legacy" | "text" => Ok(Self::Legacy),
            other => Err(MarineError::Validation(format!(
                "Unknown frame format '{}'. Expected 'json' or 'legacy'",
                other
            ))),
        }
    }
}

impl DetectionEvent {
    /// Video the event refers to.
    pub fn video_id(&self) -> i64 {
        match self {
            Self::VideoUploaded { video_id } | Self::PiracyFound { video_id, .. } => *video_id,
        }
    }

    /// Encode the event for the broker.
    pub fn encode(&self, format: FrameFormat) -> String {
        match format {
            // Serializing a plain enum of numbers and strings cannot fail.
            FrameFormat::Json => serde_json::to_string(self).unwrap_or_default(),
            FrameFormat::Legacy => self.to_string(),
        }
    }

    /// Decode a broker frame, treating unrecognized frames as parse failures.
    pub fn decode(frame: &str) -> Result<Self> {
        Self::try_decode(frame)?.ok_or_else(|| {
            MarineError::Parse(format!("Unrecognized frame: {}", truncate(frame, 64)))
        })
    }

    /// Like [`decode`](Self::decode), but distinguishes unrecognized frames
    /// (`Ok(None)`) from malformed recognized frames (`Err`). Frames that are
    /// neither JSON events nor carry a known prefix belong to other producers
    /// on the topic.
    pub fn try_decode(frame: &str) -> Result<Option<Self>> {
        let frame = frame.trim();

        if frame.starts_with('{') {
            let event: Self = serde_json::from_str(frame)
                .map_err(|e| MarineError::Parse(format!("Invalid JSON frame: {}", e)))?;
            return event.validated().map(Some);
        }

        if let Some(rest) = frame.strip_prefix(PIRACY_FOUND_PREFIX) {
            return parse_piracy_found(rest).map(Some);
        }

        if let Some(rest) = frame.strip_prefix(VIDEO_UPLOADED_PREFIX) {
            let video_id = parse_video_id(rest)?;
            return Ok(Some(Self::VideoUploaded { video_id }));
        }

        Ok(None)
    }

    fn validated(self) -> Result<Self> {
        if let Self::PiracyFound { url, score, .. } = &self {
            validate_url(url)?;
            validate_score(*score)?;
        }
        Ok(self)
    }
}

impl fmt::Display for DetectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VideoUploaded { video_id } => write!(f, "{}{}", VIDEO_UPLOADED_PREFIX, video_id),
            Self::PiracyFound {
                video_id,
                url,
                score,
            } => write!(f, "{}{}:{}:{}", PIRACY_FOUND_PREFIX, video_id, url, score),
        }
    }
}

/// `<id>:<url>:<score>`. A URL ending in `:<port>` with the score missing
/// reads as a valid frame; see the module docs.
fn parse_piracy_found(rest: &str) -> Result<DetectionEvent> {
    let (id_part, tail) = rest
        .split_once(':')
        .ok_or_else(|| MarineError::Parse("Expected 3 fields, found 1".into()))?;
    let (url, score_part) = tail
        .rsplit_once(':')
        .ok_or_else(|| MarineError::Parse("Expected 3 fields, found 2".into()))?;

    let video_id = parse_video_id(id_part)?;
    let score: f64 = score_part
        .trim()
        .parse()
        .map_err(|_| MarineError::Parse(format!("Invalid match score '{}'", score_part)))?;

    validate_url(url)?;
    validate_score(score)?;

    Ok(DetectionEvent::PiracyFound {
        video_id,
        url: url.to_string(),
        score,
    })
}

fn parse_video_id(raw: &str) -> Result<i64> {
    raw.trim()
        .parse()
        .map_err(|_| MarineError::Parse(format!("Invalid video id '{}'", raw)))
}

fn validate_url(url: &str) -> Result<()> {
    if url.trim().is_empty() {
        return Err(MarineError::Parse("Empty piracy URL".into()));
    }
    Ok(())
}

fn validate_score(score: f64) -> Result<()> {
    if !score.is_finite() || !SCORE_RANGE.contains(&score) {
        return Err(MarineError::Parse(format!(
            "Match score {} outside [0, 100]",
            score
        )));
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
