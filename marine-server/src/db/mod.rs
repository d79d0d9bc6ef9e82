//! Database module for Marine Server
//!
//! Contains entities, the [`Store`] contract and its backends:
//! - **PostgreSQL** (production): every statement autocommits on a shared pool.
//! - **Memory** (development fallback and tests): same relational contract,
//!   lost on restart.

pub mod memory;
pub mod piracy_case;
pub mod postgres;
pub mod video;

pub use memory::MemoryStore;
pub use piracy_case::{InsertOutcome, NewPiracyCase, PiracyCase, PiracyCaseRecord};
pub use postgres::PgStore;
pub use video::{NewVideo, Video, VideoRecord};

use async_trait::async_trait;

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database migration error: {0}")]
    Migration(String),

    #[error("Query error: {0}")]
    Query(String),

    /// A relational constraint rejected the statement (e.g. unknown video id)
    #[error("Constraint violation: {0}")]
    Constraint(String),
}

impl StoreError {
    /// Whether repeating the same statement later could succeed.
    ///
    /// Constraint violations are permanent for a given input.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Query(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        // 23503 = foreign_key_violation, 23514 = check_violation
        let constraint_code = e
            .as_database_error()
            .and_then(|db| db.code())
            .map(|code| code == "23503" || code == "23514")
            .unwrap_or(false);

        if constraint_code {
            Self::Constraint(e.to_string())
        } else {
            Self::Query(e.to_string())
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        Self::Migration(e.to_string())
    }
}

impl From<StoreError> for marine_core::MarineError {
    fn from(e: StoreError) -> Self {
        Self::Persistence(e.to_string())
    }
}

/// Relational contract for videos and piracy cases.
///
/// Implementations must be safe to share across tasks; no operation spans
/// more than one statement.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a video and return its generated id.
    async fn insert_video(&self, input: NewVideo) -> Result<i64, StoreError>;

    async fn find_video(&self, id: i64) -> Result<Option<Video>, StoreError>;

    /// Videos uploaded by a user, newest first.
    async fn list_videos_for_user(&self, user_email: &str) -> Result<Vec<Video>, StoreError>;

    /// Set the `flagged` column. Returns false when the video does not exist.
    async fn mark_flagged(&self, id: i64) -> Result<bool, StoreError>;

    /// Append a piracy case. An identical (video, url, score) row already
    /// present yields [`InsertOutcome::Duplicate`] instead of a second row.
    async fn insert_piracy_case(&self, input: NewPiracyCase)
        -> Result<InsertOutcome, StoreError>;

    /// All piracy cases, newest first.
    async fn list_piracy_cases(&self) -> Result<Vec<PiracyCase>, StoreError>;

    /// Check backend health (always Ok for memory backend)
    async fn check_health(&self) -> Result<(), StoreError>;
}
