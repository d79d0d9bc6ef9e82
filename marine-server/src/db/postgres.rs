//! PostgreSQL implementation of the store.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::{InsertOutcome, NewPiracyCase, NewVideo, PiracyCase, Store, StoreError, Video};

/// PostgreSQL-backed store over a shared connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to the database and apply pending migrations.
    pub async fn connect(
        database_url: &str,
        min_connections: u32,
        max_connections: u32,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .min_connections(min_connections)
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::info!(
            min_connections,
            max_connections,
            "Database connected and migrations applied"
        );

        Ok(Self { pool })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_video(&self, input: NewVideo) -> Result<i64, StoreError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO videos (filename, fingerprint, user_email, title, description)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&input.filename)
        .bind(&input.fingerprint)
        .bind(&input.user_email)
        .bind(&input.title)
        .bind(&input.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn find_video(&self, id: i64) -> Result<Option<Video>, StoreError> {
        let video = sqlx::query_as::<_, Video>(
            r#"
            SELECT id, filename, fingerprint, user_email, title, description,
                   hash_vector, audio_spectrum, created_at, flagged
            FROM videos
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(video)
    }

    async fn list_videos_for_user(&self, user_email: &str) -> Result<Vec<Video>, StoreError> {
        let videos = sqlx::query_as::<_, Video>(
            r#"
            SELECT id, filename, fingerprint, user_email, title, description,
                   hash_vector, audio_spectrum, created_at, flagged
            FROM videos
            WHERE user_email = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_email)
        .fetch_all(&self.pool)
        .await?;

        Ok(videos)
    }

    async fn mark_flagged(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE videos SET flagged = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_piracy_case(
        &self,
        input: NewPiracyCase,
    ) -> Result<InsertOutcome, StoreError> {
        let id: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO piracy_cases (video_id, piracy_url, match_score)
            VALUES ($1, $2, $3)
            ON CONFLICT ON CONSTRAINT uq_piracy_cases_detection DO NOTHING
            RETURNING id
            "#,
        )
        .bind(input.video_id)
        .bind(&input.piracy_url)
        .bind(input.match_score)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match id {
            Some(id) => InsertOutcome::Inserted(id),
            None => InsertOutcome::Duplicate,
        })
    }

    async fn list_piracy_cases(&self) -> Result<Vec<PiracyCase>, StoreError> {
        let cases = sqlx::query_as::<_, PiracyCase>(
            r#"
            SELECT id, video_id, piracy_url, match_score, detected_at
            FROM piracy_cases
            ORDER BY detected_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(cases)
    }

    async fn check_health(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
