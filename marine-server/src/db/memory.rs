//! In-memory store (development fallback and tests)
//!
//! Mirrors the relational contract of the PostgreSQL schema: sequential ids,
//! the video foreign key on piracy cases, the score range check and the
//! (video, url, score) uniqueness constraint.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use super::{InsertOutcome, NewPiracyCase, NewVideo, PiracyCase, Store, StoreError, Video};

#[derive(Default)]
struct Tables {
    videos: Vec<Video>,
    piracy_cases: Vec<PiracyCase>,
}

/// Volatile store backed by process memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored piracy cases.
    pub fn piracy_case_count(&self) -> usize {
        self.tables.read().piracy_cases.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_video(&self, input: NewVideo) -> Result<i64, StoreError> {
        let mut tables = self.tables.write();
        let id = tables.videos.len() as i64 + 1;
        tables.videos.push(Video {
            id,
            filename: input.filename,
            fingerprint: input.fingerprint,
            user_email: input.user_email,
            title: input.title,
            description: input.description,
            hash_vector: None,
            audio_spectrum: None,
            created_at: Utc::now(),
            flagged: false,
        });
        Ok(id)
    }

    async fn find_video(&self, id: i64) -> Result<Option<Video>, StoreError> {
        Ok(self
            .tables
            .read()
            .videos
            .iter()
            .find(|v| v.id == id)
            .cloned())
    }

    async fn list_videos_for_user(&self, user_email: &str) -> Result<Vec<Video>, StoreError> {
        Ok(self
            .tables
            .read()
            .videos
            .iter()
            .rev()
            .filter(|v| v.user_email.as_deref() == Some(user_email))
            .cloned()
            .collect())
    }

    async fn mark_flagged(&self, id: i64) -> Result<bool, StoreError> {
        let mut tables = self.tables.write();
        match tables.videos.iter_mut().find(|v| v.id == id) {
            Some(video) => {
                video.flagged = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_piracy_case(
        &self,
        input: NewPiracyCase,
    ) -> Result<InsertOutcome, StoreError> {
        if !(0.0..=100.0).contains(&input.match_score) {
            return Err(StoreError::Constraint(format!(
                "match_score {} outside [0, 100]",
                input.match_score
            )));
        }

        let mut tables = self.tables.write();

        if !tables.videos.iter().any(|v| v.id == input.video_id) {
            return Err(StoreError::Constraint(format!(
                "video {} does not exist",
                input.video_id
            )));
        }

        let duplicate = tables.piracy_cases.iter().any(|c| {
            c.video_id == input.video_id
                && c.piracy_url == input.piracy_url
                && c.match_score == input.match_score
        });
        if duplicate {
            return Ok(InsertOutcome::Duplicate);
        }

        let id = tables.piracy_cases.len() as i64 + 1;
        tables.piracy_cases.push(PiracyCase {
            id,
            video_id: input.video_id,
            piracy_url: input.piracy_url,
            match_score: input.match_score,
            detected_at: Utc::now(),
        });
        Ok(InsertOutcome::Inserted(id))
    }

    async fn list_piracy_cases(&self) -> Result<Vec<PiracyCase>, StoreError> {
        Ok(self.tables.read().piracy_cases.iter().rev().cloned().collect())
    }

    async fn check_health(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_video(name: &str) -> NewVideo {
        NewVideo {
            filename: name.to_string(),
            fingerprint: marine_core::fingerprint(name.as_bytes()),
            user_email: Some("owner@example.com".to_string()),
            ..Default::default()
        }
    }

    fn case(video_id: i64, url: &str, score: f64) -> NewPiracyCase {
        NewPiracyCase {
            video_id,
            piracy_url: url.to_string(),
            match_score: score,
        }
    }

    #[tokio::test]
    async fn test_video_ids_are_sequential() {
        let store = MemoryStore::new();
        assert_eq!(store.insert_video(new_video("a.mp4")).await.unwrap(), 1);
        assert_eq!(store.insert_video(new_video("b.mp4")).await.unwrap(), 2);

        let found = store.find_video(2).await.unwrap().unwrap();
        assert_eq!(found.filename, "b.mp4");
        assert!(!found.flagged);
    }

    #[tokio::test]
    async fn test_piracy_case_requires_existing_video() {
        let store = MemoryStore::new();
        let err = store
            .insert_piracy_case(case(99, "https://x.example", 90.0))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
        assert_eq!(store.piracy_case_count(), 0);
    }

    #[tokio::test]
    async fn test_identical_case_is_duplicate() {
        let store = MemoryStore::new();
        let id = store.insert_video(new_video("a.mp4")).await.unwrap();

        let first = store
            .insert_piracy_case(case(id, "https://x.example", 90.0))
            .await
            .unwrap();
        let second = store
            .insert_piracy_case(case(id, "https://x.example", 90.0))
            .await
            .unwrap();
        let other_score = store
            .insert_piracy_case(case(id, "https://x.example", 95.0))
            .await
            .unwrap();

        assert_eq!(first, InsertOutcome::Inserted(1));
        assert_eq!(second, InsertOutcome::Duplicate);
        assert_eq!(other_score, InsertOutcome::Inserted(2));
        assert_eq!(store.piracy_case_count(), 2);
    }

    #[tokio::test]
    async fn test_mark_flagged() {
        let store = MemoryStore::new();
        let id = store.insert_video(new_video("a.mp4")).await.unwrap();

        assert!(store.mark_flagged(id).await.unwrap());
        assert!(!store.mark_flagged(id + 1).await.unwrap());
        assert!(store.find_video(id).await.unwrap().unwrap().flagged);
    }

    #[tokio::test]
    async fn test_list_videos_for_user_newest_first() {
        let store = MemoryStore::new();
        store.insert_video(new_video("a.mp4")).await.unwrap();
        store
            .insert_video(NewVideo {
                user_email: Some("other@example.com".to_string()),
                ..new_video("b.mp4")
            })
            .await
            .unwrap();
        store.insert_video(new_video("c.mp4")).await.unwrap();

        let videos = store.list_videos_for_user("owner@example.com").await.unwrap();
        let names: Vec<_> = videos.iter().map(|v| v.filename.as_str()).collect();
        assert_eq!(names, vec!["c.mp4", "a.mp4"]);
    }
}
