use crate::models::{StoredObject, VideoRecord};
use async_trait::async_trait;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Metadata store for video records.
///
/// Writes touch a single field and return the row as stored afterwards, so
/// concurrent video and thumbnail uploads never overwrite each other.
#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn create(&self, video: &VideoRecord) -> DatabaseResult<()>;

    async fn get(&self, id: Uuid) -> DatabaseResult<Option<VideoRecord>>;

    /// Record where the processed video was uploaded.
    async fn set_video(&self, id: Uuid, object: &StoredObject) -> DatabaseResult<VideoRecord>;

    async fn set_thumbnail(&self, id: Uuid, url: &str) -> DatabaseResult<VideoRecord>;
}

const VIDEO_COLUMNS: &str = "id, user_id, title, description, thumbnail_url, video_bucket, video_key, created_at, updated_at";

/// PostgreSQL-backed [`VideoStore`].
#[derive(Clone)]
pub struct VideoRepository {
    pool: PgPool,
}

impl VideoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn from_row(row: &PgRow) -> VideoRecord {
        let bucket: Option<String> = row.get("video_bucket");
        let key: Option<String> = row.get("video_key");

        VideoRecord {
            id: row.get("id"),
            user_id: row.get("user_id"),
            title: row.get("title"),
            description: row.get("description"),
            thumbnail_url: row.get("thumbnail_url"),
            video: bucket
                .zip(key)
                .map(|(bucket, key)| StoredObject { bucket, key }),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl VideoStore for VideoRepository {
    async fn create(&self, video: &VideoRecord) -> DatabaseResult<()> {
        sqlx::query(
            "INSERT INTO videos (id, user_id, title, description, thumbnail_url, video_bucket, video_key, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(video.id)
        .bind(video.user_id)
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.thumbnail_url)
        .bind(video.video.as_ref().map(|o| o.bucket.as_str()))
        .bind(video.video.as_ref().map(|o| o.key.as_str()))
        .bind(video.created_at)
        .bind(video.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DatabaseResult<Option<VideoRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {VIDEO_COLUMNS}
             FROM videos
             WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(row.as_ref().map(Self::from_row))
    }

    async fn set_video(&self, id: Uuid, object: &StoredObject) -> DatabaseResult<VideoRecord> {
        let row = sqlx::query(&format!(
            "UPDATE videos SET video_bucket = $2, video_key = $3, updated_at = NOW()
             WHERE id = $1
             RETURNING {VIDEO_COLUMNS}"
        ))
        .bind(id)
        .bind(&object.bucket)
        .bind(&object.key)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        row.as_ref()
            .map(Self::from_row)
            .ok_or_else(|| DatabaseError::NotFound(format!("video {id}")))
    }

    async fn set_thumbnail(&self, id: Uuid, url: &str) -> DatabaseResult<VideoRecord> {
        let row = sqlx::query(&format!(
            "UPDATE videos SET thumbnail_url = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {VIDEO_COLUMNS}"
        ))
        .bind(id)
        .bind(url)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        row.as_ref()
            .map(Self::from_row)
            .ok_or_else(|| DatabaseError::NotFound(format!("video {id}")))
    }
}
