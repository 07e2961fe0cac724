//! Repository for the `videos` table.

use sqlx::PgPool;

use labelpizza_core::records::VideoRecord;
use labelpizza_core::EntityKey;

use crate::error::StoreError;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "video_uid, url, metadata, is_archived";

#[derive(sqlx::FromRow)]
struct VideoRow {
    video_uid: String,
    url: String,
    metadata: serde_json::Value,
    is_archived: bool,
}

impl VideoRow {
    fn into_record(self) -> VideoRecord {
        VideoRecord {
            video_uid: self.video_uid,
            url: self.url,
            metadata: self.metadata,
            is_archived: self.is_archived,
        }
    }
}

pub struct VideoRepo;

impl VideoRepo {
    pub async fn find_by_uid(
        pool: &PgPool,
        video_uid: &str,
    ) -> Result<Option<VideoRecord>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM videos WHERE video_uid = $1");
        let row = sqlx::query_as::<_, VideoRow>(&query)
            .bind(video_uid)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(VideoRow::into_record))
    }

    pub async fn find_by_url(pool: &PgPool, url: &str) -> Result<Option<VideoRecord>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM videos WHERE url = $1");
        let row = sqlx::query_as::<_, VideoRow>(&query)
            .bind(url)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(VideoRow::into_record))
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<VideoRecord>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM videos ORDER BY video_uid");
        let rows = sqlx::query_as::<_, VideoRow>(&query).fetch_all(pool).await?;
        Ok(rows.into_iter().map(VideoRow::into_record).collect())
    }

    pub async fn insert(pool: &PgPool, video: &VideoRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO videos (video_uid, url, metadata, is_archived)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&video.video_uid)
        .bind(&video.url)
        .bind(&video.metadata)
        .bind(video.is_archived)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn update(pool: &PgPool, video: &VideoRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE videos
             SET url = $2, metadata = $3, is_archived = $4, updated_at = NOW()
             WHERE video_uid = $1",
        )
        .bind(&video.video_uid)
        .bind(&video.url)
        .bind(&video.metadata)
        .bind(video.is_archived)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "video",
                key: EntityKey::single(&video.video_uid),
            });
        }
        Ok(())
    }
}
