//! Repositories for the `annotations` and `ground_truths` tables.

use sqlx::PgPool;

use labelpizza_core::EntityKey;

use crate::error::StoreError;
use crate::store::{AnnotationRow, GroundTruthRow};

// ---------------------------------------------------------------------------
// Annotations
// ---------------------------------------------------------------------------

const ANNOTATION_COLUMNS: &str =
    "video_uid, project_name, user_id, question_text, answer, confidence, note";

#[derive(sqlx::FromRow)]
struct AnnotationDbRow {
    video_uid: String,
    project_name: String,
    user_id: String,
    question_text: String,
    answer: String,
    confidence: Option<f64>,
    note: Option<String>,
}

impl AnnotationDbRow {
    fn into_row(self) -> AnnotationRow {
        AnnotationRow {
            video_uid: self.video_uid,
            project_name: self.project_name,
            user_id: self.user_id,
            question_text: self.question_text,
            answer: self.answer,
            confidence: self.confidence,
            note: self.note,
        }
    }
}

pub struct AnnotationRepo;

impl AnnotationRepo {
    pub async fn find(
        pool: &PgPool,
        video_uid: &str,
        project_name: &str,
        user_id: &str,
        question_text: &str,
    ) -> Result<Option<AnnotationRow>, StoreError> {
        let query = format!(
            "SELECT {ANNOTATION_COLUMNS} FROM annotations
             WHERE video_uid = $1 AND project_name = $2 AND user_id = $3 AND question_text = $4"
        );
        let row = sqlx::query_as::<_, AnnotationDbRow>(&query)
            .bind(video_uid)
            .bind(project_name)
            .bind(user_id)
            .bind(question_text)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(AnnotationDbRow::into_row))
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<AnnotationRow>, StoreError> {
        let query = format!(
            "SELECT {ANNOTATION_COLUMNS} FROM annotations
             ORDER BY video_uid, project_name, user_id, question_text"
        );
        let rows = sqlx::query_as::<_, AnnotationDbRow>(&query)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(AnnotationDbRow::into_row).collect())
    }

    pub async fn insert(pool: &PgPool, row: &AnnotationRow) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO annotations
                 (video_uid, project_name, user_id, question_text, answer, confidence, note)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&row.video_uid)
        .bind(&row.project_name)
        .bind(&row.user_id)
        .bind(&row.question_text)
        .bind(&row.answer)
        .bind(row.confidence)
        .bind(&row.note)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn update(pool: &PgPool, row: &AnnotationRow) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE annotations
             SET answer = $5, confidence = $6, note = $7, updated_at = NOW()
             WHERE video_uid = $1 AND project_name = $2 AND user_id = $3 AND question_text = $4",
        )
        .bind(&row.video_uid)
        .bind(&row.project_name)
        .bind(&row.user_id)
        .bind(&row.question_text)
        .bind(&row.answer)
        .bind(row.confidence)
        .bind(&row.note)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "annotation",
                key: EntityKey::composite(&[
                    &row.video_uid,
                    &row.user_id,
                    &row.question_text,
                    &row.project_name,
                ]),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Ground truths
// ---------------------------------------------------------------------------

const GT_COLUMNS: &str = "video_uid, project_name, question_text, answer, confidence, note, \
                          submitted_by, admin_user_id, admin_modified_at";

#[derive(sqlx::FromRow)]
struct GroundTruthDbRow {
    video_uid: String,
    project_name: String,
    question_text: String,
    answer: String,
    confidence: Option<f64>,
    note: Option<String>,
    submitted_by: String,
    admin_user_id: Option<String>,
    admin_modified_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl GroundTruthDbRow {
    fn into_row(self) -> GroundTruthRow {
        GroundTruthRow {
            video_uid: self.video_uid,
            project_name: self.project_name,
            question_text: self.question_text,
            answer: self.answer,
            confidence: self.confidence,
            note: self.note,
            submitted_by: self.submitted_by,
            admin_user_id: self.admin_user_id,
            admin_modified_at: self.admin_modified_at,
        }
    }
}

pub struct GroundTruthRepo;

impl GroundTruthRepo {
    pub async fn find(
        pool: &PgPool,
        video_uid: &str,
        project_name: &str,
        question_text: &str,
    ) -> Result<Option<GroundTruthRow>, StoreError> {
        let query = format!(
            "SELECT {GT_COLUMNS} FROM ground_truths
             WHERE video_uid = $1 AND project_name = $2 AND question_text = $3"
        );
        let row = sqlx::query_as::<_, GroundTruthDbRow>(&query)
            .bind(video_uid)
            .bind(project_name)
            .bind(question_text)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(GroundTruthDbRow::into_row))
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<GroundTruthRow>, StoreError> {
        let query = format!(
            "SELECT {GT_COLUMNS} FROM ground_truths
             ORDER BY video_uid, project_name, question_text"
        );
        let rows = sqlx::query_as::<_, GroundTruthDbRow>(&query)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(GroundTruthDbRow::into_row).collect())
    }

    pub async fn insert(pool: &PgPool, row: &GroundTruthRow) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO ground_truths
                 (video_uid, project_name, question_text, answer, confidence, note,
                  submitted_by, admin_user_id, admin_modified_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(&row.video_uid)
        .bind(&row.project_name)
        .bind(&row.question_text)
        .bind(&row.answer)
        .bind(row.confidence)
        .bind(&row.note)
        .bind(&row.submitted_by)
        .bind(&row.admin_user_id)
        .bind(row.admin_modified_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn update(pool: &PgPool, row: &GroundTruthRow) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE ground_truths
             SET answer = $4, confidence = $5, note = $6, submitted_by = $7,
                 admin_user_id = $8, admin_modified_at = $9, updated_at = NOW()
             WHERE video_uid = $1 AND project_name = $2 AND question_text = $3",
        )
        .bind(&row.video_uid)
        .bind(&row.project_name)
        .bind(&row.question_text)
        .bind(&row.answer)
        .bind(row.confidence)
        .bind(&row.note)
        .bind(&row.submitted_by)
        .bind(&row.admin_user_id)
        .bind(row.admin_modified_at)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "ground_truth",
                key: EntityKey::composite(&[&row.video_uid, &row.question_text, &row.project_name]),
            });
        }
        Ok(())
    }
}
