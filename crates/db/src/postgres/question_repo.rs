//! Repositories for the `questions` and `question_groups` tables.
//!
//! Questions are stored once, globally, keyed by text; groups hold the
//! ordered member texts. Reassembly into a full group record happens in the
//! sync layer, which needs the individual questions anyway.

use sqlx::PgPool;

use labelpizza_core::records::{QuestionRecord, QuestionType};
use labelpizza_core::EntityKey;

use crate::error::StoreError;
use crate::store::QuestionGroupRow;

// ---------------------------------------------------------------------------
// Questions
// ---------------------------------------------------------------------------

const QUESTION_COLUMNS: &str =
    "text, qtype, options, display_values, option_weights, default_option, display_text";

#[derive(sqlx::FromRow)]
struct QuestionDbRow {
    text: String,
    qtype: String,
    options: Vec<String>,
    display_values: Option<Vec<String>>,
    option_weights: Option<Vec<f64>>,
    default_option: Option<String>,
    display_text: Option<String>,
}

impl QuestionDbRow {
    fn into_record(self) -> Result<QuestionRecord, StoreError> {
        let qtype = QuestionType::from_str(&self.qtype).ok_or_else(|| {
            StoreError::Decode(format!(
                "question '{}' has unknown qtype '{}'",
                self.text, self.qtype
            ))
        })?;
        Ok(QuestionRecord {
            text: self.text,
            qtype,
            options: self.options,
            display_values: self.display_values,
            option_weights: self.option_weights,
            default_option: self.default_option,
            display_text: self.display_text,
        })
    }
}

pub struct QuestionRepo;

impl QuestionRepo {
    pub async fn find_by_text(
        pool: &PgPool,
        text: &str,
    ) -> Result<Option<QuestionRecord>, StoreError> {
        let query = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE text = $1");
        let row = sqlx::query_as::<_, QuestionDbRow>(&query)
            .bind(text)
            .fetch_optional(pool)
            .await?;
        row.map(QuestionDbRow::into_record).transpose()
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<QuestionRecord>, StoreError> {
        let query = format!("SELECT {QUESTION_COLUMNS} FROM questions ORDER BY text");
        let rows = sqlx::query_as::<_, QuestionDbRow>(&query)
            .fetch_all(pool)
            .await?;
        rows.into_iter().map(QuestionDbRow::into_record).collect()
    }

    pub async fn insert(pool: &PgPool, question: &QuestionRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO questions
                 (text, qtype, options, display_values, option_weights, default_option, display_text)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&question.text)
        .bind(question.qtype.as_str())
        .bind(&question.options)
        .bind(&question.display_values)
        .bind(&question.option_weights)
        .bind(&question.default_option)
        .bind(&question.display_text)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn update(pool: &PgPool, question: &QuestionRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE questions
             SET qtype = $2, options = $3, display_values = $4, option_weights = $5,
                 default_option = $6, display_text = $7, updated_at = NOW()
             WHERE text = $1",
        )
        .bind(&question.text)
        .bind(question.qtype.as_str())
        .bind(&question.options)
        .bind(&question.display_values)
        .bind(&question.option_weights)
        .bind(&question.default_option)
        .bind(&question.display_text)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "question",
                key: EntityKey::single(&question.text),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Question groups
// ---------------------------------------------------------------------------

const GROUP_COLUMNS: &str = "title, display_title, description, is_reusable, is_auto_submit, \
                             verification_function, question_texts";

#[derive(sqlx::FromRow)]
struct QuestionGroupDbRow {
    title: String,
    display_title: Option<String>,
    description: Option<String>,
    is_reusable: bool,
    is_auto_submit: bool,
    verification_function: Option<String>,
    question_texts: Vec<String>,
}

impl QuestionGroupDbRow {
    fn into_row(self) -> QuestionGroupRow {
        QuestionGroupRow {
            title: self.title,
            display_title: self.display_title,
            description: self.description,
            is_reusable: self.is_reusable,
            is_auto_submit: self.is_auto_submit,
            verification_function: self.verification_function,
            question_texts: self.question_texts,
        }
    }
}

pub struct QuestionGroupRepo;

impl QuestionGroupRepo {
    pub async fn find_by_title(
        pool: &PgPool,
        title: &str,
    ) -> Result<Option<QuestionGroupRow>, StoreError> {
        let query = format!("SELECT {GROUP_COLUMNS} FROM question_groups WHERE title = $1");
        let row = sqlx::query_as::<_, QuestionGroupDbRow>(&query)
            .bind(title)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(QuestionGroupDbRow::into_row))
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<QuestionGroupRow>, StoreError> {
        let query = format!("SELECT {GROUP_COLUMNS} FROM question_groups ORDER BY title");
        let rows = sqlx::query_as::<_, QuestionGroupDbRow>(&query)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(QuestionGroupDbRow::into_row).collect())
    }

    pub async fn insert(pool: &PgPool, group: &QuestionGroupRow) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO question_groups
                 (title, display_title, description, is_reusable, is_auto_submit,
                  verification_function, question_texts)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&group.title)
        .bind(&group.display_title)
        .bind(&group.description)
        .bind(group.is_reusable)
        .bind(group.is_auto_submit)
        .bind(&group.verification_function)
        .bind(&group.question_texts)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn update(pool: &PgPool, group: &QuestionGroupRow) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE question_groups
             SET display_title = $2, description = $3, is_reusable = $4, is_auto_submit = $5,
                 verification_function = $6, question_texts = $7, updated_at = NOW()
             WHERE title = $1",
        )
        .bind(&group.title)
        .bind(&group.display_title)
        .bind(&group.description)
        .bind(group.is_reusable)
        .bind(group.is_auto_submit)
        .bind(&group.verification_function)
        .bind(&group.question_texts)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "question_group",
                key: EntityKey::single(&group.title),
            });
        }
        Ok(())
    }
}
