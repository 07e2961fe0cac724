//! Repository for the `schemas` table.

use sqlx::PgPool;

use labelpizza_core::records::SchemaRecord;
use labelpizza_core::EntityKey;

use crate::error::StoreError;

const COLUMNS: &str =
    "schema_name, question_group_titles, instructions_url, has_custom_display, is_archived";

#[derive(sqlx::FromRow)]
struct SchemaRow {
    schema_name: String,
    question_group_titles: Vec<String>,
    instructions_url: Option<String>,
    has_custom_display: bool,
    is_archived: bool,
}

impl SchemaRow {
    fn into_record(self) -> SchemaRecord {
        SchemaRecord {
            schema_name: self.schema_name,
            question_group_names: self.question_group_titles,
            instructions_url: self.instructions_url,
            has_custom_display: self.has_custom_display,
            is_archived: self.is_archived,
        }
    }
}

pub struct SchemaRepo;

impl SchemaRepo {
    pub async fn find_by_name(
        pool: &PgPool,
        schema_name: &str,
    ) -> Result<Option<SchemaRecord>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM schemas WHERE schema_name = $1");
        let row = sqlx::query_as::<_, SchemaRow>(&query)
            .bind(schema_name)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(SchemaRow::into_record))
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<SchemaRecord>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM schemas ORDER BY schema_name");
        let rows = sqlx::query_as::<_, SchemaRow>(&query).fetch_all(pool).await?;
        Ok(rows.into_iter().map(SchemaRow::into_record).collect())
    }

    pub async fn insert(pool: &PgPool, schema: &SchemaRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO schemas
                 (schema_name, question_group_titles, instructions_url, has_custom_display,
                  is_archived)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&schema.schema_name)
        .bind(&schema.question_group_names)
        .bind(&schema.instructions_url)
        .bind(schema.has_custom_display)
        .bind(schema.is_archived)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn update(pool: &PgPool, schema: &SchemaRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE schemas
             SET question_group_titles = $2, instructions_url = $3, has_custom_display = $4,
                 is_archived = $5, updated_at = NOW()
             WHERE schema_name = $1",
        )
        .bind(&schema.schema_name)
        .bind(&schema.question_group_names)
        .bind(&schema.instructions_url)
        .bind(schema.has_custom_display)
        .bind(schema.is_archived)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "schema",
                key: EntityKey::single(&schema.schema_name),
            });
        }
        Ok(())
    }
}
