//! Repository for the `assignments` table.
//!
//! Assignments delete on deactivation instead of archiving, so this repo has
//! a `remove` where the others stop at `update`.

use sqlx::PgPool;

use labelpizza_core::records::{AssignmentRecord, AssignmentRole};
use labelpizza_core::EntityKey;

use crate::error::StoreError;

const COLUMNS: &str = "user_id, project_name, role, user_weight";

#[derive(sqlx::FromRow)]
struct AssignmentDbRow {
    user_id: String,
    project_name: String,
    role: String,
    user_weight: f64,
}

impl AssignmentDbRow {
    fn into_record(self) -> Result<AssignmentRecord, StoreError> {
        let role = AssignmentRole::from_str(&self.role).ok_or_else(|| {
            StoreError::Decode(format!(
                "assignment ({}, {}) has unknown role '{}'",
                self.user_id, self.project_name, self.role
            ))
        })?;
        Ok(AssignmentRecord {
            user_name: self.user_id,
            project_name: self.project_name,
            role,
            user_weight: Some(self.user_weight),
            is_active: true,
        })
    }
}

pub struct AssignmentRepo;

impl AssignmentRepo {
    pub async fn find(
        pool: &PgPool,
        user_id: &str,
        project_name: &str,
        role: AssignmentRole,
    ) -> Result<Option<AssignmentRecord>, StoreError> {
        let query = format!(
            "SELECT {COLUMNS} FROM assignments
             WHERE user_id = $1 AND project_name = $2 AND role = $3"
        );
        let row = sqlx::query_as::<_, AssignmentDbRow>(&query)
            .bind(user_id)
            .bind(project_name)
            .bind(role.as_str())
            .fetch_optional(pool)
            .await?;
        row.map(AssignmentDbRow::into_record).transpose()
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<AssignmentRecord>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM assignments ORDER BY user_id, project_name, role");
        let rows = sqlx::query_as::<_, AssignmentDbRow>(&query)
            .fetch_all(pool)
            .await?;
        rows.into_iter().map(AssignmentDbRow::into_record).collect()
    }

    pub async fn insert(pool: &PgPool, assignment: &AssignmentRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO assignments (user_id, project_name, role, user_weight)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&assignment.user_name)
        .bind(&assignment.project_name)
        .bind(assignment.role.as_str())
        .bind(assignment.effective_weight())
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn update(pool: &PgPool, assignment: &AssignmentRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE assignments
             SET user_weight = $4, updated_at = NOW()
             WHERE user_id = $1 AND project_name = $2 AND role = $3",
        )
        .bind(&assignment.user_name)
        .bind(&assignment.project_name)
        .bind(assignment.role.as_str())
        .bind(assignment.effective_weight())
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "assignment",
                key: assignment.natural_key(),
            });
        }
        Ok(())
    }

    pub async fn remove(
        pool: &PgPool,
        user_id: &str,
        project_name: &str,
        role: AssignmentRole,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "DELETE FROM assignments WHERE user_id = $1 AND project_name = $2 AND role = $3",
        )
        .bind(user_id)
        .bind(project_name)
        .bind(role.as_str())
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "assignment",
                key: EntityKey::composite(&[user_id, project_name, role.as_str()]),
            });
        }
        Ok(())
    }
}
