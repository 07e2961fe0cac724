//! Repositories for the `projects` and `project_groups` tables.
//!
//! Custom display entries are stored denormalized as a JSONB array on the
//! project row; the sync layer reconciles them entry by entry.

use sqlx::PgPool;

use labelpizza_core::records::{CustomDisplayRecord, ProjectGroupRecord, ProjectRecord};
use labelpizza_core::EntityKey;

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

const PROJECT_COLUMNS: &str =
    "project_name, schema_name, description, video_uids, is_archived, custom_displays";

#[derive(sqlx::FromRow)]
struct ProjectRow {
    project_name: String,
    schema_name: String,
    description: Option<String>,
    video_uids: Vec<String>,
    is_archived: bool,
    custom_displays: Option<serde_json::Value>,
}

impl ProjectRow {
    fn into_record(self) -> Result<ProjectRecord, StoreError> {
        let custom_displays = self
            .custom_displays
            .map(serde_json::from_value::<Vec<CustomDisplayRecord>>)
            .transpose()?;
        Ok(ProjectRecord {
            project_name: self.project_name,
            schema_name: self.schema_name,
            description: self.description,
            videos: self.video_uids,
            is_archived: self.is_archived,
            custom_displays,
        })
    }
}

fn displays_to_json(
    displays: &Option<Vec<CustomDisplayRecord>>,
) -> Result<Option<serde_json::Value>, StoreError> {
    displays
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(StoreError::from)
}

pub struct ProjectRepo;

impl ProjectRepo {
    pub async fn find_by_name(
        pool: &PgPool,
        project_name: &str,
    ) -> Result<Option<ProjectRecord>, StoreError> {
        let query = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE project_name = $1");
        let row = sqlx::query_as::<_, ProjectRow>(&query)
            .bind(project_name)
            .fetch_optional(pool)
            .await?;
        row.map(ProjectRow::into_record).transpose()
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<ProjectRecord>, StoreError> {
        let query = format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY project_name");
        let rows = sqlx::query_as::<_, ProjectRow>(&query).fetch_all(pool).await?;
        rows.into_iter().map(ProjectRow::into_record).collect()
    }

    pub async fn insert(pool: &PgPool, project: &ProjectRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO projects
                 (project_name, schema_name, description, video_uids, is_archived, custom_displays)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&project.project_name)
        .bind(&project.schema_name)
        .bind(&project.description)
        .bind(&project.videos)
        .bind(project.is_archived)
        .bind(displays_to_json(&project.custom_displays)?)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn update(pool: &PgPool, project: &ProjectRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE projects
             SET schema_name = $2, description = $3, video_uids = $4, is_archived = $5,
                 custom_displays = $6, updated_at = NOW()
             WHERE project_name = $1",
        )
        .bind(&project.project_name)
        .bind(&project.schema_name)
        .bind(&project.description)
        .bind(&project.videos)
        .bind(project.is_archived)
        .bind(displays_to_json(&project.custom_displays)?)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "project",
                key: EntityKey::single(&project.project_name),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Project groups
// ---------------------------------------------------------------------------

const GROUP_COLUMNS: &str = "project_group_name, description, project_names";

#[derive(sqlx::FromRow)]
struct ProjectGroupRow {
    project_group_name: String,
    description: Option<String>,
    project_names: Vec<String>,
}

impl ProjectGroupRow {
    fn into_record(self) -> ProjectGroupRecord {
        ProjectGroupRecord {
            project_group_name: self.project_group_name,
            description: self.description,
            projects: self.project_names,
        }
    }
}

pub struct ProjectGroupRepo;

impl ProjectGroupRepo {
    pub async fn find_by_name(
        pool: &PgPool,
        name: &str,
    ) -> Result<Option<ProjectGroupRecord>, StoreError> {
        let query = format!("SELECT {GROUP_COLUMNS} FROM project_groups WHERE project_group_name = $1");
        let row = sqlx::query_as::<_, ProjectGroupRow>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(ProjectGroupRow::into_record))
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<ProjectGroupRecord>, StoreError> {
        let query = format!("SELECT {GROUP_COLUMNS} FROM project_groups ORDER BY project_group_name");
        let rows = sqlx::query_as::<_, ProjectGroupRow>(&query)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(ProjectGroupRow::into_record).collect())
    }

    pub async fn insert(pool: &PgPool, group: &ProjectGroupRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO project_groups (project_group_name, description, project_names)
             VALUES ($1, $2, $3)",
        )
        .bind(&group.project_group_name)
        .bind(&group.description)
        .bind(&group.projects)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn update(pool: &PgPool, group: &ProjectGroupRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE project_groups
             SET description = $2, project_names = $3, updated_at = NOW()
             WHERE project_group_name = $1",
        )
        .bind(&group.project_group_name)
        .bind(&group.description)
        .bind(&group.projects)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "project_group",
                key: EntityKey::single(&group.project_group_name),
            });
        }
        Ok(())
    }
}
