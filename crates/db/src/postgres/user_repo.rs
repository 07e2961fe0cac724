//! Repository for the `users` table.

use sqlx::PgPool;

use labelpizza_core::records::{UserRecord, UserType};
use labelpizza_core::EntityKey;

use crate::error::StoreError;

const COLUMNS: &str = "user_id, email, password, user_type, is_archived";

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: String,
    email: Option<String>,
    password: Option<String>,
    user_type: String,
    is_archived: bool,
}

impl UserRow {
    fn into_record(self) -> Result<UserRecord, StoreError> {
        let user_type = UserType::from_str(&self.user_type).ok_or_else(|| {
            StoreError::Decode(format!(
                "user '{}' has unknown user_type '{}'",
                self.user_id, self.user_type
            ))
        })?;
        Ok(UserRecord {
            user_id: self.user_id,
            email: self.email,
            password: self.password,
            user_type,
            is_archived: self.is_archived,
        })
    }
}

pub struct UserRepo;

impl UserRepo {
    pub async fn find_by_id(pool: &PgPool, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE user_id = $1");
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
        row.map(UserRow::into_record).transpose()
    }

    pub async fn find_by_email(
        pool: &PgPool,
        email: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await?;
        row.map(UserRow::into_record).transpose()
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<UserRecord>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM users ORDER BY user_id");
        let rows = sqlx::query_as::<_, UserRow>(&query).fetch_all(pool).await?;
        rows.into_iter().map(UserRow::into_record).collect()
    }

    pub async fn insert(pool: &PgPool, user: &UserRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO users (user_id, email, password, user_type, is_archived)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&user.user_id)
        .bind(&user.email)
        .bind(&user.password)
        .bind(user.user_type.as_str())
        .bind(user.is_archived)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn update(pool: &PgPool, user: &UserRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE users
             SET email = $2, password = $3, user_type = $4, is_archived = $5, updated_at = NOW()
             WHERE user_id = $1",
        )
        .bind(&user.user_id)
        .bind(&user.email)
        .bind(&user.password)
        .bind(user.user_type.as_str())
        .bind(user.is_archived)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "user",
                key: EntityKey::single(&user.user_id),
            });
        }
        Ok(())
    }
}
