use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::{optional_text, ServiceError, ServiceResult};
use crate::database::models::User;
use crate::middleware::AuthUser;

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(sqlx::FromRow)]
struct UpsertedUser {
    #[sqlx(flatten)]
    user: User,
    inserted: bool,
}

pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create or refresh the row for a token subject. Returns the user and
    /// whether it was created by this call.
    pub async fn upsert_from_auth(&self, auth: &AuthUser) -> ServiceResult<(User, bool)> {
        // xmax = 0 only for freshly inserted tuples
        let row = sqlx::query_as::<_, UpsertedUser>(
            r#"
            INSERT INTO users (auth_subject, email, first_name, last_name, image_url)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (auth_subject) DO UPDATE SET
                email = EXCLUDED.email,
                first_name = COALESCE(users.first_name, EXCLUDED.first_name),
                last_name = COALESCE(users.last_name, EXCLUDED.last_name),
                image_url = COALESCE(EXCLUDED.image_url, users.image_url),
                updated_at = CASE
                    WHEN users.email IS DISTINCT FROM EXCLUDED.email
                      OR users.image_url IS DISTINCT FROM COALESCE(EXCLUDED.image_url, users.image_url)
                    THEN NOW() ELSE users.updated_at END
            RETURNING *, (xmax = 0) AS inserted
            "#,
        )
        .bind(&auth.subject)
        .bind(&auth.email)
        .bind(&auth.first_name)
        .bind(&auth.last_name)
        .bind(&auth.image_url)
        .fetch_one(&self.pool)
        .await?;

        Ok((row.user, row.inserted))
    }

    pub async fn get(&self, user_id: Uuid) -> ServiceResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    pub async fn find_by_email(&self, email: &str) -> ServiceResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE email = $1 ORDER BY created_at LIMIT 1",
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn update_profile(&self, user_id: Uuid, update: &UpdateProfile) -> ServiceResult<User> {
        let first_name = optional_text("first_name", update.first_name.as_deref(), 100)?;
        let last_name = optional_text("last_name", update.last_name.as_deref(), 100)?;

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(first_name)
        .bind(last_name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        Ok(user)
    }
}
