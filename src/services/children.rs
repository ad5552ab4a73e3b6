use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::access::{ensure_admin_retained, lock_admin_count, AccessService};
use super::{required_text, ServiceError, ServiceResult};
use crate::database::models::{Caregiver, Child, ChildWithRelation, RelationType, UserChildRelation};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateChild {
    pub name: String,
    pub relation_type: RelationType,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateChild {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRelation {
    pub relation_type: Option<RelationType>,
    pub is_administrator: Option<bool>,
}

pub struct ChildService {
    pool: PgPool,
}

impl ChildService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn access(&self) -> AccessService {
        AccessService::new(self.pool.clone())
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> ServiceResult<Vec<ChildWithRelation>> {
        let children = sqlx::query_as::<_, ChildWithRelation>(
            r#"
            SELECT c.id, c.name, c.created_by, c.created_at, c.updated_at,
                   r.relation_type, r.is_administrator
            FROM children c
            JOIN user_child_relations r ON r.child_id = c.id
            WHERE r.user_id = $1
            ORDER BY c.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(children)
    }

    /// The creator becomes the child's first administrator
    pub async fn create(&self, user_id: Uuid, input: &CreateChild) -> ServiceResult<ChildWithRelation> {
        let name = required_text("name", &input.name, 100)?;

        let mut tx = self.pool.begin().await?;

        let child = sqlx::query_as::<_, Child>(
            "INSERT INTO children (name, created_by) VALUES ($1, $2) RETURNING *",
        )
        .bind(&name)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let relation = sqlx::query_as::<_, UserChildRelation>(
            r#"
            INSERT INTO user_child_relations (user_id, child_id, relation_type, is_administrator)
            VALUES ($1, $2, $3, TRUE)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(child.id)
        .bind(input.relation_type)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!("User {} created child {}", user_id, child.id);
        Ok(with_relation(child, &relation))
    }

    pub async fn get(&self, user_id: Uuid, child_id: Uuid) -> ServiceResult<ChildWithRelation> {
        let relation = self.access().require_relation(user_id, child_id).await?;
        let child = self.fetch(child_id).await?;
        Ok(with_relation(child, &relation))
    }

    pub async fn rename(&self, user_id: Uuid, child_id: Uuid, input: &UpdateChild) -> ServiceResult<ChildWithRelation> {
        let relation = self.access().require_admin(user_id, child_id).await?;
        let name = required_text("name", &input.name, 100)?;

        let child = sqlx::query_as::<_, Child>(
            "UPDATE children SET name = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(child_id)
        .bind(&name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Child not found".to_string()))?;

        Ok(with_relation(child, &relation))
    }

    /// Removes the child and everything hanging off it
    pub async fn delete(&self, user_id: Uuid, child_id: Uuid) -> ServiceResult<()> {
        self.access().require_admin(user_id, child_id).await?;

        let mut tx = self.pool.begin().await?;

        // Access rows reference tools polymorphically, so no cascade reaches them
        sqlx::query(
            r#"
            DELETE FROM tool_user_access a
            WHERE (a.tool_kind = 'barometer' AND a.tool_id IN (SELECT id FROM barometers WHERE child_id = $1))
               OR (a.tool_kind = 'dagens_smiley' AND a.tool_id IN (SELECT id FROM dagens_smiley WHERE child_id = $1))
               OR (a.tool_kind = 'sengetider' AND a.tool_id IN (SELECT id FROM sengetider WHERE child_id = $1))
            "#,
        )
        .bind(child_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM children WHERE id = $1")
            .bind(child_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!("User {} deleted child {}", user_id, child_id);
        Ok(())
    }

    pub async fn caregivers(&self, user_id: Uuid, child_id: Uuid) -> ServiceResult<Vec<Caregiver>> {
        self.access().require_relation(user_id, child_id).await?;

        let caregivers = sqlx::query_as::<_, Caregiver>(
            r#"
            SELECT u.id AS user_id, u.email, u.first_name, u.last_name, u.image_url,
                   r.relation_type, r.is_administrator, r.created_at AS related_since
            FROM user_child_relations r
            JOIN users u ON u.id = r.user_id
            WHERE r.child_id = $1
            ORDER BY r.is_administrator DESC, r.created_at
            "#,
        )
        .bind(child_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(caregivers)
    }

    /// Change another caregiver's relation type or administrator flag
    pub async fn update_relation(
        &self,
        user_id: Uuid,
        child_id: Uuid,
        target_user_id: Uuid,
        input: &UpdateRelation,
    ) -> ServiceResult<UserChildRelation> {
        self.access().require_admin(user_id, child_id).await?;

        let mut tx = self.pool.begin().await?;
        let admin_count = lock_admin_count(&mut tx, child_id).await?;

        let target = fetch_relation(&mut tx, target_user_id, child_id).await?;
        let demoting = input.is_administrator == Some(false);
        ensure_admin_retained(admin_count, target.is_administrator, demoting)?;

        let updated = sqlx::query_as::<_, UserChildRelation>(
            r#"
            UPDATE user_child_relations
            SET relation_type = COALESCE($3, relation_type),
                is_administrator = COALESCE($4, is_administrator)
            WHERE user_id = $1 AND child_id = $2
            RETURNING *
            "#,
        )
        .bind(target_user_id)
        .bind(child_id)
        .bind(input.relation_type)
        .bind(input.is_administrator)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Administrators may remove anyone; other users only themselves
    pub async fn remove_relation(&self, user_id: Uuid, child_id: Uuid, target_user_id: Uuid) -> ServiceResult<()> {
        let caller = self.access().require_relation(user_id, child_id).await?;
        if target_user_id != user_id && !caller.is_administrator {
            return Err(ServiceError::Forbidden(
                "Only administrators can remove other users".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        let admin_count = lock_admin_count(&mut tx, child_id).await?;

        let target = fetch_relation(&mut tx, target_user_id, child_id).await?;
        ensure_admin_retained(admin_count, target.is_administrator, true)?;

        sqlx::query("DELETE FROM user_child_relations WHERE user_id = $1 AND child_id = $2")
            .bind(target_user_id)
            .bind(child_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            DELETE FROM tool_user_access a
            WHERE a.user_id = $1
              AND ((a.tool_kind = 'barometer' AND a.tool_id IN (SELECT id FROM barometers WHERE child_id = $2))
                OR (a.tool_kind = 'dagens_smiley' AND a.tool_id IN (SELECT id FROM dagens_smiley WHERE child_id = $2))
                OR (a.tool_kind = 'sengetider' AND a.tool_id IN (SELECT id FROM sengetider WHERE child_id = $2)))
            "#,
        )
        .bind(target_user_id)
        .bind(child_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!("User {} removed user {} from child {}", user_id, target_user_id, child_id);
        Ok(())
    }

    pub async fn fetch(&self, child_id: Uuid) -> ServiceResult<Child> {
        sqlx::query_as::<_, Child>("SELECT * FROM children WHERE id = $1")
            .bind(child_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Child not found".to_string()))
    }
}

async fn fetch_relation(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
    child_id: Uuid,
) -> ServiceResult<UserChildRelation> {
    sqlx::query_as::<_, UserChildRelation>(
        "SELECT * FROM user_child_relations WHERE user_id = $1 AND child_id = $2",
    )
    .bind(user_id)
    .bind(child_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| ServiceError::NotFound("User is not related to this child".to_string()))
}

fn with_relation(child: Child, relation: &UserChildRelation) -> ChildWithRelation {
    ChildWithRelation {
        id: child.id,
        name: child.name,
        created_by: child.created_by,
        created_at: child.created_at,
        updated_at: child.updated_at,
        relation_type: relation.relation_type,
        is_administrator: relation.is_administrator,
    }
}
