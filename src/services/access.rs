//! Authorization predicates shared by every child-scoped route.
//!
//! A caller may act on a child only through a `user_child_relation` row.
//! Mutations additionally require the administrator flag, or ownership of the
//! tool or entry being changed, and no change may leave a child without an
//! administrator.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{ServiceError, ServiceResult};
use crate::database::models::{ToolHeader, ToolKind, UserChildRelation};

pub struct AccessService {
    pool: PgPool,
}

impl AccessService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn relation(&self, user_id: Uuid, child_id: Uuid) -> ServiceResult<Option<UserChildRelation>> {
        let relation = sqlx::query_as::<_, UserChildRelation>(
            "SELECT * FROM user_child_relations WHERE user_id = $1 AND child_id = $2",
        )
        .bind(user_id)
        .bind(child_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(relation)
    }

    /// The caller's relation to the child; 404 for unknown children, 403 when unrelated
    pub async fn require_relation(&self, user_id: Uuid, child_id: Uuid) -> ServiceResult<UserChildRelation> {
        if let Some(relation) = self.relation(user_id, child_id).await? {
            return Ok(relation);
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM children WHERE id = $1)")
            .bind(child_id)
            .fetch_one(&self.pool)
            .await?;

        if exists {
            tracing::warn!("User {} has no relation to child {}", user_id, child_id);
            Err(ServiceError::Forbidden("You do not have access to this child".to_string()))
        } else {
            Err(ServiceError::NotFound("Child not found".to_string()))
        }
    }

    /// The caller's relation, which must carry the administrator flag
    pub async fn require_admin(&self, user_id: Uuid, child_id: Uuid) -> ServiceResult<UserChildRelation> {
        let relation = self.require_relation(user_id, child_id).await?;
        if !relation.is_administrator {
            tracing::warn!("User {} attempted an administrator action on child {}", user_id, child_id);
            return Err(ServiceError::Forbidden(
                "Only administrators can perform this action".to_string(),
            ));
        }
        Ok(relation)
    }

    /// Users on a tool's access list
    pub async fn tool_access_list(&self, kind: ToolKind, tool_id: Uuid) -> ServiceResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar(
            "SELECT user_id FROM tool_user_access WHERE tool_kind = $1 AND tool_id = $2 ORDER BY created_at",
        )
        .bind(kind)
        .bind(tool_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}

/// Locks the child's relation rows for the rest of the transaction and
/// returns the number of administrators.
pub async fn lock_admin_count(tx: &mut Transaction<'_, Postgres>, child_id: Uuid) -> ServiceResult<i64> {
    let flags: Vec<bool> = sqlx::query_scalar(
        "SELECT is_administrator FROM user_child_relations WHERE child_id = $1 FOR UPDATE",
    )
    .bind(child_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(flags.into_iter().filter(|is_admin| *is_admin).count() as i64)
}

/// Rejects a change that would leave the child with no administrator.
/// `loses_admin` is true when the target is removed or demoted.
pub fn ensure_admin_retained(admin_count: i64, target_is_admin: bool, loses_admin: bool) -> ServiceResult<()> {
    if target_is_admin && loses_admin && admin_count <= 1 {
        tracing::warn!("Blocked change that would remove the last administrator");
        return Err(ServiceError::BadRequest(
            "A child must keep at least one administrator".to_string(),
        ));
    }
    Ok(())
}

/// Public tools are visible to everyone related to the child; private tools to
/// the creator, administrators, and users on the access list.
pub fn can_view_tool(tool: &ToolHeader, viewer: &UserChildRelation, access_list: &[Uuid]) -> bool {
    viewer.child_id == tool.child_id
        && (tool.is_public
            || tool.created_by == viewer.user_id
            || viewer.is_administrator
            || access_list.contains(&viewer.user_id))
}

/// Tool headers and access lists are managed by the creator or an administrator
pub fn can_manage_tool(tool: &ToolHeader, relation: &UserChildRelation) -> bool {
    relation.child_id == tool.child_id && (tool.created_by == relation.user_id || relation.is_administrator)
}

/// Entries may be deleted by whoever recorded them or by an administrator
pub fn can_delete_entry(recorded_by: Uuid, relation: &UserChildRelation) -> bool {
    recorded_by == relation.user_id || relation.is_administrator
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::RelationType;
    use chrono::Utc;

    fn relation(child_id: Uuid, is_administrator: bool) -> UserChildRelation {
        UserChildRelation {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            child_id,
            relation_type: RelationType::Teacher,
            is_administrator,
            created_at: Utc::now(),
        }
    }

    fn tool(child_id: Uuid, created_by: Uuid, is_public: bool) -> ToolHeader {
        ToolHeader {
            id: Uuid::new_v4(),
            child_id,
            created_by,
            topic: "Humør i skolen".to_string(),
            description: None,
            is_public,
            scale_type: None,
            display_type: None,
            smiley_type: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn last_admin_cannot_be_removed_or_demoted() {
        assert!(ensure_admin_retained(1, true, true).is_err());
        assert!(ensure_admin_retained(0, true, true).is_err());
    }

    #[test]
    fn admin_changes_allowed_when_others_remain() {
        assert!(ensure_admin_retained(2, true, true).is_ok());
        // promoting or keeping the flag never loses an admin
        assert!(ensure_admin_retained(1, true, false).is_ok());
        // non-admins can always be removed
        assert!(ensure_admin_retained(1, false, true).is_ok());
    }

    #[test]
    fn public_tools_are_visible_to_related_users() {
        let child = Uuid::new_v4();
        let viewer = relation(child, false);
        let t = tool(child, Uuid::new_v4(), true);
        assert!(can_view_tool(&t, &viewer, &[]));
    }

    #[test]
    fn private_tools_require_listing_creatorship_or_admin() {
        let child = Uuid::new_v4();
        let viewer = relation(child, false);
        let t = tool(child, Uuid::new_v4(), false);
        assert!(!can_view_tool(&t, &viewer, &[]));
        assert!(can_view_tool(&t, &viewer, &[viewer.user_id]));

        let own = tool(child, viewer.user_id, false);
        assert!(can_view_tool(&own, &viewer, &[]));

        let admin = relation(child, true);
        assert!(can_view_tool(&t, &admin, &[]));
    }

    #[test]
    fn relations_to_other_children_grant_nothing() {
        let viewer = relation(Uuid::new_v4(), true);
        let t = tool(Uuid::new_v4(), viewer.user_id, true);
        assert!(!can_view_tool(&t, &viewer, &[viewer.user_id]));
        assert!(!can_manage_tool(&t, &viewer));
    }

    #[test]
    fn management_rights() {
        let child = Uuid::new_v4();
        let member = relation(child, false);
        let admin = relation(child, true);
        let t = tool(child, Uuid::new_v4(), true);

        assert!(!can_manage_tool(&t, &member));
        assert!(can_manage_tool(&t, &admin));
        assert!(can_manage_tool(&tool(child, member.user_id, true), &member));
    }

    #[test]
    fn entry_deletion_rights() {
        let child = Uuid::new_v4();
        let member = relation(child, false);
        assert!(can_delete_entry(member.user_id, &member));
        assert!(!can_delete_entry(Uuid::new_v4(), &member));
        assert!(can_delete_entry(Uuid::new_v4(), &relation(child, true)));
    }
}
