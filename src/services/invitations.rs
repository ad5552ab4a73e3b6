use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::sync::Arc;
use uuid::Uuid;

use super::access::AccessService;
use super::notifications::{NewNotification, NotificationService};
use super::{normalize_email, ServiceError, ServiceResult};
use crate::config::InvitationConfig;
use crate::database::models::{
    Invitation, InvitationStatus, NotificationKind, RelationType, User, UserChildRelation,
};
use crate::notify::NotificationProvider;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInvitation {
    pub email: String,
    pub relation_type: RelationType,
    #[serde(default)]
    pub is_administrator: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

/// Returned when a token is minted; the only time the raw token leaves the server
#[derive(Debug, Clone, Serialize)]
pub struct IssuedInvitation {
    #[serde(flatten)]
    pub invitation: Invitation,
    pub token: String,
    pub link: String,
}

/// What an unauthenticated visitor of an invitation link may see
#[derive(Debug, Clone, Serialize)]
pub struct InvitationPreview {
    pub child_name: String,
    pub inviter_name: Option<String>,
    pub email: String,
    pub relation_type: RelationType,
    pub is_administrator: bool,
    pub status: InvitationStatus,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReceivedInvitation {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub invitation: Invitation,
    pub child_name: String,
    pub inviter_name: Option<String>,
}

/// Why an invitation cannot be answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Refusal {
    Expired,
    Closed(InvitationStatus),
    WrongEmail,
}

impl From<Refusal> for ServiceError {
    fn from(refusal: Refusal) -> Self {
        match refusal {
            Refusal::Expired => ServiceError::BadRequest("Invitation has expired".to_string()),
            Refusal::Closed(status) => {
                ServiceError::BadRequest(format!("Invitation is no longer open ({})", status.as_str()))
            }
            Refusal::WrongEmail => {
                ServiceError::Forbidden("Invitation was sent to a different email address".to_string())
            }
        }
    }
}

const INVITER_NAME_SQL: &str =
    "COALESCE(NULLIF(TRIM(CONCAT_WS(' ', u.first_name, u.last_name)), ''), u.email)";

pub struct InvitationService {
    pool: PgPool,
    provider: Arc<dyn NotificationProvider>,
    config: InvitationConfig,
}

impl InvitationService {
    pub fn new(pool: PgPool, provider: Arc<dyn NotificationProvider>, config: InvitationConfig) -> Self {
        Self { pool, provider, config }
    }

    fn access(&self) -> AccessService {
        AccessService::new(self.pool.clone())
    }

    fn notifications(&self) -> NotificationService {
        NotificationService::new(self.pool.clone(), self.provider.clone())
    }

    pub async fn create(&self, inviter: &User, child_id: Uuid, input: &CreateInvitation) -> ServiceResult<IssuedInvitation> {
        self.access().require_admin(inviter.id, child_id).await?;
        let email = normalize_email(&input.email)?;

        let already_related: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM user_child_relations r
                JOIN users u ON u.id = r.user_id
                WHERE r.child_id = $1 AND LOWER(u.email) = $2
            )
            "#,
        )
        .bind(child_id)
        .bind(&email)
        .fetch_one(&self.pool)
        .await?;
        if already_related {
            return Err(ServiceError::Conflict(format!("{} is already related to this child", email)));
        }

        let pending: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM invitations
                WHERE child_id = $1 AND email = $2 AND status = 'pending' AND expires_at > NOW()
            )
            "#,
        )
        .bind(child_id)
        .bind(&email)
        .fetch_one(&self.pool)
        .await?;
        if pending {
            return Err(ServiceError::Conflict(format!("{} already has a pending invitation", email)));
        }

        let token = generate_token();
        let invitation = sqlx::query_as::<_, Invitation>(
            r#"
            INSERT INTO invitations (child_id, email, invited_by, relation_type, is_administrator, token_hash, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(child_id)
        .bind(&email)
        .bind(inviter.id)
        .bind(input.relation_type)
        .bind(input.is_administrator)
        .bind(hash_token(&token))
        .bind(self.expiry_from(Utc::now()))
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("User {} invited {} to child {}", inviter.id, email, child_id);
        self.notify_invitee(inviter, &invitation).await;
        Ok(self.issued(invitation, token))
    }

    pub async fn list_for_child(&self, user_id: Uuid, child_id: Uuid) -> ServiceResult<Vec<Invitation>> {
        self.access().require_admin(user_id, child_id).await?;

        let invitations = sqlx::query_as::<_, Invitation>(
            "SELECT * FROM invitations WHERE child_id = $1 ORDER BY created_at DESC",
        )
        .bind(child_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(invitations)
    }

    /// Pending, unexpired invitations addressed to the caller's email
    pub async fn list_mine(&self, user: &User) -> ServiceResult<Vec<ReceivedInvitation>> {
        let invitations = sqlx::query_as::<_, ReceivedInvitation>(&format!(
            r#"
            SELECT i.*, c.name AS child_name, {} AS inviter_name
            FROM invitations i
            JOIN children c ON c.id = i.child_id
            LEFT JOIN users u ON u.id = i.invited_by
            WHERE i.email = $1 AND i.status = 'pending' AND i.expires_at > NOW()
            ORDER BY i.created_at DESC
            "#,
            INVITER_NAME_SQL
        ))
        .bind(user.email.to_lowercase())
        .fetch_all(&self.pool)
        .await?;

        Ok(invitations)
    }

    pub async fn preview(&self, token: &str) -> ServiceResult<InvitationPreview> {
        let found = sqlx::query_as::<_, ReceivedInvitation>(&format!(
            r#"
            SELECT i.*, c.name AS child_name, {} AS inviter_name
            FROM invitations i
            JOIN children c ON c.id = i.child_id
            LEFT JOIN users u ON u.id = i.invited_by
            WHERE i.token_hash = $1
            "#,
            INVITER_NAME_SQL
        ))
        .bind(hash_token(token.trim()))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(invitation_not_found)?;

        let invitation = found.invitation;
        Ok(InvitationPreview {
            child_name: found.child_name,
            inviter_name: found.inviter_name,
            status: invitation.effective_status(Utc::now()),
            email: invitation.email,
            relation_type: invitation.relation_type,
            is_administrator: invitation.is_administrator,
            expires_at: invitation.expires_at,
        })
    }

    /// Creates the relation and consumes the invitation in one transaction
    pub async fn accept(&self, user: &User, token: &str) -> ServiceResult<UserChildRelation> {
        let mut tx = self.pool.begin().await?;
        let invitation = lock_by_token(&mut tx, token).await?;
        if let Err(refusal) = check_respondable(&invitation, &user.email, Utc::now()) {
            // The expired mark sticks even though the request fails
            if refusal == Refusal::Expired {
                set_status(&mut tx, invitation.id, InvitationStatus::Expired).await?;
                tx.commit().await?;
            }
            return Err(refusal.into());
        }

        let already_related: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM user_child_relations WHERE user_id = $1 AND child_id = $2)",
        )
        .bind(user.id)
        .bind(invitation.child_id)
        .fetch_one(&mut *tx)
        .await?;
        if already_related {
            return Err(ServiceError::Conflict("You are already related to this child".to_string()));
        }

        let relation = sqlx::query_as::<_, UserChildRelation>(
            r#"
            INSERT INTO user_child_relations (user_id, child_id, relation_type, is_administrator)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(invitation.child_id)
        .bind(invitation.relation_type)
        .bind(invitation.is_administrator)
        .fetch_one(&mut *tx)
        .await?;

        set_status(&mut tx, invitation.id, InvitationStatus::Accepted).await?;
        tx.commit().await?;

        tracing::info!("User {} accepted invitation {} to child {}", user.id, invitation.id, invitation.child_id);

        if let Some(inviter) = invitation.invited_by {
            let notified = self
                .notifications()
                .notify_users(
                    &[inviter],
                    NewNotification {
                        child_id: Some(invitation.child_id),
                        kind: NotificationKind::InvitationAccepted,
                        title: "Invitation accepteret".to_string(),
                        message: format!("{} har accepteret din invitation", user.display_name()),
                    },
                )
                .await;
            if let Err(e) = notified {
                tracing::warn!("Failed to notify inviter of accepted invitation {}: {}", invitation.id, e);
            }
        }

        Ok(relation)
    }

    pub async fn decline(&self, user: &User, token: &str) -> ServiceResult<Invitation> {
        let mut tx = self.pool.begin().await?;
        let invitation = lock_by_token(&mut tx, token).await?;
        if let Err(refusal) = check_respondable(&invitation, &user.email, Utc::now()) {
            // The expired mark sticks even though the request fails
            if refusal == Refusal::Expired {
                set_status(&mut tx, invitation.id, InvitationStatus::Expired).await?;
                tx.commit().await?;
            }
            return Err(refusal.into());
        }
        let declined = set_status(&mut tx, invitation.id, InvitationStatus::Declined).await?;
        tx.commit().await?;

        tracing::info!("User {} declined invitation {}", user.id, invitation.id);
        Ok(declined)
    }

    /// Pending invitations only
    pub async fn cancel(&self, user_id: Uuid, invitation_id: Uuid) -> ServiceResult<Invitation> {
        let invitation = self.fetch(invitation_id).await?;
        self.access().require_admin(user_id, invitation.child_id).await?;

        // Re-read under the row lock so a concurrent accept or decline wins cleanly
        let mut tx = self.pool.begin().await?;
        let invitation = lock_by_id(&mut tx, invitation_id).await?;
        if invitation.status != InvitationStatus::Pending {
            return Err(ServiceError::BadRequest(format!(
                "Only pending invitations can be cancelled (status is {})",
                invitation.status.as_str()
            )));
        }

        let cancelled = set_status(&mut tx, invitation_id, InvitationStatus::Cancelled).await?;
        tx.commit().await?;

        tracing::info!("User {} cancelled invitation {}", user_id, invitation_id);
        Ok(cancelled)
    }

    /// Mints a fresh token and expiry for a pending or expired invitation
    pub async fn resend(&self, inviter: &User, invitation_id: Uuid) -> ServiceResult<IssuedInvitation> {
        let invitation = self.fetch(invitation_id).await?;
        self.access().require_admin(inviter.id, invitation.child_id).await?;

        let mut tx = self.pool.begin().await?;
        let invitation = lock_by_id(&mut tx, invitation_id).await?;
        if !can_resend(invitation.effective_status(Utc::now())) {
            return Err(ServiceError::BadRequest(format!(
                "Invitation can no longer be resent (status is {})",
                invitation.status.as_str()
            )));
        }

        let token = generate_token();
        let refreshed = sqlx::query_as::<_, Invitation>(
            r#"
            UPDATE invitations
            SET token_hash = $2, expires_at = $3, status = 'pending', responded_at = NULL
            WHERE id = $1 AND status IN ('pending', 'expired')
            RETURNING *
            "#,
        )
        .bind(invitation_id)
        .bind(hash_token(&token))
        .bind(self.expiry_from(Utc::now()))
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(no_longer_pending)?;
        tx.commit().await?;

        tracing::info!("User {} resent invitation {}", inviter.id, invitation_id);
        self.notify_invitee(inviter, &refreshed).await;
        Ok(self.issued(refreshed, token))
    }

    /// Marks every pending invitation past its expiry as expired
    pub async fn expire_stale(&self) -> ServiceResult<u64> {
        let expired = sqlx::query(
            "UPDATE invitations SET status = 'expired' WHERE status = 'pending' AND expires_at <= NOW()",
        )
        .execute(&self.pool)
        .await?
        .rows_affected();

        if expired > 0 {
            tracing::info!("Expired {} stale invitations", expired);
        }
        Ok(expired)
    }

    async fn fetch(&self, invitation_id: Uuid) -> ServiceResult<Invitation> {
        sqlx::query_as::<_, Invitation>("SELECT * FROM invitations WHERE id = $1")
            .bind(invitation_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(invitation_not_found)
    }

    /// The invitation is already stored, so a failed notification only gets logged
    async fn notify_invitee(&self, inviter: &User, invitation: &Invitation) {
        let notified = self
            .notifications()
            .notify_email(
                &invitation.email,
                NewNotification {
                    child_id: Some(invitation.child_id),
                    kind: NotificationKind::Invitation,
                    title: "Ny invitation".to_string(),
                    message: format!(
                        "{} har inviteret dig som {}",
                        inviter.display_name(),
                        invitation.relation_type.as_str()
                    ),
                },
            )
            .await;
        if let Err(e) = notified {
            tracing::warn!("Failed to notify {} about invitation {}: {}", invitation.email, invitation.id, e);
        }
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::days(self.config.expiry_days)
    }

    fn issued(&self, invitation: Invitation, token: String) -> IssuedInvitation {
        IssuedInvitation {
            link: invitation_link(&self.config.base_url, &token),
            invitation,
            token,
        }
    }
}

fn invitation_not_found() -> ServiceError {
    ServiceError::NotFound("Invitation not found".to_string())
}

async fn lock_by_token(tx: &mut Transaction<'_, Postgres>, token: &str) -> ServiceResult<Invitation> {
    sqlx::query_as::<_, Invitation>("SELECT * FROM invitations WHERE token_hash = $1 FOR UPDATE")
        .bind(hash_token(token.trim()))
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(invitation_not_found)
}

async fn lock_by_id(tx: &mut Transaction<'_, Postgres>, invitation_id: Uuid) -> ServiceResult<Invitation> {
    sqlx::query_as::<_, Invitation>("SELECT * FROM invitations WHERE id = $1 FOR UPDATE")
        .bind(invitation_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(invitation_not_found)
}

/// Moves a pending invitation to `status`; every transition starts from pending
async fn set_status(
    tx: &mut Transaction<'_, Postgres>,
    invitation_id: Uuid,
    status: InvitationStatus,
) -> ServiceResult<Invitation> {
    sqlx::query_as::<_, Invitation>(
        r#"
        UPDATE invitations
        SET status = $2,
            responded_at = CASE WHEN $2 IN ('accepted', 'declined') THEN NOW() ELSE responded_at END
        WHERE id = $1 AND status = 'pending'
        RETURNING *
        "#,
    )
    .bind(invitation_id)
    .bind(status)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(no_longer_pending)
}

fn no_longer_pending() -> ServiceError {
    ServiceError::BadRequest("Invitation is no longer pending".to_string())
}

fn check_respondable(invitation: &Invitation, email: &str, now: DateTime<Utc>) -> Result<(), Refusal> {
    match invitation.effective_status(now) {
        InvitationStatus::Pending => {}
        InvitationStatus::Expired if invitation.status == InvitationStatus::Pending => return Err(Refusal::Expired),
        status => return Err(Refusal::Closed(status)),
    }
    if !invitation.email.eq_ignore_ascii_case(email.trim()) {
        return Err(Refusal::WrongEmail);
    }
    Ok(())
}

fn can_resend(status: InvitationStatus) -> bool {
    matches!(status, InvitationStatus::Pending | InvitationStatus::Expired)
}

/// 64 hex characters drawn from two v4 UUIDs
fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

pub fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

fn invitation_link(base_url: &str, token: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invitation(status: InvitationStatus, expires_in: Duration) -> Invitation {
        let now = Utc::now();
        Invitation {
            id: Uuid::new_v4(),
            child_id: Uuid::new_v4(),
            email: "laerer@skole.dk".to_string(),
            invited_by: Some(Uuid::new_v4()),
            relation_type: RelationType::Teacher,
            is_administrator: false,
            token_hash: hash_token("abc"),
            status,
            expires_at: now + expires_in,
            created_at: now,
            responded_at: None,
        }
    }

    #[test]
    fn tokens_are_random_and_hashed() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);

        let hash = hash_token(&a);
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_token(&a));
        assert_ne!(hash, a);
    }

    #[test]
    fn known_sha256_digest() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn pending_invitation_for_matching_email_is_respondable() {
        let inv = invitation(InvitationStatus::Pending, Duration::days(2));
        assert_eq!(check_respondable(&inv, "Laerer@Skole.dk", Utc::now()), Ok(()));
    }

    #[test]
    fn expired_and_closed_invitations_are_refused() {
        let expired = invitation(InvitationStatus::Pending, Duration::hours(-1));
        assert_eq!(check_respondable(&expired, "laerer@skole.dk", Utc::now()), Err(Refusal::Expired));

        let accepted = invitation(InvitationStatus::Accepted, Duration::days(2));
        assert_eq!(
            check_respondable(&accepted, "laerer@skole.dk", Utc::now()),
            Err(Refusal::Closed(InvitationStatus::Accepted))
        );

        let marked = invitation(InvitationStatus::Expired, Duration::hours(-1));
        assert_eq!(
            check_respondable(&marked, "laerer@skole.dk", Utc::now()),
            Err(Refusal::Closed(InvitationStatus::Expired))
        );
    }

    #[test]
    fn other_emails_are_refused() {
        let inv = invitation(InvitationStatus::Pending, Duration::days(2));
        assert_eq!(check_respondable(&inv, "mor@example.com", Utc::now()), Err(Refusal::WrongEmail));
    }

    #[test]
    fn refusals_map_to_status_classes() {
        assert!(matches!(ServiceError::from(Refusal::Expired), ServiceError::BadRequest(_)));
        assert!(matches!(ServiceError::from(Refusal::WrongEmail), ServiceError::Forbidden(_)));
    }

    #[test]
    fn only_pending_or_expired_can_be_resent() {
        assert!(can_resend(InvitationStatus::Pending));
        assert!(can_resend(InvitationStatus::Expired));
        assert!(!can_resend(InvitationStatus::Accepted));
        assert!(!can_resend(InvitationStatus::Cancelled));
    }

    #[test]
    fn links_join_base_and_token() {
        assert_eq!(
            invitation_link("https://app.reschool.dk/invitation/", "tok"),
            "https://app.reschool.dk/invitation/tok"
        );
    }
}
