use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::child::RelationType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invitation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
    Cancelled,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Declined => "declined",
            InvitationStatus::Expired => "expired",
            InvitationStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invitation {
    pub id: Uuid,
    pub child_id: Uuid,
    pub email: String,
    pub invited_by: Option<Uuid>,
    pub relation_type: RelationType,
    pub is_administrator: bool,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub status: InvitationStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl Invitation {
    /// Status as observed at `now`; pending invitations past their expiry read as expired
    pub fn effective_status(&self, now: DateTime<Utc>) -> InvitationStatus {
        if self.status == InvitationStatus::Pending && self.expires_at <= now {
            InvitationStatus::Expired
        } else {
            self.status
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn invitation(status: InvitationStatus, expires_in: Duration) -> Invitation {
        let now = Utc::now();
        Invitation {
            id: Uuid::new_v4(),
            child_id: Uuid::new_v4(),
            email: "far@example.com".to_string(),
            invited_by: None,
            relation_type: RelationType::Parent,
            is_administrator: false,
            token_hash: String::new(),
            status,
            expires_at: now + expires_in,
            created_at: now,
            responded_at: None,
        }
    }

    #[test]
    fn pending_past_expiry_reads_as_expired() {
        let inv = invitation(InvitationStatus::Pending, Duration::hours(-1));
        assert_eq!(inv.effective_status(Utc::now()), InvitationStatus::Expired);
    }

    #[test]
    fn responded_invitations_keep_their_status() {
        let inv = invitation(InvitationStatus::Accepted, Duration::hours(-1));
        assert_eq!(inv.effective_status(Utc::now()), InvitationStatus::Accepted);

        let inv = invitation(InvitationStatus::Pending, Duration::days(3));
        assert_eq!(inv.effective_status(Utc::now()), InvitationStatus::Pending);
    }
}
