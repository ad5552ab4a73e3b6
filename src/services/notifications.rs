use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use super::{ServiceError, ServiceResult};
use crate::database::models::{Notification, NotificationKind, User};
use crate::notify::{self, NotificationProvider, PushMessage};

pub const DEFAULT_LIST_LIMIT: i64 = 50;
pub const MAX_LIST_LIMIT: i64 = 100;

/// Content of a notification before it is addressed
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub child_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}

/// Where a notification ends up: a known user or an email nobody has signed up with yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    User(Uuid),
    PendingEmail(String),
}

pub struct NotificationService {
    pool: PgPool,
    provider: Arc<dyn NotificationProvider>,
}

impl NotificationService {
    pub fn new(pool: PgPool, provider: Arc<dyn NotificationProvider>) -> Self {
        Self { pool, provider }
    }

    /// Store one in-app row per user and push to all of them
    pub async fn notify_users(&self, user_ids: &[Uuid], content: NewNotification) -> ServiceResult<u64> {
        let mut recipients = user_ids.to_vec();
        recipients.sort();
        recipients.dedup();
        if recipients.is_empty() {
            return Ok(0);
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO notifications (user_id, child_id, kind, title, message)
            SELECT recipient, $2, $3, $4, $5 FROM UNNEST($1::uuid[]) AS recipient
            "#,
        )
        .bind(&recipients)
        .bind(content.child_id)
        .bind(content.kind)
        .bind(&content.title)
        .bind(&content.message)
        .execute(&self.pool)
        .await?
        .rows_affected();

        notify::dispatch(
            self.provider.clone(),
            PushMessage {
                recipients,
                kind: content.kind,
                title: content.title,
                body: content.message,
                child_id: content.child_id,
            },
        );

        Ok(inserted)
    }

    /// Address by email: registered users get a normal notification, others a
    /// pending one that is activated when they first sign in.
    pub async fn notify_email(&self, email: &str, content: NewNotification) -> ServiceResult<Recipient> {
        let email = email.trim().to_lowercase();
        let user_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM users WHERE email = $1 ORDER BY created_at LIMIT 1",
        )
        .bind(&email)
        .fetch_optional(&self.pool)
        .await?;

        match user_id {
            Some(user_id) => {
                self.notify_users(&[user_id], content).await?;
                Ok(Recipient::User(user_id))
            }
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO notifications (pending_email, child_id, kind, title, message)
                    VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(&email)
                .bind(content.child_id)
                .bind(content.kind)
                .bind(&content.title)
                .bind(&content.message)
                .execute(&self.pool)
                .await?;

                tracing::debug!("Queued pending notification for {}", email);
                Ok(Recipient::PendingEmail(email))
            }
        }
    }

    pub async fn list(&self, user_id: Uuid, unread_only: bool, limit: Option<i64>) -> ServiceResult<NotificationList> {
        let limit = clamp_limit(limit)?;

        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE user_id = $1 AND ($2 = FALSE OR is_read = FALSE)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let unread_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(NotificationList {
            notifications,
            unread_count,
        })
    }

    pub async fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> ServiceResult<Notification> {
        sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications
            SET is_read = TRUE, read_at = COALESCE(read_at, NOW())
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(notification_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Notification not found".to_string()))
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> ServiceResult<u64> {
        let updated = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = NOW() WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated)
    }

    pub async fn delete(&self, user_id: Uuid, notification_id: Uuid) -> ServiceResult<()> {
        let deleted = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(notification_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(ServiceError::NotFound("Notification not found".to_string()));
        }
        Ok(())
    }

    /// Re-address notifications queued for the user's email to the user id
    pub async fn activate_pending(&self, user: &User) -> ServiceResult<u64> {
        let activated = sqlx::query(
            r#"
            UPDATE notifications
            SET user_id = $1, pending_email = NULL
            WHERE pending_email = $2
            "#,
        )
        .bind(user.id)
        .bind(user.email.to_lowercase())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(activated)
    }

    /// Repair routine for a single email address (CLI)
    pub async fn activate_pending_for_email(&self, email: &str) -> ServiceResult<u64> {
        let email = email.trim().to_lowercase();
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE email = $1 ORDER BY created_at LIMIT 1",
        )
        .bind(&email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("No user registered with email {}", email)))?;

        self.activate_pending(&user).await
    }
}

fn clamp_limit(limit: Option<i64>) -> ServiceResult<i64> {
    match limit {
        None => Ok(DEFAULT_LIST_LIMIT),
        Some(l) if (1..=MAX_LIST_LIMIT).contains(&l) => Ok(l),
        Some(_) => Err(ServiceError::field(
            "limit",
            format!("Must be between 1 and {}", MAX_LIST_LIMIT),
        )),
    }
}
