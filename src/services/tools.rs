use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use super::access::{can_delete_entry, can_manage_tool, can_view_tool, AccessService};
use super::notifications::{NewNotification, NotificationService};
use super::{optional_text, required_text, ServiceError, ServiceResult};
use crate::database::models::{
    BarometerEntry, DagensSmileyEntry, NotificationKind, ScaleType, SengetiderEntry, ToolHeader, ToolKind,
    User, UserChildRelation,
};
use crate::notify::NotificationProvider;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTool {
    pub topic: String,
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_public: bool,
    #[serde(default)]
    pub access_user_ids: Vec<Uuid>,
    /// Barometer only
    pub scale_type: Option<ScaleType>,
    /// Barometer only
    pub display_type: Option<String>,
    /// Barometer only
    pub smiley_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTool {
    pub topic: Option<String>,
    pub description: Option<String>,
    pub display_type: Option<String>,
    pub smiley_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetAccess {
    pub is_public: bool,
    #[serde(default)]
    pub user_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct EntryRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BarometerEntryInput {
    pub entry_date: NaiveDate,
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DagensSmileyEntryInput {
    pub entry_date: NaiveDate,
    pub selected_emoji: String,
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SengetiderEntryInput {
    pub entry_date: NaiveDate,
    #[serde(default, deserialize_with = "deserialize_optional_time")]
    pub puttetid: Option<NaiveTime>,
    #[serde(default, deserialize_with = "deserialize_optional_time")]
    pub sov_kl: Option<NaiveTime>,
    #[serde(default, deserialize_with = "deserialize_optional_time")]
    pub vaagnede: Option<NaiveTime>,
    pub comment: Option<String>,
}

/// Accepts "HH:MM" as well as "HH:MM:SS"
fn deserialize_optional_time<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => NaiveTime::parse_from_str(value, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid time '{}', expected HH:MM", value))),
    }
}

/// A tool header together with its access list
#[derive(Debug, Clone, Serialize)]
pub struct ToolView {
    #[serde(flatten)]
    pub tool: ToolHeader,
    pub kind: ToolKind,
    pub access_user_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ToolEntry {
    Barometer(BarometerEntry),
    DagensSmiley(DagensSmileyEntry),
    Sengetider(SengetiderEntry),
}

impl ToolEntry {
    pub fn id(&self) -> Uuid {
        match self {
            ToolEntry::Barometer(e) => e.id,
            ToolEntry::DagensSmiley(e) => e.id,
            ToolEntry::Sengetider(e) => e.id,
        }
    }
}

/// A tool the caller has been cleared to see
struct VisibleTool {
    tool: ToolHeader,
    relation: UserChildRelation,
    access_list: Vec<Uuid>,
}

pub struct ToolService {
    pool: PgPool,
    provider: Arc<dyn NotificationProvider>,
}

impl ToolService {
    pub fn new(pool: PgPool, provider: Arc<dyn NotificationProvider>) -> Self {
        Self { pool, provider }
    }

    fn access(&self) -> AccessService {
        AccessService::new(self.pool.clone())
    }

    pub async fn list(&self, user_id: Uuid, child_id: Uuid, kind: ToolKind) -> ServiceResult<Vec<ToolView>> {
        let relation = self.access().require_relation(user_id, child_id).await?;

        let tools = sqlx::query_as::<_, ToolHeader>(&format!(
            "SELECT * FROM {} WHERE child_id = $1 ORDER BY created_at",
            kind.table()
        ))
        .bind(child_id)
        .fetch_all(&self.pool)
        .await?;

        let mut visible = Vec::with_capacity(tools.len());
        for tool in tools {
            let access_list = self.access().tool_access_list(kind, tool.id).await?;
            if can_view_tool(&tool, &relation, &access_list) {
                visible.push(ToolView {
                    tool,
                    kind,
                    access_user_ids: access_list,
                });
            }
        }

        Ok(visible)
    }

    pub async fn create(&self, user_id: Uuid, child_id: Uuid, kind: ToolKind, input: &CreateTool) -> ServiceResult<ToolView> {
        self.access().require_relation(user_id, child_id).await?;

        let topic = required_text("topic", &input.topic, 200)?;
        let description = optional_text("description", input.description.as_deref(), 2000)?;
        let access_user_ids = dedup(&input.access_user_ids);
        self.ensure_related(child_id, &access_user_ids).await?;

        let mut tx = self.pool.begin().await?;

        let tool = match kind {
            ToolKind::Barometer => {
                sqlx::query_as::<_, ToolHeader>(
                    r#"
                    INSERT INTO barometers
                        (child_id, created_by, topic, description, is_public, scale_type, display_type, smiley_type)
                    VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, 'numbers'), $8)
                    RETURNING *
                    "#,
                )
                .bind(child_id)
                .bind(user_id)
                .bind(&topic)
                .bind(&description)
                .bind(input.is_public)
                .bind(input.scale_type.unwrap_or_default())
                .bind(optional_text("display_type", input.display_type.as_deref(), 50)?)
                .bind(optional_text("smiley_type", input.smiley_type.as_deref(), 50)?)
                .fetch_one(&mut *tx)
                .await?
            }
            ToolKind::DagensSmiley | ToolKind::Sengetider => {
                sqlx::query_as::<_, ToolHeader>(&format!(
                    r#"
                    INSERT INTO {} (child_id, created_by, topic, description, is_public)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING *
                    "#,
                    kind.table()
                ))
                .bind(child_id)
                .bind(user_id)
                .bind(&topic)
                .bind(&description)
                .bind(input.is_public)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        replace_access_list(&mut tx, kind, tool.id, &access_user_ids).await?;
        tx.commit().await?;

        tracing::info!("User {} created {} {} for child {}", user_id, kind.label(), tool.id, child_id);
        Ok(ToolView {
            tool,
            kind,
            access_user_ids,
        })
    }

    pub async fn get(&self, user_id: Uuid, kind: ToolKind, tool_id: Uuid) -> ServiceResult<ToolView> {
        let visible = self.visible_tool(user_id, kind, tool_id).await?;
        Ok(ToolView {
            tool: visible.tool,
            kind,
            access_user_ids: visible.access_list,
        })
    }

    pub async fn update(&self, user_id: Uuid, kind: ToolKind, tool_id: Uuid, input: &UpdateTool) -> ServiceResult<ToolView> {
        let visible = self.managed_tool(user_id, kind, tool_id).await?;

        let topic = match &input.topic {
            Some(topic) => Some(required_text("topic", topic, 200)?),
            None => None,
        };
        let description = optional_text("description", input.description.as_deref(), 2000)?;

        let tool = match kind {
            ToolKind::Barometer => {
                sqlx::query_as::<_, ToolHeader>(
                    r#"
                    UPDATE barometers
                    SET topic = COALESCE($2, topic),
                        description = COALESCE($3, description),
                        display_type = COALESCE($4, display_type),
                        smiley_type = COALESCE($5, smiley_type),
                        updated_at = NOW()
                    WHERE id = $1
                    RETURNING *
                    "#,
                )
                .bind(tool_id)
                .bind(&topic)
                .bind(&description)
                .bind(optional_text("display_type", input.display_type.as_deref(), 50)?)
                .bind(optional_text("smiley_type", input.smiley_type.as_deref(), 50)?)
                .fetch_one(&self.pool)
                .await?
            }
            ToolKind::DagensSmiley | ToolKind::Sengetider => {
                sqlx::query_as::<_, ToolHeader>(&format!(
                    r#"
                    UPDATE {}
                    SET topic = COALESCE($2, topic),
                        description = COALESCE($3, description),
                        updated_at = NOW()
                    WHERE id = $1
                    RETURNING *
                    "#,
                    kind.table()
                ))
                .bind(tool_id)
                .bind(&topic)
                .bind(&description)
                .fetch_one(&self.pool)
                .await?
            }
        };

        Ok(ToolView {
            tool,
            kind,
            access_user_ids: visible.access_list,
        })
    }

    /// Replace visibility and the access list in one go
    pub async fn set_access(&self, user_id: Uuid, kind: ToolKind, tool_id: Uuid, input: &SetAccess) -> ServiceResult<ToolView> {
        let visible = self.managed_tool(user_id, kind, tool_id).await?;
        let user_ids = dedup(&input.user_ids);
        self.ensure_related(visible.tool.child_id, &user_ids).await?;

        let mut tx = self.pool.begin().await?;

        let tool = sqlx::query_as::<_, ToolHeader>(&format!(
            "UPDATE {} SET is_public = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
            kind.table()
        ))
        .bind(tool_id)
        .bind(input.is_public)
        .fetch_one(&mut *tx)
        .await?;

        replace_access_list(&mut tx, kind, tool_id, &user_ids).await?;
        tx.commit().await?;

        Ok(ToolView {
            tool,
            kind,
            access_user_ids: user_ids,
        })
    }

    pub async fn delete(&self, user_id: Uuid, kind: ToolKind, tool_id: Uuid) -> ServiceResult<()> {
        self.managed_tool(user_id, kind, tool_id).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM tool_user_access WHERE tool_kind = $1 AND tool_id = $2")
            .bind(kind)
            .bind(tool_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM {} WHERE id = $1", kind.table()))
            .bind(tool_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!("User {} deleted {} {}", user_id, kind.label(), tool_id);
        Ok(())
    }

    pub async fn entries(&self, user_id: Uuid, kind: ToolKind, tool_id: Uuid, range: EntryRange) -> ServiceResult<Vec<ToolEntry>> {
        self.visible_tool(user_id, kind, tool_id).await?;
        validate_range(&range)?;

        let sql = format!(
            r#"
            SELECT * FROM {} WHERE {} = $1
              AND ($2::date IS NULL OR entry_date >= $2)
              AND ($3::date IS NULL OR entry_date <= $3)
            ORDER BY entry_date DESC, created_at DESC
            "#,
            kind.entry_table(),
            kind.entry_fk()
        );

        let entries = match kind {
            ToolKind::Barometer => sqlx::query_as::<_, BarometerEntry>(&sql)
                .bind(tool_id)
                .bind(range.from)
                .bind(range.to)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(ToolEntry::Barometer)
                .collect(),
            ToolKind::DagensSmiley => sqlx::query_as::<_, DagensSmileyEntry>(&sql)
                .bind(tool_id)
                .bind(range.from)
                .bind(range.to)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(ToolEntry::DagensSmiley)
                .collect(),
            ToolKind::Sengetider => sqlx::query_as::<_, SengetiderEntry>(&sql)
                .bind(tool_id)
                .bind(range.from)
                .bind(range.to)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(ToolEntry::Sengetider)
                .collect(),
        };

        Ok(entries)
    }

    /// Insert or overwrite the caller's entry for the date. The body is parsed
    /// according to the tool kind.
    pub async fn record_entry(
        &self,
        user: &User,
        kind: ToolKind,
        tool_id: Uuid,
        body: serde_json::Value,
    ) -> ServiceResult<ToolEntry> {
        let visible = self.visible_tool(user.id, kind, tool_id).await?;
        let today = Utc::now().date_naive();

        let entry = match kind {
            ToolKind::Barometer => {
                let input: BarometerEntryInput = parse_body(body)?;
                validate_entry_date(input.entry_date, today)?;
                let scale = visible.tool.scale_type.unwrap_or_default();
                if !scale.accepts(input.rating) {
                    let (min, max) = scale.bounds();
                    return Err(ServiceError::field(
                        "rating",
                        format!("Rating must be between {} and {}", min, max),
                    ));
                }
                let comment = optional_text("comment", input.comment.as_deref(), 2000)?;

                let entry = sqlx::query_as::<_, BarometerEntry>(
                    r#"
                    INSERT INTO barometer_entries (barometer_id, recorded_by, entry_date, rating, comment)
                    VALUES ($1, $2, $3, $4, $5)
                    ON CONFLICT (barometer_id, recorded_by, entry_date) DO UPDATE SET
                        rating = EXCLUDED.rating,
                        comment = EXCLUDED.comment,
                        updated_at = NOW()
                    RETURNING *
                    "#,
                )
                .bind(tool_id)
                .bind(user.id)
                .bind(input.entry_date)
                .bind(input.rating)
                .bind(comment)
                .fetch_one(&self.pool)
                .await?;
                ToolEntry::Barometer(entry)
            }
            ToolKind::DagensSmiley => {
                let input: DagensSmileyEntryInput = parse_body(body)?;
                validate_entry_date(input.entry_date, today)?;
                let emoji = required_text("selected_emoji", &input.selected_emoji, 32)?;
                let reasoning = optional_text("reasoning", input.reasoning.as_deref(), 2000)?;

                let entry = sqlx::query_as::<_, DagensSmileyEntry>(
                    r#"
                    INSERT INTO dagens_smiley_entries (smiley_id, recorded_by, entry_date, selected_emoji, reasoning)
                    VALUES ($1, $2, $3, $4, $5)
                    ON CONFLICT (smiley_id, recorded_by, entry_date) DO UPDATE SET
                        selected_emoji = EXCLUDED.selected_emoji,
                        reasoning = EXCLUDED.reasoning,
                        updated_at = NOW()
                    RETURNING *
                    "#,
                )
                .bind(tool_id)
                .bind(user.id)
                .bind(input.entry_date)
                .bind(emoji)
                .bind(reasoning)
                .fetch_one(&self.pool)
                .await?;
                ToolEntry::DagensSmiley(entry)
            }
            ToolKind::Sengetider => {
                let input: SengetiderEntryInput = parse_body(body)?;
                validate_entry_date(input.entry_date, today)?;
                validate_bedtimes(&input)?;
                let comment = optional_text("comment", input.comment.as_deref(), 2000)?;

                let entry = sqlx::query_as::<_, SengetiderEntry>(
                    r#"
                    INSERT INTO sengetider_entries
                        (sengetider_id, recorded_by, entry_date, puttetid, sov_kl, vaagnede, comment)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    ON CONFLICT (sengetider_id, entry_date) DO UPDATE SET
                        recorded_by = EXCLUDED.recorded_by,
                        puttetid = EXCLUDED.puttetid,
                        sov_kl = EXCLUDED.sov_kl,
                        vaagnede = EXCLUDED.vaagnede,
                        comment = EXCLUDED.comment,
                        updated_at = NOW()
                    RETURNING *
                    "#,
                )
                .bind(tool_id)
                .bind(user.id)
                .bind(input.entry_date)
                .bind(input.puttetid)
                .bind(input.sov_kl)
                .bind(input.vaagnede)
                .bind(comment)
                .fetch_one(&self.pool)
                .await?;
                ToolEntry::Sengetider(entry)
            }
        };

        if let Err(e) = self.notify_admins_of_entry(user, kind, &visible.tool).await {
            tracing::warn!("Failed to notify administrators about entry on {} {}: {}", kind.label(), tool_id, e);
        }
        Ok(entry)
    }

    pub async fn delete_entry(&self, user_id: Uuid, kind: ToolKind, tool_id: Uuid, entry_id: Uuid) -> ServiceResult<()> {
        let visible = self.visible_tool(user_id, kind, tool_id).await?;

        let recorded_by: Uuid = sqlx::query_scalar(&format!(
            "SELECT recorded_by FROM {} WHERE id = $1 AND {} = $2",
            kind.entry_table(),
            kind.entry_fk()
        ))
        .bind(entry_id)
        .bind(tool_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Entry not found".to_string()))?;

        if !can_delete_entry(recorded_by, &visible.relation) {
            return Err(ServiceError::Forbidden(
                "Only the author or an administrator can delete this entry".to_string(),
            ));
        }

        sqlx::query(&format!("DELETE FROM {} WHERE id = $1", kind.entry_table()))
            .bind(entry_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn fetch_header(&self, kind: ToolKind, tool_id: Uuid) -> ServiceResult<ToolHeader> {
        sqlx::query_as::<_, ToolHeader>(&format!("SELECT * FROM {} WHERE id = $1", kind.table()))
            .bind(tool_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("{} not found", capitalize(kind.label()))))
    }

    async fn visible_tool(&self, user_id: Uuid, kind: ToolKind, tool_id: Uuid) -> ServiceResult<VisibleTool> {
        let tool = self.fetch_header(kind, tool_id).await?;
        let relation = self.access().require_relation(user_id, tool.child_id).await?;
        let access_list = self.access().tool_access_list(kind, tool_id).await?;

        if !can_view_tool(&tool, &relation, &access_list) {
            tracing::warn!("User {} denied access to private {} {}", user_id, kind.label(), tool_id);
            return Err(ServiceError::Forbidden("You do not have access to this tool".to_string()));
        }

        Ok(VisibleTool {
            tool,
            relation,
            access_list,
        })
    }

    async fn managed_tool(&self, user_id: Uuid, kind: ToolKind, tool_id: Uuid) -> ServiceResult<VisibleTool> {
        let visible = self.visible_tool(user_id, kind, tool_id).await?;
        if !can_manage_tool(&visible.tool, &visible.relation) {
            return Err(ServiceError::Forbidden(
                "Only the creator or an administrator can change this tool".to_string(),
            ));
        }
        Ok(visible)
    }

    /// Every listed user must be related to the child
    async fn ensure_related(&self, child_id: Uuid, user_ids: &[Uuid]) -> ServiceResult<()> {
        if user_ids.is_empty() {
            return Ok(());
        }

        let related: Vec<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM user_child_relations WHERE child_id = $1 AND user_id = ANY($2)",
        )
        .bind(child_id)
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;

        let missing = missing_users(user_ids, &related);
        if !missing.is_empty() {
            return Err(ServiceError::BadRequest(format!(
                "Users are not related to this child: {}",
                missing.iter().map(Uuid::to_string).collect::<Vec<_>>().join(", ")
            )));
        }
        Ok(())
    }

    async fn notify_admins_of_entry(&self, author: &User, kind: ToolKind, tool: &ToolHeader) -> ServiceResult<()> {
        let admins: Vec<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM user_child_relations WHERE child_id = $1 AND is_administrator AND user_id <> $2",
        )
        .bind(tool.child_id)
        .bind(author.id)
        .fetch_all(&self.pool)
        .await?;

        NotificationService::new(self.pool.clone(), self.provider.clone())
            .notify_users(
                &admins,
                NewNotification {
                    child_id: Some(tool.child_id),
                    kind: NotificationKind::ToolEntry,
                    title: format!("Ny registrering i {}", kind.label()),
                    message: format!("{} har registreret en ny indtastning i '{}'", author.display_name(), tool.topic),
                },
            )
            .await?;
        Ok(())
    }
}

async fn replace_access_list(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    kind: ToolKind,
    tool_id: Uuid,
    user_ids: &[Uuid],
) -> ServiceResult<()> {
    sqlx::query("DELETE FROM tool_user_access WHERE tool_kind = $1 AND tool_id = $2")
        .bind(kind)
        .bind(tool_id)
        .execute(&mut **tx)
        .await?;

    if !user_ids.is_empty() {
        sqlx::query(
            r#"
            INSERT INTO tool_user_access (tool_kind, tool_id, user_id)
            SELECT $1, $2, u FROM UNNEST($3::uuid[]) AS u
            "#,
        )
        .bind(kind)
        .bind(tool_id)
        .bind(user_ids)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

fn parse_body<T: serde::de::DeserializeOwned>(body: serde_json::Value) -> ServiceResult<T> {
    serde_json::from_value(body).map_err(|e| ServiceError::BadRequest(format!("Invalid entry: {}", e)))
}

fn dedup(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.contains(id) {
            seen.push(*id);
        }
    }
    seen
}

fn missing_users(requested: &[Uuid], related: &[Uuid]) -> Vec<Uuid> {
    requested.iter().filter(|id| !related.contains(id)).copied().collect()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Entries may not be dated after today (UTC)
fn validate_entry_date(entry_date: NaiveDate, today: NaiveDate) -> ServiceResult<()> {
    if entry_date > today {
        return Err(ServiceError::field("entry_date", "Entries cannot be dated in the future"));
    }
    Ok(())
}

fn validate_range(range: &EntryRange) -> ServiceResult<()> {
    if let (Some(from), Some(to)) = (range.from, range.to) {
        if from > to {
            return Err(ServiceError::field("from", "'from' must not be after 'to'"));
        }
    }
    Ok(())
}

fn validate_bedtimes(input: &SengetiderEntryInput) -> ServiceResult<()> {
    if input.puttetid.is_none() && input.sov_kl.is_none() && input.vaagnede.is_none() {
        return Err(ServiceError::BadRequest(
            "At least one of puttetid, sov_kl or vaagnede is required".to_string(),
        ));
    }
    if let (Some(put), Some(slept)) = (input.puttetid, input.sov_kl) {
        if !falls_asleep_after(put, slept) {
            return Err(ServiceError::field("sov_kl", "Must not be before puttetid"));
        }
    }
    Ok(())
}

/// Bedtimes may cross midnight: put to bed 23:30 and asleep 00:15 is valid.
/// An earlier clock time counts as the next day only when it is within 12 hours.
fn falls_asleep_after(puttetid: NaiveTime, sov_kl: NaiveTime) -> bool {
    if sov_kl >= puttetid {
        return true;
    }
    let gap = sov_kl.signed_duration_since(puttetid) + Duration::hours(24);
    gap <= Duration::hours(12)
}
