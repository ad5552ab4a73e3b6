use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use super::access::AccessService;
use super::notifications::{NewNotification, NotificationService};
use super::{optional_text, required_text, ServiceError, ServiceResult};
use crate::database::models::{Indsatstrappe, IndsatstrappeStep, NotificationKind, StepPeriod, User};
use crate::notify::NotificationProvider;

#[derive(Debug, Clone, Deserialize)]
pub struct NewStep {
    pub title: String,
    pub description: Option<String>,
    pub maalsaetning: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlan {
    pub title: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub steps: Vec<NewStep>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePlan {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateStep {
    pub title: Option<String>,
    pub description: Option<String>,
    pub maalsaetning: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReorderSteps {
    pub step_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    #[serde(flatten)]
    pub step: IndsatstrappeStep,
    /// True while the step has an open period
    pub is_active: bool,
    pub periods: Vec<StepPeriod>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanView {
    #[serde(flatten)]
    pub plan: Indsatstrappe,
    pub steps: Vec<StepView>,
}

pub struct IndsatstrappeService {
    pool: PgPool,
    provider: Arc<dyn NotificationProvider>,
}

impl IndsatstrappeService {
    pub fn new(pool: PgPool, provider: Arc<dyn NotificationProvider>) -> Self {
        Self { pool, provider }
    }

    fn access(&self) -> AccessService {
        AccessService::new(self.pool.clone())
    }

    pub async fn list(&self, user_id: Uuid, child_id: Uuid) -> ServiceResult<Vec<PlanView>> {
        self.access().require_relation(user_id, child_id).await?;

        let plans = sqlx::query_as::<_, Indsatstrappe>(
            "SELECT * FROM indsatstrappe WHERE child_id = $1 ORDER BY is_active DESC, created_at DESC",
        )
        .bind(child_id)
        .fetch_all(&self.pool)
        .await?;

        let mut views = Vec::with_capacity(plans.len());
        for plan in plans {
            views.push(self.load_view(plan).await?);
        }
        Ok(views)
    }

    /// New plans start active; any other plan of the child is deactivated
    pub async fn create(&self, user_id: Uuid, child_id: Uuid, input: &CreatePlan) -> ServiceResult<PlanView> {
        self.access().require_admin(user_id, child_id).await?;

        let title = required_text("title", &input.title, 200)?;
        let description = optional_text("description", input.description.as_deref(), 4000)?;
        validate_dates(input.start_date, input.target_date)?;

        let mut tx = self.pool.begin().await?;
        lock_child_plans(&mut tx, child_id).await?;
        deactivate_other_plans(&mut tx, child_id, None).await?;

        let plan = sqlx::query_as::<_, Indsatstrappe>(
            r#"
            INSERT INTO indsatstrappe (child_id, created_by, title, description, start_date, target_date, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE)
            RETURNING *
            "#,
        )
        .bind(child_id)
        .bind(user_id)
        .bind(&title)
        .bind(&description)
        .bind(input.start_date)
        .bind(input.target_date)
        .fetch_one(&mut *tx)
        .await?;

        for (index, step) in input.steps.iter().enumerate() {
            insert_step(&mut tx, plan.id, index as i32 + 1, step).await?;
        }

        tx.commit().await?;

        tracing::info!("User {} created indsatstrappe {} for child {}", user_id, plan.id, child_id);
        self.load_view(plan).await
    }

    pub async fn get(&self, user_id: Uuid, plan_id: Uuid) -> ServiceResult<PlanView> {
        let plan = self.fetch_plan(plan_id).await?;
        self.access().require_relation(user_id, plan.child_id).await?;
        self.load_view(plan).await
    }

    pub async fn update(&self, user_id: Uuid, plan_id: Uuid, input: &UpdatePlan) -> ServiceResult<PlanView> {
        let plan = self.admin_plan(user_id, plan_id).await?;

        let title = match &input.title {
            Some(title) => Some(required_text("title", title, 200)?),
            None => None,
        };
        let description = optional_text("description", input.description.as_deref(), 4000)?;
        validate_dates(
            input.start_date.or(plan.start_date),
            input.target_date.or(plan.target_date),
        )?;
        if input.is_active == Some(true) && plan.is_completed {
            return Err(ServiceError::BadRequest("A completed plan cannot be activated".to_string()));
        }

        let mut tx = self.pool.begin().await?;
        lock_child_plans(&mut tx, plan.child_id).await?;
        match input.is_active {
            Some(true) if !plan.is_active => deactivate_other_plans(&mut tx, plan.child_id, Some(plan.id)).await?,
            Some(false) if plan.is_active => close_plan_periods(&mut tx, plan.id).await?,
            _ => {}
        }

        let updated = sqlx::query_as::<_, Indsatstrappe>(
            r#"
            UPDATE indsatstrappe
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                start_date = COALESCE($4, start_date),
                target_date = COALESCE($5, target_date),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(plan_id)
        .bind(&title)
        .bind(&description)
        .bind(input.start_date)
        .bind(input.target_date)
        .bind(input.is_active)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        self.load_view(updated).await
    }

    pub async fn delete(&self, user_id: Uuid, plan_id: Uuid) -> ServiceResult<()> {
        self.admin_plan(user_id, plan_id).await?;

        sqlx::query("DELETE FROM indsatstrappe WHERE id = $1")
            .bind(plan_id)
            .execute(&self.pool)
            .await?;

        tracing::info!("User {} deleted indsatstrappe {}", user_id, plan_id);
        Ok(())
    }

    pub async fn complete(&self, user_id: Uuid, plan_id: Uuid) -> ServiceResult<PlanView> {
        self.admin_plan(user_id, plan_id).await?;

        let mut tx = self.pool.begin().await?;
        lock_plan(&mut tx, plan_id).await?;
        close_plan_periods(&mut tx, plan_id).await?;

        let plan = sqlx::query_as::<_, Indsatstrappe>(
            r#"
            UPDATE indsatstrappe
            SET is_completed = TRUE,
                is_active = FALSE,
                completed_at = COALESCE(completed_at, NOW()),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(plan_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        self.load_view(plan).await
    }

    /// Appends the step after the current last one
    pub async fn add_step(&self, user_id: Uuid, plan_id: Uuid, input: &NewStep) -> ServiceResult<IndsatstrappeStep> {
        self.admin_plan(user_id, plan_id).await?;

        let mut tx = self.pool.begin().await?;
        lock_plan(&mut tx, plan_id).await?;
        let last: Option<i32> = sqlx::query_scalar(
            "SELECT MAX(step_number) FROM indsatstrappe_steps WHERE indsatstrappe_id = $1",
        )
        .bind(plan_id)
        .fetch_one(&mut *tx)
        .await?;

        let step = insert_step(&mut tx, plan_id, last.unwrap_or(0) + 1, input).await?;
        tx.commit().await?;
        Ok(step)
    }

    pub async fn update_step(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        step_id: Uuid,
        input: &UpdateStep,
    ) -> ServiceResult<IndsatstrappeStep> {
        self.admin_plan(user_id, plan_id).await?;

        let title = match &input.title {
            Some(title) => Some(required_text("title", title, 200)?),
            None => None,
        };

        sqlx::query_as::<_, IndsatstrappeStep>(
            r#"
            UPDATE indsatstrappe_steps
            SET title = COALESCE($3, title),
                description = COALESCE($4, description),
                maalsaetning = COALESCE($5, maalsaetning),
                updated_at = NOW()
            WHERE id = $1 AND indsatstrappe_id = $2
            RETURNING *
            "#,
        )
        .bind(step_id)
        .bind(plan_id)
        .bind(&title)
        .bind(optional_text("description", input.description.as_deref(), 4000)?)
        .bind(optional_text("maalsaetning", input.maalsaetning.as_deref(), 4000)?)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(step_not_found)
    }

    /// Remaining steps are renumbered 1..n in their existing order
    pub async fn delete_step(&self, user_id: Uuid, plan_id: Uuid, step_id: Uuid) -> ServiceResult<()> {
        self.admin_plan(user_id, plan_id).await?;

        let mut tx = self.pool.begin().await?;
        lock_plan(&mut tx, plan_id).await?;
        let deleted = sqlx::query("DELETE FROM indsatstrappe_steps WHERE id = $1 AND indsatstrappe_id = $2")
            .bind(step_id)
            .bind(plan_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(step_not_found());
        }

        let remaining = ordered_step_ids(&mut tx, plan_id).await?;
        apply_numbering(&mut tx, &remaining).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn reorder(&self, user_id: Uuid, plan_id: Uuid, input: &ReorderSteps) -> ServiceResult<Vec<IndsatstrappeStep>> {
        self.admin_plan(user_id, plan_id).await?;

        let mut tx = self.pool.begin().await?;
        lock_plan(&mut tx, plan_id).await?;
        let current = ordered_step_ids(&mut tx, plan_id).await?;
        if !is_permutation(&current, &input.step_ids) {
            return Err(ServiceError::BadRequest(
                "step_ids must list every step of the plan exactly once".to_string(),
            ));
        }

        apply_numbering(&mut tx, &input.step_ids).await?;
        let steps = fetch_steps(&mut tx, plan_id).await?;
        tx.commit().await?;
        Ok(steps)
    }

    /// Opens a period for the step, closing whichever step was active before.
    /// Everyone else related to the child is notified.
    pub async fn activate_step(&self, user: &User, plan_id: Uuid, step_id: Uuid) -> ServiceResult<StepView> {
        self.admin_plan(user.id, plan_id).await?;

        // The plan row lock serializes activations so only one period is ever open per plan.
        let mut tx = self.pool.begin().await?;
        let plan = lock_plan(&mut tx, plan_id).await?;
        if plan.is_completed || !plan.is_active {
            return Err(ServiceError::BadRequest(
                "Steps can only be activated on an active plan".to_string(),
            ));
        }

        let step = lock_step(&mut tx, plan_id, step_id).await?;
        if step.is_completed {
            return Err(ServiceError::BadRequest("A completed step cannot be activated".to_string()));
        }

        let open = open_period(&mut tx, step_id).await?;
        if open.is_some() {
            tx.commit().await?;
            return self.step_view(step).await;
        }

        close_plan_periods(&mut tx, plan_id).await?;
        sqlx::query("INSERT INTO step_periods (step_id, activated_by) VALUES ($1, $2)")
            .bind(step_id)
            .bind(user.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!("User {} activated step {} of indsatstrappe {}", user.id, step_id, plan_id);

        if let Err(e) = self.notify_step_activated(user, &plan, &step).await {
            tracing::warn!("Failed to notify about activated step {}: {}", step_id, e);
        }

        self.step_view(step).await
    }

    async fn notify_step_activated(
        &self,
        user: &User,
        plan: &Indsatstrappe,
        step: &IndsatstrappeStep,
    ) -> ServiceResult<u64> {
        let recipients: Vec<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM user_child_relations WHERE child_id = $1 AND user_id <> $2",
        )
        .bind(plan.child_id)
        .bind(user.id)
        .fetch_all(&self.pool)
        .await?;

        NotificationService::new(self.pool.clone(), self.provider.clone())
            .notify_users(
                &recipients,
                NewNotification {
                    child_id: Some(plan.child_id),
                    kind: NotificationKind::StepActivated,
                    title: format!("Trin {} er aktiveret", step.step_number),
                    message: format!(
                        "{} har aktiveret trinnet '{}' i '{}'",
                        user.display_name(),
                        step.title,
                        plan.title
                    ),
                },
            )
            .await
    }

    pub async fn deactivate_step(&self, user_id: Uuid, plan_id: Uuid, step_id: Uuid) -> ServiceResult<StepView> {
        self.admin_plan(user_id, plan_id).await?;

        let mut tx = self.pool.begin().await?;
        let step = lock_step(&mut tx, plan_id, step_id).await?;
        close_step_period(&mut tx, step_id).await?;
        tx.commit().await?;

        self.step_view(step).await
    }

    pub async fn complete_step(&self, user_id: Uuid, plan_id: Uuid, step_id: Uuid) -> ServiceResult<StepView> {
        self.admin_plan(user_id, plan_id).await?;

        let mut tx = self.pool.begin().await?;
        lock_step(&mut tx, plan_id, step_id).await?;
        close_step_period(&mut tx, step_id).await?;

        let step = sqlx::query_as::<_, IndsatstrappeStep>(
            r#"
            UPDATE indsatstrappe_steps
            SET is_completed = TRUE,
                completed_at = COALESCE(completed_at, NOW()),
                completed_by = COALESCE(completed_by, $2),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(step_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        self.step_view(step).await
    }

    pub async fn reopen_step(&self, user_id: Uuid, plan_id: Uuid, step_id: Uuid) -> ServiceResult<StepView> {
        self.admin_plan(user_id, plan_id).await?;

        let step = sqlx::query_as::<_, IndsatstrappeStep>(
            r#"
            UPDATE indsatstrappe_steps
            SET is_completed = FALSE, completed_at = NULL, completed_by = NULL, updated_at = NOW()
            WHERE id = $1 AND indsatstrappe_id = $2
            RETURNING *
            "#,
        )
        .bind(step_id)
        .bind(plan_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(step_not_found)?;

        self.step_view(step).await
    }

    /// Every period of the plan, oldest activation first
    pub async fn periods(&self, user_id: Uuid, plan_id: Uuid) -> ServiceResult<Vec<StepPeriod>> {
        let plan = self.fetch_plan(plan_id).await?;
        self.access().require_relation(user_id, plan.child_id).await?;

        let periods = sqlx::query_as::<_, StepPeriod>(
            r#"
            SELECT p.* FROM step_periods p
            JOIN indsatstrappe_steps s ON s.id = p.step_id
            WHERE s.indsatstrappe_id = $1
            ORDER BY p.activated_at
            "#,
        )
        .bind(plan_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(periods)
    }

    async fn fetch_plan(&self, plan_id: Uuid) -> ServiceResult<Indsatstrappe> {
        sqlx::query_as::<_, Indsatstrappe>("SELECT * FROM indsatstrappe WHERE id = $1")
            .bind(plan_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Indsatstrappe not found".to_string()))
    }

    async fn admin_plan(&self, user_id: Uuid, plan_id: Uuid) -> ServiceResult<Indsatstrappe> {
        let plan = self.fetch_plan(plan_id).await?;
        self.access().require_admin(user_id, plan.child_id).await?;
        Ok(plan)
    }

    async fn load_view(&self, plan: Indsatstrappe) -> ServiceResult<PlanView> {
        let steps = sqlx::query_as::<_, IndsatstrappeStep>(
            "SELECT * FROM indsatstrappe_steps WHERE indsatstrappe_id = $1 ORDER BY step_number",
        )
        .bind(plan.id)
        .fetch_all(&self.pool)
        .await?;

        let step_ids: Vec<Uuid> = steps.iter().map(|s| s.id).collect();
        let periods = sqlx::query_as::<_, StepPeriod>(
            "SELECT * FROM step_periods WHERE step_id = ANY($1) ORDER BY activated_at",
        )
        .bind(&step_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(PlanView {
            plan,
            steps: attach_periods(steps, periods),
        })
    }

    async fn step_view(&self, step: IndsatstrappeStep) -> ServiceResult<StepView> {
        let periods = sqlx::query_as::<_, StepPeriod>(
            "SELECT * FROM step_periods WHERE step_id = $1 ORDER BY activated_at",
        )
        .bind(step.id)
        .fetch_all(&self.pool)
        .await?;

        let mut views = attach_periods(vec![step], periods);
        views.pop().ok_or_else(step_not_found)
    }
}

fn step_not_found() -> ServiceError {
    ServiceError::NotFound("Step not found".to_string())
}

async fn insert_step(
    tx: &mut Transaction<'_, Postgres>,
    plan_id: Uuid,
    step_number: i32,
    input: &NewStep,
) -> ServiceResult<IndsatstrappeStep> {
    let title = required_text("title", &input.title, 200)?;

    let step = sqlx::query_as::<_, IndsatstrappeStep>(
        r#"
        INSERT INTO indsatstrappe_steps (indsatstrappe_id, step_number, title, description, maalsaetning)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(plan_id)
    .bind(step_number)
    .bind(&title)
    .bind(optional_text("description", input.description.as_deref(), 4000)?)
    .bind(optional_text("maalsaetning", input.maalsaetning.as_deref(), 4000)?)
    .fetch_one(&mut **tx)
    .await?;

    Ok(step)
}

async fn lock_plan(tx: &mut Transaction<'_, Postgres>, plan_id: Uuid) -> ServiceResult<Indsatstrappe> {
    sqlx::query_as::<_, Indsatstrappe>("SELECT * FROM indsatstrappe WHERE id = $1 FOR UPDATE")
        .bind(plan_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Indsatstrappe not found".to_string()))
}

/// Locks every plan of the child in a stable order
async fn lock_child_plans(tx: &mut Transaction<'_, Postgres>, child_id: Uuid) -> ServiceResult<()> {
    sqlx::query("SELECT id FROM indsatstrappe WHERE child_id = $1 ORDER BY id FOR UPDATE")
        .bind(child_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn lock_step(
    tx: &mut Transaction<'_, Postgres>,
    plan_id: Uuid,
    step_id: Uuid,
) -> ServiceResult<IndsatstrappeStep> {
    sqlx::query_as::<_, IndsatstrappeStep>(
        "SELECT * FROM indsatstrappe_steps WHERE id = $1 AND indsatstrappe_id = $2 FOR UPDATE",
    )
    .bind(step_id)
    .bind(plan_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(step_not_found)
}

async fn open_period(tx: &mut Transaction<'_, Postgres>, step_id: Uuid) -> ServiceResult<Option<StepPeriod>> {
    let period = sqlx::query_as::<_, StepPeriod>(
        "SELECT * FROM step_periods WHERE step_id = $1 AND deactivated_at IS NULL",
    )
    .bind(step_id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(period)
}

async fn close_step_period(tx: &mut Transaction<'_, Postgres>, step_id: Uuid) -> ServiceResult<u64> {
    let closed = sqlx::query(
        "UPDATE step_periods SET deactivated_at = NOW() WHERE step_id = $1 AND deactivated_at IS NULL",
    )
    .bind(step_id)
    .execute(&mut **tx)
    .await?
    .rows_affected();
    Ok(closed)
}

async fn close_plan_periods(tx: &mut Transaction<'_, Postgres>, plan_id: Uuid) -> ServiceResult<()> {
    sqlx::query(
        r#"
        UPDATE step_periods SET deactivated_at = NOW()
        WHERE deactivated_at IS NULL
          AND step_id IN (SELECT id FROM indsatstrappe_steps WHERE indsatstrappe_id = $1)
        "#,
    )
    .bind(plan_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Deactivates the child's other plans and closes their open periods
async fn deactivate_other_plans(
    tx: &mut Transaction<'_, Postgres>,
    child_id: Uuid,
    keep: Option<Uuid>,
) -> ServiceResult<()> {
    let deactivated: Vec<Uuid> = sqlx::query_scalar(
        r#"
        UPDATE indsatstrappe SET is_active = FALSE, updated_at = NOW()
        WHERE child_id = $1 AND is_active AND ($2::uuid IS NULL OR id <> $2)
        RETURNING id
        "#,
    )
    .bind(child_id)
    .bind(keep)
    .fetch_all(&mut **tx)
    .await?;

    for plan_id in deactivated {
        close_plan_periods(tx, plan_id).await?;
    }
    Ok(())
}

async fn ordered_step_ids(tx: &mut Transaction<'_, Postgres>, plan_id: Uuid) -> ServiceResult<Vec<Uuid>> {
    let ids = sqlx::query_scalar(
        "SELECT id FROM indsatstrappe_steps WHERE indsatstrappe_id = $1 ORDER BY step_number FOR UPDATE",
    )
    .bind(plan_id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(ids)
}

async fn fetch_steps(tx: &mut Transaction<'_, Postgres>, plan_id: Uuid) -> ServiceResult<Vec<IndsatstrappeStep>> {
    let steps = sqlx::query_as::<_, IndsatstrappeStep>(
        "SELECT * FROM indsatstrappe_steps WHERE indsatstrappe_id = $1 ORDER BY step_number",
    )
    .bind(plan_id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(steps)
}

/// The (step_number) uniqueness constraint is deferred, so numbers may collide until commit
async fn apply_numbering(tx: &mut Transaction<'_, Postgres>, ordered_ids: &[Uuid]) -> ServiceResult<()> {
    let (ids, numbers): (Vec<Uuid>, Vec<i32>) = numbering(ordered_ids).into_iter().unzip();
    sqlx::query(
        r#"
        UPDATE indsatstrappe_steps s
        SET step_number = n.step_number, updated_at = NOW()
        FROM UNNEST($1::uuid[], $2::int[]) AS n(id, step_number)
        WHERE s.id = n.id AND s.step_number <> n.step_number
        "#,
    )
    .bind(&ids)
    .bind(&numbers)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Contiguous 1-based step numbers in the given order
fn numbering(ordered_ids: &[Uuid]) -> Vec<(Uuid, i32)> {
    ordered_ids
        .iter()
        .enumerate()
        .map(|(index, id)| (*id, index as i32 + 1))
        .collect()
}

fn is_permutation(current: &[Uuid], requested: &[Uuid]) -> bool {
    if current.len() != requested.len() {
        return false;
    }
    let current: HashSet<&Uuid> = current.iter().collect();
    let requested_set: HashSet<&Uuid> = requested.iter().collect();
    requested_set.len() == requested.len() && current == requested_set
}

fn validate_dates(start: Option<NaiveDate>, target: Option<NaiveDate>) -> ServiceResult<()> {
    if let (Some(start), Some(target)) = (start, target) {
        if target < start {
            return Err(ServiceError::field("target_date", "Must not be before start_date"));
        }
    }
    Ok(())
}

fn attach_periods(steps: Vec<IndsatstrappeStep>, periods: Vec<StepPeriod>) -> Vec<StepView> {
    steps
        .into_iter()
        .map(|step| {
            let periods: Vec<StepPeriod> = periods.iter().filter(|p| p.step_id == step.id).cloned().collect();
            StepView {
                is_active: periods.iter().any(StepPeriod::is_open),
                step,
                periods,
            }
        })
        .collect()
}
