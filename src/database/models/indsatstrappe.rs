use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A staged intervention plan for a child
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Indsatstrappe {
    pub id: Uuid,
    pub child_id: Uuid,
    pub created_by: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    pub is_active: bool,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct IndsatstrappeStep {
    pub id: Uuid,
    pub indsatstrappe_id: Uuid,
    pub step_number: i32,
    pub title: String,
    pub description: Option<String>,
    pub maalsaetning: Option<String>,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One activation interval of a step; open while `deactivated_at` is unset
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StepPeriod {
    pub id: Uuid,
    pub step_id: Uuid,
    pub activated_at: DateTime<Utc>,
    pub deactivated_at: Option<DateTime<Utc>>,
    pub activated_by: Option<Uuid>,
}

impl StepPeriod {
    pub fn is_open(&self) -> bool {
        self.deactivated_at.is_none()
    }
}
