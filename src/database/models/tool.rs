use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The check-in tools a child can have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "tool_kind", rename_all = "snake_case")]
#[serde(rename_all = "kebab-case")]
pub enum ToolKind {
    Barometer,
    DagensSmiley,
    Sengetider,
}

impl ToolKind {
    /// Table holding the tool headers
    pub fn table(&self) -> &'static str {
        match self {
            ToolKind::Barometer => "barometers",
            ToolKind::DagensSmiley => "dagens_smiley",
            ToolKind::Sengetider => "sengetider",
        }
    }

    /// Table holding the tool's entries
    pub fn entry_table(&self) -> &'static str {
        match self {
            ToolKind::Barometer => "barometer_entries",
            ToolKind::DagensSmiley => "dagens_smiley_entries",
            ToolKind::Sengetider => "sengetider_entries",
        }
    }

    /// Foreign key column in the entry table
    pub fn entry_fk(&self) -> &'static str {
        match self {
            ToolKind::Barometer => "barometer_id",
            ToolKind::DagensSmiley => "smiley_id",
            ToolKind::Sengetider => "sengetider_id",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ToolKind::Barometer => "barometer",
            ToolKind::DagensSmiley => "dagens smiley",
            ToolKind::Sengetider => "sengetider",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "barometer_scale")]
pub enum ScaleType {
    #[sqlx(rename = "1-5")]
    #[serde(rename = "1-5")]
    OneToFive,
    #[sqlx(rename = "1-10")]
    #[serde(rename = "1-10")]
    OneToTen,
    #[sqlx(rename = "smileys")]
    #[serde(rename = "smileys")]
    Smileys,
}

impl Default for ScaleType {
    fn default() -> Self {
        ScaleType::OneToFive
    }
}

impl ScaleType {
    /// Inclusive rating bounds for entries on this scale
    pub fn bounds(&self) -> (i32, i32) {
        match self {
            ScaleType::OneToFive => (1, 5),
            ScaleType::OneToTen => (1, 10),
            ScaleType::Smileys => (1, 5),
        }
    }

    pub fn accepts(&self, rating: i32) -> bool {
        let (min, max) = self.bounds();
        (min..=max).contains(&rating)
    }
}

/// Columns shared by all tool tables, plus the barometer settings when present
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ToolHeader {
    pub id: Uuid,
    pub child_id: Uuid,
    pub created_by: Uuid,
    pub topic: String,
    pub description: Option<String>,
    pub is_public: bool,
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_type: Option<ScaleType>,
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_type: Option<String>,
    #[sqlx(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smiley_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BarometerEntry {
    pub id: Uuid,
    pub barometer_id: Uuid,
    pub recorded_by: Uuid,
    pub entry_date: NaiveDate,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DagensSmileyEntry {
    pub id: Uuid,
    pub smiley_id: Uuid,
    pub recorded_by: Uuid,
    pub entry_date: NaiveDate,
    pub selected_emoji: String,
    pub reasoning: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SengetiderEntry {
    pub id: Uuid,
    pub sengetider_id: Uuid,
    pub recorded_by: Uuid,
    pub entry_date: NaiveDate,
    pub puttetid: Option<NaiveTime>,
    pub sov_kl: Option<NaiveTime>,
    pub vaagnede: Option<NaiveTime>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_bounds() {
        assert!(ScaleType::OneToFive.accepts(5));
        assert!(!ScaleType::OneToFive.accepts(6));
        assert!(ScaleType::OneToTen.accepts(10));
        assert!(!ScaleType::Smileys.accepts(0));
    }

    #[test]
    fn tool_kind_uses_kebab_case_on_the_wire() {
        let kind: ToolKind = serde_json::from_str("\"dagens-smiley\"").unwrap();
        assert_eq!(kind, ToolKind::DagensSmiley);
        assert_eq!(serde_json::to_string(&ToolKind::Sengetider).unwrap(), "\"sengetider\"");
    }

    #[test]
    fn scale_type_wire_names() {
        let scale: ScaleType = serde_json::from_str("\"1-10\"").unwrap();
        assert_eq!(scale, ScaleType::OneToTen);
        assert_eq!(ScaleType::default(), ScaleType::OneToFive);
    }
}
