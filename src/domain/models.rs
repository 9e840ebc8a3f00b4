use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[sqlx(type_name = "deadline_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Assignment,
    Reading,
    Quiz,
    Viva,
    Project,
    Exam,
    Midterm,
    Final,
}

impl Category {
    /// Midterms and finals count as "heavy" evaluations in insights.
    pub fn is_heavy_evaluation(&self) -> bool {
        matches!(self, Category::Midterm | Category::Final)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "impact_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl ImpactLevel {
    pub fn from_weight(weight: i32) -> Self {
        match weight {
            i32::MIN..=1 => ImpactLevel::Low,
            2 => ImpactLevel::Medium,
            3 => ImpactLevel::High,
            _ => ImpactLevel::Critical,
        }
    }
}

/// Severity of a week bucket. Variant order is severity order, so
/// `risk >= threshold` comparisons work directly.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, PartialOrd, Ord)]
#[sqlx(type_name = "risk_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown risk level {0:?}, expected low, moderate or critical")]
pub struct UnknownRiskLevel(pub String);

impl FromStr for RiskLevel {
    type Err = UnknownRiskLevel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "moderate" => Ok(RiskLevel::Moderate),
            "critical" => Ok(RiskLevel::Critical),
            _ => Err(UnknownRiskLevel(value.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DerivedFields {
    pub weight: i32,
    pub impact_level: ImpactLevel,
}

/// Weight and impact level are a function of the category alone. Every
/// deadline write goes through here so the stored values cannot drift.
pub fn derive_fields(category: Category) -> DerivedFields {
    let weight = match category {
        Category::Reading | Category::Assignment => 1,
        Category::Quiz => 2,
        Category::Viva | Category::Project => 3,
        Category::Midterm | Category::Exam => 4,
        Category::Final => 5,
    };
    DerivedFields {
        weight,
        impact_level: ImpactLevel::from_weight(weight),
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, FromRow)]
pub struct Deadline {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub course_code: String,
    pub category: Category,
    pub due_date: DateTime<Utc>,
    pub estimated_hours: f64,
    pub completed: bool,
    pub weight: i32,
    pub impact_level: ImpactLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, FromRow)]
pub struct Module {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_code: String,
    pub name: Option<String>,
    pub credits: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Course codes are matched case-insensitively; this is the stored form.
pub fn normalize_course_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

#[derive(Clone, Debug, Serialize, Deserialize, FromRow, PartialEq)]
pub struct WeeklyWorkload {
    pub id: Uuid,
    pub user_id: Uuid,
    pub week_start: DateTime<Utc>,
    pub week_end: DateTime<Utc>,
    pub load_score: i64,
    pub deadline_count: i32,
    pub deadline_ids: Vec<Uuid>,
    pub risk_level: RiskLevel,
    pub updated_at: DateTime<Utc>,
}

/// The non-key fields of a weekly record as produced by the scorer. Stores
/// replace every one of them on upsert.
#[derive(Clone, Debug, PartialEq)]
pub struct WeeklyWorkloadDraft {
    pub user_id: Uuid,
    pub week_start: DateTime<Utc>,
    pub week_end: DateTime<Utc>,
    pub load_score: i64,
    pub deadline_count: i32,
    pub deadline_ids: Vec<Uuid>,
    pub risk_level: RiskLevel,
}
