use crate::domain::models::{
    derive_fields, normalize_course_code, Deadline, Module, RiskLevel, WeeklyWorkloadDraft,
};
use crate::time_utils::WeekCalendar;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Tunables for load scoring and the read-side views.
#[derive(Clone, Debug, Serialize)]
pub struct WorkloadSettings {
    pub credit_scale: i64,
    pub default_credits: i32,
    pub high_impact_weight: i32,
    pub high_impact_critical_count: usize,
    pub moderate_min: i64,
    pub critical_min: i64,
    pub alert_threshold: RiskLevel,
    pub summary_weeks: usize,
}

impl Default for WorkloadSettings {
    fn default() -> Self {
        Self {
            credit_scale: 5,
            default_credits: 3,
            high_impact_weight: 4,
            high_impact_critical_count: 2,
            moderate_min: 41,
            critical_min: 81,
            alert_threshold: RiskLevel::Moderate,
            summary_weeks: 8,
        }
    }
}

impl WorkloadSettings {
    /// High-impact override first, then the score bands.
    pub fn classify(&self, load_score: i64, high_impact_count: usize) -> RiskLevel {
        if high_impact_count >= self.high_impact_critical_count || load_score >= self.critical_min {
            RiskLevel::Critical
        } else if load_score >= self.moderate_min {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }

    pub fn is_elevated(&self, risk: RiskLevel) -> bool {
        risk >= self.alert_threshold
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WeekBucket {
    pub week_start: DateTime<Utc>,
    pub week_end: DateTime<Utc>,
    pub load_score: i64,
    pub deadline_ids: Vec<Uuid>,
    pub high_impact_count: usize,
    pub risk_level: RiskLevel,
}

impl WeekBucket {
    pub fn into_draft(self, user_id: Uuid) -> WeeklyWorkloadDraft {
        WeeklyWorkloadDraft {
            user_id,
            week_start: self.week_start,
            week_end: self.week_end,
            load_score: self.load_score,
            deadline_count: i32::try_from(self.deadline_ids.len()).unwrap_or(i32::MAX),
            deadline_ids: self.deadline_ids,
            risk_level: self.risk_level,
        }
    }
}

/// Course code to credit count, matched case-insensitively.
pub struct CreditTable {
    credits: HashMap<String, i32>,
    default_credits: i32,
}

impl CreditTable {
    pub fn new(modules: &[Module], default_credits: i32) -> Self {
        let credits = modules
            .iter()
            .map(|m| (normalize_course_code(&m.course_code), m.credits))
            .collect();
        Self {
            credits,
            default_credits,
        }
    }

    pub fn credits_for(&self, course_code: &str) -> i32 {
        self.credits
            .get(&normalize_course_code(course_code))
            .copied()
            .unwrap_or(self.default_credits)
    }
}

/// A deadline counts towards future load when it is still open and due on
/// or after the start of today.
pub fn is_pending(deadline: &Deadline, day_start: DateTime<Utc>) -> bool {
    !deadline.completed && deadline.due_date >= day_start
}

pub fn adjusted_weight(deadline: &Deadline, credits: &CreditTable, settings: &WorkloadSettings) -> i64 {
    let base_weight = i64::from(derive_fields(deadline.category).weight);
    let credit_hours = i64::from(credits.credits_for(&deadline.course_code))
        .saturating_mul(settings.credit_scale);
    base_weight.saturating_mul(credit_hours)
}

/// Groups deadlines into Monday weeks and scores each one. The result is
/// ordered by `week_start`; deadline ids inside a week follow due date.
pub fn bucket_by_week(
    deadlines: &[Deadline],
    modules: &[Module],
    calendar: &WeekCalendar,
    settings: &WorkloadSettings,
) -> Vec<WeekBucket> {
    let credits = CreditTable::new(modules, settings.default_credits);

    let mut ordered: Vec<&Deadline> = deadlines.iter().collect();
    ordered.sort_by_key(|d| d.due_date);

    let mut weeks: BTreeMap<DateTime<Utc>, WeekBucket> = BTreeMap::new();
    for deadline in ordered {
        let week_start = calendar.week_start(deadline.due_date);
        let bucket = weeks.entry(week_start).or_insert_with(|| WeekBucket {
            week_start,
            week_end: calendar.week_end(week_start),
            load_score: 0,
            deadline_ids: Vec::new(),
            high_impact_count: 0,
            risk_level: RiskLevel::Low,
        });

        bucket.load_score = bucket
            .load_score
            .saturating_add(adjusted_weight(deadline, &credits, settings));
        bucket.deadline_ids.push(deadline.id);
        if derive_fields(deadline.category).weight >= settings.high_impact_weight {
            bucket.high_impact_count += 1;
        }
    }

    weeks
        .into_values()
        .map(|mut bucket| {
            bucket.risk_level = settings.classify(bucket.load_score, bucket.high_impact_count);
            bucket
        })
        .collect()
}
