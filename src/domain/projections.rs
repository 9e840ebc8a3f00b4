use crate::domain::models::{Category, Deadline, RiskLevel, WeeklyWorkload};
use crate::domain::scoring::WorkloadSettings;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    #[serde(flatten)]
    pub week: WeeklyWorkload,
    pub message: &'static str,
}

pub fn alert_message(risk: RiskLevel) -> &'static str {
    match risk {
        RiskLevel::Critical => "Critical workload week! Start preparing early.",
        RiskLevel::Moderate => "Moderate workload expected this week. Plan your time ahead.",
        RiskLevel::Low => "Light workload this week.",
    }
}

/// `upcoming` must already be limited to the current week onwards.
pub fn alerts(upcoming: &[WeeklyWorkload], settings: &WorkloadSettings) -> Vec<Alert> {
    upcoming
        .iter()
        .filter(|w| settings.is_elevated(w.risk_level))
        .map(|w| Alert {
            week: w.clone(),
            message: alert_message(w.risk_level),
        })
        .collect()
}

/// Highest load score; on ties the earliest week wins.
pub fn peak_week(upcoming: &[WeeklyWorkload]) -> Option<&WeeklyWorkload> {
    upcoming.iter().fold(None, |best: Option<&WeeklyWorkload>, week| match best {
        Some(b) if b.load_score >= week.load_score => Some(b),
        _ => Some(week),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub current_week: Option<WeeklyWorkload>,
    pub peak_week: Option<WeeklyWorkload>,
    pub upcoming: Vec<WeeklyWorkload>,
    pub elevated_weeks: usize,
}

pub fn summary(upcoming: &[WeeklyWorkload], limit: usize, settings: &WorkloadSettings) -> Summary {
    Summary {
        current_week: upcoming.first().cloned(),
        peak_week: peak_week(upcoming).cloned(),
        upcoming: upcoming.iter().take(limit).cloned().collect(),
        elevated_weeks: upcoming
            .iter()
            .filter(|w| settings.is_elevated(w.risk_level))
            .count(),
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Increasing,
    Decreasing,
}

#[derive(Debug, Clone, Serialize)]
pub struct Insights {
    pub current_load: i64,
    pub previous_load: i64,
    pub delta: i64,
    pub direction: Direction,
    pub category_breakdown: BTreeMap<Category, usize>,
    pub heavy_evaluations: usize,
    pub peak_week: Option<WeeklyWorkload>,
    pub alerts: usize,
    pub messages: Vec<String>,
}

pub struct InsightInput<'a> {
    pub current_week_start: DateTime<Utc>,
    pub upcoming: &'a [WeeklyWorkload],
    pub previous_week: Option<&'a WeeklyWorkload>,
    pub pending: &'a [Deadline],
}

pub fn insights(input: InsightInput<'_>, settings: &WorkloadSettings) -> Insights {
    let current_load = input
        .upcoming
        .iter()
        .find(|w| w.week_start == input.current_week_start)
        .map(|w| w.load_score)
        .unwrap_or(0);
    let previous_load = input.previous_week.map(|w| w.load_score).unwrap_or(0);
    let direction = if current_load >= previous_load {
        Direction::Increasing
    } else {
        Direction::Decreasing
    };

    let mut category_breakdown = BTreeMap::new();
    for deadline in input.pending {
        *category_breakdown.entry(deadline.category).or_insert(0) += 1;
    }
    let heavy_evaluations = input
        .pending
        .iter()
        .filter(|d| d.category.is_heavy_evaluation())
        .count();

    let alert_count = input
        .upcoming
        .iter()
        .filter(|w| settings.is_elevated(w.risk_level))
        .count();
    let peak = peak_week(input.upcoming).cloned();

    let mut messages = Vec::new();
    if alert_count > 0 {
        messages.push(format!(
            "You have {} week(s) flagged for elevated workload.",
            alert_count
        ));
    }
    if let Some(week) = peak.as_ref().filter(|w| w.load_score >= settings.critical_min) {
        messages.push(format!(
            "Your heaviest week starts {} with a load score of {}.",
            week.week_start.date_naive(),
            week.load_score
        ));
    }
    if alert_count == 0 {
        messages.push("Your upcoming workload looks balanced. Keep it up!".to_string());
    }
    if let Some(start) = first_back_to_back(input.upcoming, settings) {
        messages.push(format!(
            "Back-to-back heavy weeks starting {}. Spread your preparation.",
            start.date_naive()
        ));
    }
    if heavy_evaluations > 0 {
        messages.push(format!(
            "{} major exam(s) (midterms/finals) ahead.",
            heavy_evaluations
        ));
    }

    Insights {
        current_load,
        previous_load,
        delta: current_load - previous_load,
        direction,
        category_breakdown,
        heavy_evaluations,
        peak_week: peak,
        alerts: alert_count,
        messages,
    }
}

/// Start of the first pair of adjacent calendar weeks that are both elevated.
fn first_back_to_back(
    upcoming: &[WeeklyWorkload],
    settings: &WorkloadSettings,
) -> Option<DateTime<Utc>> {
    upcoming.windows(2).find_map(|pair| {
        let (a, b) = (&pair[0], &pair[1]);
        let adjacent = (b.week_start - a.week_start - Duration::days(7)).num_hours().abs() <= 1;
        (adjacent && settings.is_elevated(a.risk_level) && settings.is_elevated(b.risk_level))
            .then_some(a.week_start)
    })
}
