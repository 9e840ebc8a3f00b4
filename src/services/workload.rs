use crate::db::{StoreResult, WorkloadStore};
use crate::domain::models::WeeklyWorkload;
use crate::domain::projections::{self, Alert, InsightInput, Insights, Summary};
use crate::domain::scoring::{bucket_by_week, WorkloadSettings};
use crate::time_utils::WeekCalendar;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Upper bound for the `limit` query on the summary view.
pub const MAX_SUMMARY_WEEKS: usize = 52;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    /// Nothing pending, so there is nothing to compute.
    NoDeadlines,
    Current,
    Rebuilt,
}

pub struct WorkloadService<S> {
    store: Arc<S>,
    calendar: WeekCalendar,
    settings: WorkloadSettings,
}

impl<S> Clone for WorkloadService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            calendar: self.calendar,
            settings: self.settings.clone(),
        }
    }
}

impl<S: WorkloadStore> WorkloadService<S> {
    pub fn new(store: Arc<S>, calendar: WeekCalendar, settings: WorkloadSettings) -> Self {
        Self {
            store,
            calendar,
            settings,
        }
    }

    /// Scores every week that has pending deadlines and upserts one record
    /// per week. Weeks without pending deadlines are left untouched.
    ///
    /// Upserts are independent: if one fails, earlier weeks stay written and
    /// the error is returned.
    pub async fn recompute(&self, user_id: Uuid, now: DateTime<Utc>) -> StoreResult<Vec<WeeklyWorkload>> {
        let pending = self
            .store
            .pending_deadlines(user_id, self.calendar.day_start(now))
            .await?;
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        let modules = self.store.modules(user_id).await?;
        let buckets = bucket_by_week(&pending, &modules, &self.calendar, &self.settings);

        let mut written = Vec::with_capacity(buckets.len());
        for bucket in buckets {
            let draft = bucket.into_draft(user_id);
            written.push(self.store.upsert_workload(&draft, now).await?);
        }
        written.sort_by_key(|w| w.week_start);
        Ok(written)
    }

    /// Wipes the current and future weeks, then rebuilds them from scratch.
    /// Weeks before the current Monday are never touched.
    pub async fn sync_upcoming(&self, user_id: Uuid, now: DateTime<Utc>) -> StoreResult<Vec<WeeklyWorkload>> {
        let current_week = self.calendar.week_start(now);
        let removed = self.store.delete_workloads_from(user_id, current_week).await?;
        let rebuilt = self.recompute(user_id, now).await?;
        tracing::info!(
            %user_id,
            removed,
            weeks = rebuilt.len(),
            "Rebuilt upcoming workload"
        );
        Ok(rebuilt)
    }

    /// Rebuilds when a pending deadline changed after the newest upcoming
    /// weekly record, or when no upcoming record exists yet.
    pub async fn ensure_fresh(&self, user_id: Uuid, now: DateTime<Utc>) -> StoreResult<Freshness> {
        let latest_deadline = self
            .store
            .latest_pending_deadline_change(user_id, self.calendar.day_start(now))
            .await?;
        let Some(deadline_changed) = latest_deadline else {
            return Ok(Freshness::NoDeadlines);
        };

        let latest_workload = self
            .store
            .latest_workload_change(user_id, self.calendar.week_start(now))
            .await?;

        let stale = match latest_workload {
            Some(workload_changed) => deadline_changed > workload_changed,
            None => true,
        };

        if stale {
            tracing::debug!(%user_id, ?latest_workload, %deadline_changed, "Workload stale");
            self.sync_upcoming(user_id, now).await?;
            Ok(Freshness::Rebuilt)
        } else {
            Ok(Freshness::Current)
        }
    }

    /// Every weekly record for the user, past weeks included.
    pub async fn list_workloads(&self, user_id: Uuid, now: DateTime<Utc>) -> StoreResult<Vec<WeeklyWorkload>> {
        self.ensure_fresh(user_id, now).await?;
        self.store.workloads(user_id).await
    }

    pub async fn upcoming(&self, user_id: Uuid, now: DateTime<Utc>) -> StoreResult<Vec<WeeklyWorkload>> {
        self.ensure_fresh(user_id, now).await?;
        self.store
            .workloads_from(user_id, self.calendar.week_start(now))
            .await
    }

    pub async fn list_alerts(&self, user_id: Uuid, now: DateTime<Utc>) -> StoreResult<Vec<Alert>> {
        let upcoming = self.upcoming(user_id, now).await?;
        Ok(projections::alerts(&upcoming, &self.settings))
    }

    pub async fn summary(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
        limit: Option<usize>,
    ) -> StoreResult<Summary> {
        let limit = limit
            .unwrap_or(self.settings.summary_weeks)
            .clamp(1, MAX_SUMMARY_WEEKS);
        let upcoming = self.upcoming(user_id, now).await?;
        Ok(projections::summary(&upcoming, limit, &self.settings))
    }

    pub async fn insights(&self, user_id: Uuid, now: DateTime<Utc>) -> StoreResult<Insights> {
        let upcoming = self.upcoming(user_id, now).await?;
        let previous = self
            .store
            .workload_at(user_id, self.calendar.previous_week_start(now))
            .await?;
        let pending = self
            .store
            .pending_deadlines(user_id, self.calendar.day_start(now))
            .await?;

        Ok(projections::insights(
            InsightInput {
                current_week_start: self.calendar.week_start(now),
                upcoming: &upcoming,
                previous_week: previous.as_ref(),
                pending: &pending,
            },
            &self.settings,
        ))
    }
}
