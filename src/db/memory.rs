//! In-memory `WorkloadStore` for service tests.

use super::{StoreResult, WorkloadStore};
use crate::domain::models::{Deadline, Module, WeeklyWorkload, WeeklyWorkloadDraft};
use crate::domain::scoring::is_pending;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    deadlines: RwLock<Vec<Deadline>>,
    modules: RwLock<Vec<Module>>,
    workloads: RwLock<Vec<WeeklyWorkload>>,
    rebuild_deletes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_deadline(&self, deadline: Deadline) {
        let mut deadlines = self.deadlines.write().await;
        deadlines.retain(|d| d.id != deadline.id);
        deadlines.push(deadline);
    }

    pub async fn put_module(&self, module: Module) {
        self.modules.write().await.push(module);
    }

    pub async fn put_workload(&self, workload: WeeklyWorkload) {
        self.workloads.write().await.push(workload);
    }

    pub async fn clear_deadlines(&self) {
        self.deadlines.write().await.clear();
    }

    pub async fn all_workloads(&self) -> Vec<WeeklyWorkload> {
        let mut rows = self.workloads.read().await.clone();
        rows.sort_by_key(|w| w.week_start);
        rows
    }

    /// How many times upcoming weeks were wiped, i.e. how many rebuilds ran.
    pub fn rebuild_count(&self) -> usize {
        self.rebuild_deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkloadStore for MemoryStore {
    async fn pending_deadlines(&self, user_id: Uuid, from: DateTime<Utc>) -> StoreResult<Vec<Deadline>> {
        let mut rows: Vec<Deadline> = self
            .deadlines
            .read()
            .await
            .iter()
            .filter(|d| d.user_id == user_id && is_pending(d, from))
            .cloned()
            .collect();
        rows.sort_by_key(|d| d.due_date);
        Ok(rows)
    }

    async fn modules(&self, user_id: Uuid) -> StoreResult<Vec<Module>> {
        Ok(self
            .modules
            .read()
            .await
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn upsert_workload(
        &self,
        draft: &WeeklyWorkloadDraft,
        now: DateTime<Utc>,
    ) -> StoreResult<WeeklyWorkload> {
        let mut rows = self.workloads.write().await;
        let existing = rows
            .iter_mut()
            .find(|w| w.user_id == draft.user_id && w.week_start == draft.week_start);

        let record = match existing {
            Some(row) => {
                row.week_end = draft.week_end;
                row.load_score = draft.load_score;
                row.deadline_count = draft.deadline_count;
                row.deadline_ids = draft.deadline_ids.clone();
                row.risk_level = draft.risk_level;
                row.updated_at = now;
                row.clone()
            }
            None => {
                let row = WeeklyWorkload {
                    id: Uuid::new_v4(),
                    user_id: draft.user_id,
                    week_start: draft.week_start,
                    week_end: draft.week_end,
                    load_score: draft.load_score,
                    deadline_count: draft.deadline_count,
                    deadline_ids: draft.deadline_ids.clone(),
                    risk_level: draft.risk_level,
                    updated_at: now,
                };
                rows.push(row.clone());
                row
            }
        };
        Ok(record)
    }

    async fn delete_workloads_from(&self, user_id: Uuid, week_start: DateTime<Utc>) -> StoreResult<u64> {
        self.rebuild_deletes.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.workloads.write().await;
        let before = rows.len();
        rows.retain(|w| !(w.user_id == user_id && w.week_start >= week_start));
        Ok((before - rows.len()) as u64)
    }

    async fn latest_pending_deadline_change(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
    ) -> StoreResult<Option<DateTime<Utc>>> {
        Ok(self
            .deadlines
            .read()
            .await
            .iter()
            .filter(|d| d.user_id == user_id && is_pending(d, from))
            .map(|d| d.updated_at)
            .max())
    }

    async fn latest_workload_change(
        &self,
        user_id: Uuid,
        week_start: DateTime<Utc>,
    ) -> StoreResult<Option<DateTime<Utc>>> {
        Ok(self
            .workloads
            .read()
            .await
            .iter()
            .filter(|w| w.user_id == user_id && w.week_start >= week_start)
            .map(|w| w.updated_at)
            .max())
    }

    async fn workloads(&self, user_id: Uuid) -> StoreResult<Vec<WeeklyWorkload>> {
        Ok(self
            .all_workloads()
            .await
            .into_iter()
            .filter(|w| w.user_id == user_id)
            .collect())
    }

    async fn workloads_from(&self, user_id: Uuid, week_start: DateTime<Utc>) -> StoreResult<Vec<WeeklyWorkload>> {
        Ok(self
            .workloads(user_id)
            .await?
            .into_iter()
            .filter(|w| w.week_start >= week_start)
            .collect())
    }

    async fn workload_at(&self, user_id: Uuid, week_start: DateTime<Utc>) -> StoreResult<Option<WeeklyWorkload>> {
        Ok(self
            .workloads(user_id)
            .await?
            .into_iter()
            .find(|w| w.week_start == week_start))
    }
}
