#[cfg(test)]
pub mod memory;

use crate::domain::models::{
    derive_fields, normalize_course_code, Category, Deadline, Module, WeeklyWorkload,
    WeeklyWorkloadDraft,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("duplicate record: {0}")]
    Conflict(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

fn map_unique(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::Conflict(db_err.message().to_string());
        }
    }
    StoreError::Database(err)
}

/// Everything the workload aggregator reads and writes.
#[async_trait]
pub trait WorkloadStore: Send + Sync {
    /// Incomplete deadlines due at or after `from`, ordered by due date.
    async fn pending_deadlines(&self, user_id: Uuid, from: DateTime<Utc>) -> StoreResult<Vec<Deadline>>;

    async fn modules(&self, user_id: Uuid) -> StoreResult<Vec<Module>>;

    /// Insert or fully replace the record keyed by `(user_id, week_start)`.
    async fn upsert_workload(
        &self,
        draft: &WeeklyWorkloadDraft,
        now: DateTime<Utc>,
    ) -> StoreResult<WeeklyWorkload>;

    async fn delete_workloads_from(&self, user_id: Uuid, week_start: DateTime<Utc>) -> StoreResult<u64>;

    async fn latest_pending_deadline_change(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
    ) -> StoreResult<Option<DateTime<Utc>>>;

    async fn latest_workload_change(
        &self,
        user_id: Uuid,
        week_start: DateTime<Utc>,
    ) -> StoreResult<Option<DateTime<Utc>>>;

    /// All records for the user, oldest week first.
    async fn workloads(&self, user_id: Uuid) -> StoreResult<Vec<WeeklyWorkload>>;

    async fn workloads_from(&self, user_id: Uuid, week_start: DateTime<Utc>) -> StoreResult<Vec<WeeklyWorkload>>;

    async fn workload_at(&self, user_id: Uuid, week_start: DateTime<Utc>) -> StoreResult<Option<WeeklyWorkload>>;
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkloadStore for PgStore {
    async fn pending_deadlines(&self, user_id: Uuid, from: DateTime<Utc>) -> StoreResult<Vec<Deadline>> {
        let rows = sqlx::query_as::<_, Deadline>(
            r#"
            SELECT id, user_id, title, course_code, category, due_date, estimated_hours,
                   completed, weight, impact_level, created_at, updated_at
            FROM deadlines
            WHERE user_id = $1
              AND completed = false
              AND due_date >= $2
            ORDER BY due_date ASC
            "#,
        )
        .bind(user_id)
        .bind(from)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn modules(&self, user_id: Uuid) -> StoreResult<Vec<Module>> {
        list_modules(&self.pool, user_id).await
    }

    async fn upsert_workload(
        &self,
        draft: &WeeklyWorkloadDraft,
        now: DateTime<Utc>,
    ) -> StoreResult<WeeklyWorkload> {
        let row = sqlx::query_as::<_, WeeklyWorkload>(
            r#"
            INSERT INTO weekly_workloads
                (id, user_id, week_start, week_end, load_score, deadline_count, deadline_ids, risk_level, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id, week_start) DO UPDATE
            SET week_end = EXCLUDED.week_end,
                load_score = EXCLUDED.load_score,
                deadline_count = EXCLUDED.deadline_count,
                deadline_ids = EXCLUDED.deadline_ids,
                risk_level = EXCLUDED.risk_level,
                updated_at = EXCLUDED.updated_at
            RETURNING id, user_id, week_start, week_end, load_score, deadline_count,
                      deadline_ids, risk_level, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(draft.user_id)
        .bind(draft.week_start)
        .bind(draft.week_end)
        .bind(draft.load_score)
        .bind(draft.deadline_count)
        .bind(draft.deadline_ids.as_slice())
        .bind(draft.risk_level)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_workloads_from(&self, user_id: Uuid, week_start: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM weekly_workloads WHERE user_id = $1 AND week_start >= $2")
            .bind(user_id)
            .bind(week_start)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn latest_pending_deadline_change(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
    ) -> StoreResult<Option<DateTime<Utc>>> {
        let latest = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            r#"
            SELECT MAX(updated_at)
            FROM deadlines
            WHERE user_id = $1
              AND completed = false
              AND due_date >= $2
            "#,
        )
        .bind(user_id)
        .bind(from)
        .fetch_one(&self.pool)
        .await?;
        Ok(latest)
    }

    async fn latest_workload_change(
        &self,
        user_id: Uuid,
        week_start: DateTime<Utc>,
    ) -> StoreResult<Option<DateTime<Utc>>> {
        let latest = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            "SELECT MAX(updated_at) FROM weekly_workloads WHERE user_id = $1 AND week_start >= $2",
        )
        .bind(user_id)
        .bind(week_start)
        .fetch_one(&self.pool)
        .await?;
        Ok(latest)
    }

    async fn workloads(&self, user_id: Uuid) -> StoreResult<Vec<WeeklyWorkload>> {
        let rows = sqlx::query_as::<_, WeeklyWorkload>(
            r#"
            SELECT id, user_id, week_start, week_end, load_score, deadline_count,
                   deadline_ids, risk_level, updated_at
            FROM weekly_workloads
            WHERE user_id = $1
            ORDER BY week_start ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn workloads_from(&self, user_id: Uuid, week_start: DateTime<Utc>) -> StoreResult<Vec<WeeklyWorkload>> {
        let rows = sqlx::query_as::<_, WeeklyWorkload>(
            r#"
            SELECT id, user_id, week_start, week_end, load_score, deadline_count,
                   deadline_ids, risk_level, updated_at
            FROM weekly_workloads
            WHERE user_id = $1
              AND week_start >= $2
            ORDER BY week_start ASC
            "#,
        )
        .bind(user_id)
        .bind(week_start)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn workload_at(&self, user_id: Uuid, week_start: DateTime<Utc>) -> StoreResult<Option<WeeklyWorkload>> {
        let row = sqlx::query_as::<_, WeeklyWorkload>(
            r#"
            SELECT id, user_id, week_start, week_end, load_score, deadline_count,
                   deadline_ids, risk_level, updated_at
            FROM weekly_workloads
            WHERE user_id = $1
              AND week_start = $2
            "#,
        )
        .bind(user_id)
        .bind(week_start)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

// ============================================
// Users
// ============================================

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct DbUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub hash: String,
    pub created_at: DateTime<Utc>,
}

pub async fn create_user(pool: &PgPool, email: &str, name: &str, hash: &str) -> StoreResult<DbUser> {
    sqlx::query_as::<_, DbUser>(
        r#"
        INSERT INTO users (id, email, name, hash)
        VALUES ($1, $2, $3, $4)
        RETURNING id, email, name, hash, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(name)
    .bind(hash)
    .fetch_one(pool)
    .await
    .map_err(map_unique)
}

pub async fn find_user_by_email(pool: &PgPool, email: &str) -> StoreResult<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(
        "SELECT id, email, name, hash, created_at FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn find_user_by_id(pool: &PgPool, id: Uuid) -> StoreResult<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(
        "SELECT id, email, name, hash, created_at FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

// ============================================
// Deadlines
// ============================================

/// Caller-editable deadline fields. Weight and impact level are never taken
/// from here; they are derived from `category` on every write.
#[derive(Debug, Clone)]
pub struct DeadlineInput {
    pub title: String,
    pub course_code: String,
    pub category: Category,
    pub due_date: DateTime<Utc>,
    pub estimated_hours: f64,
    pub completed: bool,
}

pub async fn list_deadlines(
    pool: &PgPool,
    user_id: Uuid,
    include_completed: bool,
) -> StoreResult<Vec<Deadline>> {
    let rows = sqlx::query_as::<_, Deadline>(
        r#"
        SELECT id, user_id, title, course_code, category, due_date, estimated_hours,
               completed, weight, impact_level, created_at, updated_at
        FROM deadlines
        WHERE user_id = $1
          AND ($2 OR completed = false)
        ORDER BY due_date ASC
        "#,
    )
    .bind(user_id)
    .bind(include_completed)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn find_deadline(pool: &PgPool, user_id: Uuid, id: Uuid) -> StoreResult<Option<Deadline>> {
    let row = sqlx::query_as::<_, Deadline>(
        r#"
        SELECT id, user_id, title, course_code, category, due_date, estimated_hours,
               completed, weight, impact_level, created_at, updated_at
        FROM deadlines
        WHERE user_id = $1 AND id = $2
        "#,
    )
    .bind(user_id)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn insert_deadline(
    pool: &PgPool,
    user_id: Uuid,
    input: &DeadlineInput,
    now: DateTime<Utc>,
) -> StoreResult<Deadline> {
    let derived = derive_fields(input.category);
    let row = sqlx::query_as::<_, Deadline>(
        r#"
        INSERT INTO deadlines
            (id, user_id, title, course_code, category, due_date, estimated_hours,
             completed, weight, impact_level, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
        RETURNING id, user_id, title, course_code, category, due_date, estimated_hours,
                  completed, weight, impact_level, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&input.title)
    .bind(&input.course_code)
    .bind(input.category)
    .bind(input.due_date)
    .bind(input.estimated_hours)
    .bind(input.completed)
    .bind(derived.weight)
    .bind(derived.impact_level)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn update_deadline(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    input: &DeadlineInput,
    now: DateTime<Utc>,
) -> StoreResult<Option<Deadline>> {
    let derived = derive_fields(input.category);
    let row = sqlx::query_as::<_, Deadline>(
        r#"
        UPDATE deadlines
        SET title = $3,
            course_code = $4,
            category = $5,
            due_date = $6,
            estimated_hours = $7,
            completed = $8,
            weight = $9,
            impact_level = $10,
            updated_at = $11
        WHERE user_id = $1 AND id = $2
        RETURNING id, user_id, title, course_code, category, due_date, estimated_hours,
                  completed, weight, impact_level, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(id)
    .bind(&input.title)
    .bind(&input.course_code)
    .bind(input.category)
    .bind(input.due_date)
    .bind(input.estimated_hours)
    .bind(input.completed)
    .bind(derived.weight)
    .bind(derived.impact_level)
    .bind(now)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn toggle_deadline_completed(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    now: DateTime<Utc>,
) -> StoreResult<Option<Deadline>> {
    let row = sqlx::query_as::<_, Deadline>(
        r#"
        UPDATE deadlines
        SET completed = NOT completed,
            updated_at = $3
        WHERE user_id = $1 AND id = $2
        RETURNING id, user_id, title, course_code, category, due_date, estimated_hours,
                  completed, weight, impact_level, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(id)
    .bind(now)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn delete_deadline(pool: &PgPool, user_id: Uuid, id: Uuid) -> StoreResult<bool> {
    let result = sqlx::query("DELETE FROM deadlines WHERE user_id = $1 AND id = $2")
        .bind(user_id)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ============================================
// Modules
// ============================================

#[derive(Debug, Clone)]
pub struct ModuleInput {
    pub course_code: String,
    pub name: Option<String>,
    pub credits: i32,
}

pub async fn list_modules(pool: &PgPool, user_id: Uuid) -> StoreResult<Vec<Module>> {
    let rows = sqlx::query_as::<_, Module>(
        r#"
        SELECT id, user_id, course_code, name, credits, created_at, updated_at
        FROM modules
        WHERE user_id = $1
        ORDER BY course_code ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn insert_module(pool: &PgPool, user_id: Uuid, input: &ModuleInput) -> StoreResult<Module> {
    sqlx::query_as::<_, Module>(
        r#"
        INSERT INTO modules (id, user_id, course_code, name, credits)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, user_id, course_code, name, credits, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(normalize_course_code(&input.course_code))
    .bind(&input.name)
    .bind(input.credits)
    .fetch_one(pool)
    .await
    .map_err(map_unique)
}

pub async fn update_module(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    input: &ModuleInput,
) -> StoreResult<Option<Module>> {
    sqlx::query_as::<_, Module>(
        r#"
        UPDATE modules
        SET course_code = $3,
            name = $4,
            credits = $5,
            updated_at = NOW()
        WHERE user_id = $1 AND id = $2
        RETURNING id, user_id, course_code, name, credits, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(id)
    .bind(normalize_course_code(&input.course_code))
    .bind(&input.name)
    .bind(input.credits)
    .fetch_optional(pool)
    .await
    .map_err(map_unique)
}

pub async fn delete_module(pool: &PgPool, user_id: Uuid, id: Uuid) -> StoreResult<bool> {
    let result = sqlx::query("DELETE FROM modules WHERE user_id = $1 AND id = $2")
        .bind(user_id)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
