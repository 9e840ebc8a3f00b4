use crate::db::{self, DeadlineInput};
use crate::domain::models::{Category, Deadline};
use crate::state::SharedState;
use crate::web::{resync, store_error, session::UserSession};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

const MAX_ESTIMATED_HOURS: f64 = 1000.0;

#[derive(Debug, Deserialize)]
pub struct DeadlinePayload {
    pub title: String,
    pub course_code: String,
    pub category: Category,
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub estimated_hours: f64,
    #[serde(default)]
    pub completed: bool,
}

impl DeadlinePayload {
    fn validate(self) -> Result<DeadlineInput, StatusCode> {
        let title = self.title.trim();
        let course_code = self.course_code.trim();
        if title.is_empty() || course_code.is_empty() {
            return Err(StatusCode::BAD_REQUEST);
        }
        if !self.estimated_hours.is_finite()
            || !(0.0..=MAX_ESTIMATED_HOURS).contains(&self.estimated_hours)
        {
            return Err(StatusCode::BAD_REQUEST);
        }
        Ok(DeadlineInput {
            title: title.to_string(),
            course_code: course_code.to_string(),
            category: self.category,
            due_date: self.due_date,
            estimated_hours: self.estimated_hours,
            completed: self.completed,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    include_completed: bool,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(show).put(update).delete(remove))
        .route("/:id/complete", post(toggle_complete))
        .with_state(state)
}

async fn list(
    UserSession(user_id): UserSession,
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Deadline>>, StatusCode> {
    let deadlines = db::list_deadlines(&state.pool, user_id, query.include_completed)
        .await
        .map_err(store_error)?;
    Ok(Json(deadlines))
}

async fn show(
    UserSession(user_id): UserSession,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Deadline>, StatusCode> {
    let deadline = db::find_deadline(&state.pool, user_id, id)
        .await
        .map_err(store_error)?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(deadline))
}

async fn create(
    UserSession(user_id): UserSession,
    State(state): State<SharedState>,
    Json(payload): Json<DeadlinePayload>,
) -> Result<(StatusCode, Json<Deadline>), StatusCode> {
    let input = payload.validate()?;
    let deadline = db::insert_deadline(&state.pool, user_id, &input, Utc::now())
        .await
        .map_err(store_error)?;
    resync(&state, user_id).await?;
    Ok((StatusCode::CREATED, Json(deadline)))
}

async fn update(
    UserSession(user_id): UserSession,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DeadlinePayload>,
) -> Result<Json<Deadline>, StatusCode> {
    let input = payload.validate()?;
    let deadline = db::update_deadline(&state.pool, user_id, id, &input, Utc::now())
        .await
        .map_err(store_error)?
        .ok_or(StatusCode::NOT_FOUND)?;
    resync(&state, user_id).await?;
    Ok(Json(deadline))
}

async fn toggle_complete(
    UserSession(user_id): UserSession,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Deadline>, StatusCode> {
    let deadline = db::toggle_deadline_completed(&state.pool, user_id, id, Utc::now())
        .await
        .map_err(store_error)?
        .ok_or(StatusCode::NOT_FOUND)?;
    resync(&state, user_id).await?;
    Ok(Json(deadline))
}

async fn remove(
    UserSession(user_id): UserSession,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    let removed = db::delete_deadline(&state.pool, user_id, id)
        .await
        .map_err(store_error)?;
    if !removed {
        return Err(StatusCode::NOT_FOUND);
    }
    resync(&state, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: serde_json::Value) -> DeadlinePayload {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn valid_payload_is_trimmed() {
        let input = payload(serde_json::json!({
            "title": "  Lab report ",
            "course_code": " cs101 ",
            "category": "assignment",
            "due_date": "2026-10-28T17:00:00Z",
            "estimated_hours": 3.5
        }))
        .validate()
        .unwrap();
        assert_eq!(input.title, "Lab report");
        assert_eq!(input.course_code, "cs101");
        assert_eq!(input.category, Category::Assignment);
        assert!(!input.completed);
    }

    #[test]
    fn blank_fields_and_bad_hours_are_rejected() {
        let blank = payload(serde_json::json!({
            "title": "   ",
            "course_code": "CS101",
            "category": "quiz",
            "due_date": "2026-10-28T17:00:00Z"
        }));
        assert_eq!(blank.validate().unwrap_err(), StatusCode::BAD_REQUEST);

        let negative = payload(serde_json::json!({
            "title": "Quiz 3",
            "course_code": "CS101",
            "category": "quiz",
            "due_date": "2026-10-28T17:00:00Z",
            "estimated_hours": -1.0
        }));
        assert_eq!(negative.validate().unwrap_err(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unknown_category_fails_to_parse() {
        let parsed = serde_json::from_value::<DeadlinePayload>(serde_json::json!({
            "title": "Lab",
            "course_code": "CS101",
            "category": "lab",
            "due_date": "2026-10-28T17:00:00Z"
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn weight_cannot_be_supplied_by_caller() {
        // Extra fields are ignored; weight always comes from the category.
        let input = payload(serde_json::json!({
            "title": "Final",
            "course_code": "CS101",
            "category": "final",
            "due_date": "2026-12-10T09:00:00Z",
            "weight": 1,
            "impact_level": "low"
        }))
        .validate()
        .unwrap();
        assert_eq!(crate::domain::models::derive_fields(input.category).weight, 5);
    }
}
