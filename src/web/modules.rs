use crate::db::{self, ModuleInput};
use crate::domain::models::{normalize_course_code, Module};
use crate::state::SharedState;
use crate::web::{resync, store_error, session::UserSession};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

const MAX_CREDITS: i32 = 30;

#[derive(Debug, Deserialize)]
pub struct ModulePayload {
    pub course_code: String,
    pub name: Option<String>,
    pub credits: i32,
}

impl ModulePayload {
    fn validate(self) -> Result<ModuleInput, StatusCode> {
        let course_code = normalize_course_code(&self.course_code);
        if course_code.is_empty() || !(1..=MAX_CREDITS).contains(&self.credits) {
            return Err(StatusCode::BAD_REQUEST);
        }
        Ok(ModuleInput {
            course_code,
            name: self
                .name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            credits: self.credits,
        })
    }
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", put(update).delete(remove))
        .with_state(state)
}

async fn list(
    UserSession(user_id): UserSession,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Module>>, StatusCode> {
    let modules = db::list_modules(&state.pool, user_id)
        .await
        .map_err(store_error)?;
    Ok(Json(modules))
}

async fn create(
    UserSession(user_id): UserSession,
    State(state): State<SharedState>,
    Json(payload): Json<ModulePayload>,
) -> Result<(StatusCode, Json<Module>), StatusCode> {
    let input = payload.validate()?;
    let module = db::insert_module(&state.pool, user_id, &input)
        .await
        .map_err(store_error)?;
    // Credit changes never touch deadline timestamps, so the read-side
    // staleness check would miss them.
    resync(&state, user_id).await?;
    Ok((StatusCode::CREATED, Json(module)))
}

async fn update(
    UserSession(user_id): UserSession,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ModulePayload>,
) -> Result<Json<Module>, StatusCode> {
    let input = payload.validate()?;
    let module = db::update_module(&state.pool, user_id, id, &input)
        .await
        .map_err(store_error)?
        .ok_or(StatusCode::NOT_FOUND)?;
    resync(&state, user_id).await?;
    Ok(Json(module))
}

async fn remove(
    UserSession(user_id): UserSession,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    let removed = db::delete_module(&state.pool, user_id, id)
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

    #[test]
    fn course_code_is_normalized_and_name_trimmed() {
        let input = ModulePayload {
            course_code: " cs101 ".to_string(),
            name: Some("   ".to_string()),
            credits: 3,
        }
        .validate()
        .unwrap();
        assert_eq!(input.course_code, "CS101");
        assert!(input.name.is_none());
    }

    #[test]
    fn credits_must_be_in_range() {
        for credits in [0, -2, MAX_CREDITS + 1] {
            let result = ModulePayload {
                course_code: "CS101".to_string(),
                name: None,
                credits,
            }
            .validate();
            assert_eq!(result.unwrap_err(), StatusCode::BAD_REQUEST);
        }
    }
}
