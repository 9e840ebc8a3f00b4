use crate::domain::models::WeeklyWorkload;
use crate::domain::projections::Alert;
use crate::state::SharedState;
use crate::web::{store_error, session::UserSession};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

/// Full history of weekly records, past weeks included.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list))
        .route("/calculate", post(calculate))
        .route("/alert", get(alerts))
        .with_state(state)
}

async fn list(
    UserSession(user_id): UserSession,
    State(state): State<SharedState>,
) -> Result<Json<Vec<WeeklyWorkload>>, StatusCode> {
    let weeks = state
        .workload
        .list_workloads(user_id, Utc::now())
        .await
        .map_err(store_error)?;
    Ok(Json(weeks))
}

pub(crate) async fn calculate(
    UserSession(user_id): UserSession,
    State(state): State<SharedState>,
) -> Result<Json<Vec<WeeklyWorkload>>, StatusCode> {
    let weeks = state
        .workload
        .sync_upcoming(user_id, Utc::now())
        .await
        .map_err(store_error)?;
    Ok(Json(weeks))
}

pub(crate) async fn alerts(
    UserSession(user_id): UserSession,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Alert>>, StatusCode> {
    let alerts = state
        .workload
        .list_alerts(user_id, Utc::now())
        .await
        .map_err(store_error)?;
    Ok(Json(alerts))
}
