use crate::domain::models::WeeklyWorkload;
use crate::domain::projections::Summary;
use crate::state::SharedState;
use crate::web::{session::UserSession, store_error, workload};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub limit: Option<usize>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(upcoming))
        .route("/calculate", post(workload::calculate))
        .route("/alert", get(workload::alerts))
        .route("/summary", get(summary))
        .with_state(state)
}

async fn upcoming(
    UserSession(user_id): UserSession,
    State(state): State<SharedState>,
) -> Result<Json<Vec<WeeklyWorkload>>, StatusCode> {
    let weeks = state
        .workload
        .upcoming(user_id, Utc::now())
        .await
        .map_err(store_error)?;
    Ok(Json(weeks))
}

async fn summary(
    UserSession(user_id): UserSession,
    State(state): State<SharedState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<Summary>, StatusCode> {
    let summary = state
        .workload
        .summary(user_id, Utc::now(), query.limit)
        .await
        .map_err(store_error)?;
    Ok(Json(summary))
}
