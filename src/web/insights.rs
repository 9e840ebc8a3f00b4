use crate::domain::projections::Insights;
use crate::state::SharedState;
use crate::web::{session::UserSession, store_error};
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;

pub fn router(state: SharedState) -> Router {
    Router::new().route("/", get(insights)).with_state(state)
}

async fn insights(
    UserSession(user_id): UserSession,
    State(state): State<SharedState>,
) -> Result<Json<Insights>, StatusCode> {
    let insights = state
        .workload
        .insights(user_id, Utc::now())
        .await
        .map_err(store_error)?;
    Ok(Json(insights))
}
