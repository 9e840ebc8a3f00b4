pub mod auth;
pub mod dashboard;
pub mod deadlines;
pub mod insights;
pub mod modules;
pub mod session;
pub mod workload;

use crate::db::StoreError;
use crate::state::SharedState;
use axum::{http::StatusCode, routing::get, Router};
use chrono::Utc;
use uuid::Uuid;

async fn health() -> &'static str {
    "OK"
}

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/auth", auth::router(state.clone()))
        .nest("/deadlines", deadlines::router(state.clone()))
        .nest("/modules", modules::router(state.clone()))
        .nest("/workload", workload::router(state.clone()))
        .nest("/dashboard", dashboard::router(state.clone()))
        .nest("/insights", insights::router(state))
}

pub(crate) fn store_error(err: StoreError) -> StatusCode {
    match err {
        StoreError::Conflict(what) => {
            tracing::warn!("Rejected duplicate {}", what);
            StatusCode::CONFLICT
        }
        StoreError::Database(e) => {
            tracing::error!("Database error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Rebuilds upcoming weeks after a write. Completions, deletions and credit
/// changes are invisible to the read-side staleness check, so a failed
/// rebuild fails the request.
pub(crate) async fn resync(state: &SharedState, user_id: Uuid) -> Result<(), StatusCode> {
    state
        .workload
        .sync_upcoming(user_id, Utc::now())
        .await
        .map(|_| ())
        .map_err(|e| {
            tracing::error!(%user_id, "Failed to rebuild workload after write");
            store_error(e)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::PgStore;
    use crate::domain::scoring::WorkloadSettings;
    use crate::middleware::RateLimiter;
    use crate::services::workload::WorkloadService;
    use crate::state::AppState;
    use crate::time_utils::WeekCalendar;
    use axum::{
        body::Body,
        http::{header, Method, Request},
    };
    use sqlx::postgres::PgPoolOptions;
    use std::{sync::Arc, time::Duration};
    use tower::ServiceExt;

    // Requests in these tests are rejected before any query runs, so the
    // pool never opens a connection.
    fn state(url: &str) -> SharedState {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy(url)
            .unwrap();
        Arc::new(AppState {
            pool: pool.clone(),
            workload: WorkloadService::new(
                Arc::new(PgStore::new(pool)),
                WeekCalendar::default(),
                WorkloadSettings::default(),
            ),
            session_key: vec![7; 32],
            login_limiter: RateLimiter::new(5, 60),
        })
    }

    fn app() -> Router {
        routes(state("postgres://localhost/coursework_load_test"))
    }

    #[tokio::test]
    async fn health_is_public() {
        let res = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn workload_views_require_a_session() {
        for uri in ["/dashboard", "/dashboard/summary?limit=4", "/workload", "/workload/alert", "/insights"] {
            let res = app()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn forged_token_is_rejected() {
        let res = app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/dashboard/calculate")
                    .header(header::AUTHORIZATION, "Bearer Zm9v.YmFy")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn logout_clears_cookie() {
        let res = app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/auth/logout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        let cookie = res.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn failed_rebuild_after_write_is_a_server_error() {
        // Nothing listens on port 1, so every query fails.
        let state = state("postgres://127.0.0.1:1/coursework_load_test");
        assert_eq!(
            resync(&state, Uuid::new_v4()).await,
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        );
    }
}
