mod config;
mod db;
mod domain;
mod middleware;
mod services;
mod state;
mod time_utils;
mod web;

use crate::config::AppConfig;
use crate::db::PgStore;
use crate::middleware::RateLimiter;
use crate::services::workload::WorkloadService;
use crate::state::SharedState;
use crate::time_utils::WeekCalendar;
use axum::http::{header, HeaderValue, Method};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const LOGIN_ATTEMPTS: usize = 5;
const LOGIN_WINDOW_SECS: u64 = 60;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = AppConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .connect(&cfg.database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to run database migrations: {}", e);
            e
        })?;

    tracing::info!(
        timezone = ?cfg.timezone,
        threshold = cfg.workload.alert_threshold.as_str(),
        "Workload scoring configured"
    );

    let workload = WorkloadService::new(
        Arc::new(PgStore::new(pool.clone())),
        WeekCalendar::new(cfg.timezone),
        cfg.workload,
    );

    let shared: SharedState = Arc::new(state::AppState {
        pool,
        workload,
        session_key: cfg.session_key,
        login_limiter: RateLimiter::new(LOGIN_ATTEMPTS, LOGIN_WINDOW_SECS),
    });

    let mut app = web::routes(shared).layer(TraceLayer::new_for_http());

    if let Some(origin) = cfg.cors_origin.as_deref() {
        let origin = HeaderValue::from_str(origin)?;
        app = app.layer(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_credentials(true)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        );
    }

    tracing::info!("Listening on {}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
