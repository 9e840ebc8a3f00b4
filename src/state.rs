use crate::db::PgStore;
use crate::middleware::RateLimiter;
use crate::services::workload::WorkloadService;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub workload: WorkloadService<PgStore>,
    pub session_key: Vec<u8>,
    pub login_limiter: RateLimiter,
}

pub type SharedState = Arc<AppState>;
