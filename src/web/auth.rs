use crate::db::{self, StoreError};
use crate::middleware::rate_limit_middleware;
use crate::state::SharedState;
use crate::web::session::{self, UserSession};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, SaltString},
    Argon2, PasswordVerifier,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub token: String,
}

#[derive(Serialize)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

pub fn router(state: SharedState) -> Router {
    let login_routes = Router::new()
        .route("/login", post(login))
        .route_layer(middleware::from_fn_with_state(
            state.login_limiter.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        .route("/register", post(register))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .merge(login_routes)
        .with_state(state)
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn is_production() -> bool {
    std::env::var("PRODUCTION").is_ok()
}

fn session_headers(token: &str) -> Result<HeaderMap, StatusCode> {
    let mut headers = HeaderMap::new();
    let cookie = HeaderValue::from_str(&session::session_cookie(token, is_production()))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    headers.insert(header::SET_COOKIE, cookie);
    Ok(headers)
}

async fn register(
    State(state): State<SharedState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let email = normalize_email(&payload.email);
    let name = payload.name.trim();
    if !email.contains('@') || name.is_empty() || payload.password.len() < MIN_PASSWORD_LEN {
        return Err(StatusCode::BAD_REQUEST);
    }

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(payload.password.as_bytes(), &salt)
        .map_err(|e| {
            tracing::error!("Password hashing failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .to_string();

    let user = db::create_user(&state.pool, &email, name, &hash)
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => StatusCode::CONFLICT,
            other => {
                tracing::error!("Failed to create user: {}", other);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        })?;

    let token = session::sign_session(user.id, &state.session_key)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let headers = session_headers(&token)?;

    tracing::info!("Registered user {}", user.id);

    Ok((
        StatusCode::CREATED,
        headers,
        Json(AuthResponse {
            user_id: user.id,
            name: user.name,
            email: user.email,
            token,
        }),
    ))
}

async fn login(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let user = db::find_user_by_email(&state.pool, &normalize_email(&payload.email))
        .await
        .map_err(|e| {
            tracing::error!("User lookup failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let parsed_hash = PasswordHash::new(&user.hash).map_err(|_| StatusCode::UNAUTHORIZED)?;
    Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed_hash)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let token = session::sign_session(user.id, &state.session_key)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let headers = session_headers(&token)?;

    Ok((
        headers,
        Json(AuthResponse {
            user_id: user.id,
            name: user.name,
            email: user.email,
            token,
        }),
    ))
}

async fn logout() -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_static(session::expired_cookie()),
    );
    (StatusCode::NO_CONTENT, headers)
}

async fn me(
    UserSession(user_id): UserSession,
    State(state): State<SharedState>,
) -> Result<Json<CurrentUser>, StatusCode> {
    let user = db::find_user_by_id(&state.pool, user_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(CurrentUser {
        user_id: user.id,
        name: user.name,
        email: user.email,
        created_at: user.created_at,
    }))
}
