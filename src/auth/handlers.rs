use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{instrument, warn};

use crate::{
    auth::dto::{
        AuthResponse, DeleteUserRequest, ForgotPasswordRequest, LoginRequest, PublicUser,
        RegisterRequest, VerifyTokenRequest,
    },
    error::AuthError,
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/verify", post(verify_token))
        .route("/auth/user", delete(delete_user))
        .route("/auth/user/:email", get(get_user))
        .route("/auth/forgot-password", post(forgot_password))
}

fn validate_email(email: &str) -> Result<(), AuthError> {
    if !is_valid_email(email) {
        warn!(email, "invalid email");
        return Err(AuthError::BadRequest("Invalid email".to_string()));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < 8 {
        warn!("password too short");
        return Err(AuthError::BadRequest("Password too short".to_string()));
    }
    Ok(())
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    validate_email(&payload.email)?;
    validate_password(&payload.password)?;
    let response = state
        .auth
        .register(&payload.email, &payload.name, &payload.password)
        .await?;
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    validate_email(&payload.email)?;
    let response = state.auth.login(&payload.email, &payload.password).await?;
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
async fn verify_token(
    State(state): State<AppState>,
    Json(payload): Json<VerifyTokenRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    let response = state.auth.verify_token(&payload.token)?;
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
async fn delete_user(
    State(state): State<AppState>,
    Json(payload): Json<DeleteUserRequest>,
) -> Result<Json<PublicUser>, AuthError> {
    validate_email(&payload.email)?;
    let user = state.auth.delete_user(&payload.email).await?;
    Ok(Json(user))
}

#[instrument(skip(state))]
async fn get_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let user = state
        .auth
        .get_user(&email)
        .await
        .map_err(|e| (e.status(), e.to_string()))?;
    match user {
        Some(u) => Ok(Json(u)),
        None => Err((StatusCode::NOT_FOUND, "User not found".to_string())),
    }
}

#[instrument(skip(state, payload))]
async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<PublicUser>, AuthError> {
    validate_email(&payload.email)?;
    validate_password(&payload.password)?;
    let user = state
        .auth
        .forgot_password(&payload.email, &payload.password)
        .await?;
    Ok(Json(user))
}
