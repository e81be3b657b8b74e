//! Registration and login (public endpoints)

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use super::users::UserResponse;
use crate::api::auth::{create_session_token, hash_password, verify_password};
use crate::api::extractors::ValidatedJson;
use crate::api::server::ApiState;
use crate::api::types::ApiError;
use crate::data::sqlite::repositories::user;
use crate::data::types::{UserRole, UserRow};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    /// Defaults to `submitter`
    pub role: Option<UserRole>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

fn session_response(state: &ApiState, row: UserRow) -> Result<serde_json::Value, ApiError> {
    let token = create_session_token(&state.signing_key, &row.id, &row.email, row.role)
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to sign session token");
            ApiError::internal("Failed to create session")
        })?;
    Ok(json!({
        "token": token,
        "user": UserResponse::from(row),
    }))
}

async fn register(
    State(state): State<ApiState>,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let role = body.role.unwrap_or(UserRole::Submitter);
    let password_hash = hash_password(&body.password);

    let row = user::create_user(&state.pool, &body.email, &password_hash, &body.name, role)
        .await
        .map_err(|e| {
            if e.is_unique_violation() {
                ApiError::conflict("EMAIL_TAKEN", "An account with this email already exists")
            } else {
                ApiError::from_sqlite(e)
            }
        })?;

    tracing::info!(user_id = %row.id, role = %role, "User registered");
    Ok((StatusCode::CREATED, Json(session_response(&state, row)?)))
}

async fn login(
    State(state): State<ApiState>,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Same response for unknown email and wrong password
    let invalid =
        || ApiError::unauthorized("INVALID_CREDENTIALS", "Invalid email or password");

    let row = user::get_user_by_email(&state.pool, &body.email)
        .await
        .map_err(ApiError::from_sqlite)?
        .ok_or_else(invalid)?;

    if !verify_password(&body.password, &row.password_hash) {
        return Err(invalid());
    }

    tracing::debug!(user_id = %row.id, "User logged in");
    Ok(Json(session_response(&state, row)?))
}
