//! User profile endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::auth::hash_password;
use crate::api::extractors::{IdPath, ValidatedJson};
use crate::api::server::ApiState;
use crate::api::types::ApiError;
use crate::data::sqlite::repositories::user::{self, UserUpdate};
use crate::data::types::{UserRole, UserRow};
use crate::domain::access::{self, Caller};

/// Public view of a user (never carries the credential hash)
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub display_picture: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<UserRow> for UserResponse {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            name: row.name,
            role: row.role,
            display_picture: row.display_picture,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 2048, message = "Display picture URL too long"))]
    pub display_picture: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
}

pub fn routes() -> Router<ApiState> {
    Router::new().route(
        "/users/{id}",
        get(get_profile).put(update_profile).delete(delete_account),
    )
}

async fn get_profile(
    State(state): State<ApiState>,
    caller: Caller,
    path: IdPath,
) -> Result<Json<UserResponse>, ApiError> {
    access::can_view_profile(&path.id, &caller)?;

    let row = user::get_user(&state.pool, &path.id)
        .await
        .map_err(ApiError::from_sqlite)?
        .ok_or_else(|| ApiError::not_found("USER_NOT_FOUND", "User not found"))?;

    Ok(Json(row.into()))
}

async fn update_profile(
    State(state): State<ApiState>,
    caller: Caller,
    path: IdPath,
    ValidatedJson(body): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if caller.user_id != path.id {
        return Err(ApiError::forbidden(
            "ACCESS_DENIED",
            "Only the account owner can update this profile",
        ));
    }

    let update = UserUpdate {
        name: body.name,
        display_picture: body.display_picture,
        password_hash: body.password.as_deref().map(hash_password),
    };
    if update.is_empty() {
        return Err(ApiError::bad_request("NO_FIELDS", "No fields to update"));
    }

    let row = user::update_user(&state.pool, &path.id, &update)
        .await
        .map_err(ApiError::from_sqlite)?
        .ok_or_else(|| ApiError::not_found("USER_NOT_FOUND", "User not found"))?;

    Ok(Json(row.into()))
}

async fn delete_account(
    State(state): State<ApiState>,
    caller: Caller,
    path: IdPath,
) -> Result<impl IntoResponse, ApiError> {
    if caller.user_id != path.id && !caller.is_reviewer() {
        return Err(ApiError::forbidden(
            "ACCESS_DENIED",
            "Not authorized to delete this account",
        ));
    }

    let deleted = user::delete_user(&state.pool, &path.id)
        .await
        .map_err(ApiError::from_sqlite)?;
    if !deleted {
        return Err(ApiError::not_found("USER_NOT_FOUND", "User not found"));
    }

    tracing::info!(user_id = %path.id, by = %caller.user_id, "User account deleted");
    Ok(StatusCode::NO_CONTENT)
}
