//! Notification endpoints (strictly recipient-scoped)

use axum::extract::State;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::api::extractors::{IdPath, ValidatedQuery};
use crate::api::server::ApiState;
use crate::api::types::ApiError;
use crate::core::constants::{DEFAULT_NOTIFICATION_LIMIT, MAX_NOTIFICATION_LIMIT};
use crate::data::sqlite::repositories::notification;
use crate::data::types::NotificationRow;
use crate::domain::access::{self, Caller};

#[derive(Debug, Deserialize, Validate)]
pub struct NotificationQuery {
    #[validate(range(min = 1, max = 200, message = "limit must be between 1 and 200"))]
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub unread_only: Option<bool>,
}

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/users/{id}/notifications", get(list))
        .route("/notifications/{id}/read", put(mark_read))
}

async fn list(
    State(state): State<ApiState>,
    caller: Caller,
    path: IdPath,
    ValidatedQuery(query): ValidatedQuery<NotificationQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    access::can_view_notifications(&path.id, &caller)?;

    let limit = query
        .limit
        .unwrap_or(DEFAULT_NOTIFICATION_LIMIT)
        .min(MAX_NOTIFICATION_LIMIT);
    let offset = query.offset.unwrap_or(0);
    let unread_only = query.unread_only.unwrap_or(false);

    let (rows, total) =
        notification::list_notifications(&state.pool, &path.id, unread_only, limit, offset)
            .await
            .map_err(ApiError::from_sqlite)?;

    Ok(Json(json!({
        "notifications": rows,
        "total": total,
        "limit": limit,
        "offset": offset,
    })))
}

async fn mark_read(
    State(state): State<ApiState>,
    caller: Caller,
    path: IdPath,
) -> Result<Json<NotificationRow>, ApiError> {
    // Scoped to the caller's own rows; a foreign id behaves as missing
    let row = notification::mark_read(&state.pool, &path.id, &caller.user_id)
        .await
        .map_err(ApiError::from_sqlite)?
        .ok_or_else(|| ApiError::not_found("NOTIFICATION_NOT_FOUND", "Notification not found"))?;
    Ok(Json(row))
}
