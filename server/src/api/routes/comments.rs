//! Review comment endpoints
//!
//! Creation and listing are submission-scoped; edits and deletes address the
//! comment directly.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;
use validator::Validate;

use super::submissions::require_facts as require_submission_facts;
use crate::api::extractors::{IdPath, ValidatedJson};
use crate::api::server::ApiState;
use crate::api::types::ApiError;
use crate::data::sqlite::repositories::{access as facts, comment};
use crate::data::types::{CommentRow, CommentWithReviewer};
use crate::domain::access::{self, Caller, CommentFacts};

#[derive(Debug, Deserialize, Validate)]
pub struct AddCommentRequest {
    #[validate(length(min = 1, max = 5000, message = "Content must be 1-5000 characters"))]
    pub content: String,
    /// Present makes the comment inline, anchored to a 1-based line
    #[validate(range(min = 1, message = "line_number must be >= 1"))]
    pub line_number: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    #[validate(length(min = 1, max = 5000, message = "Content must be 1-5000 characters"))]
    pub content: String,
}

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route(
            "/submissions/{id}/comments",
            get(list_for_submission).post(add),
        )
        .route("/comments/{id}", put(update).delete(remove))
}

async fn require_comment_facts(
    state: &ApiState,
    comment_id: &str,
    caller: &Caller,
) -> Result<CommentFacts, ApiError> {
    facts::comment_facts(&state.pool, comment_id, &caller.user_id)
        .await
        .map_err(ApiError::from_sqlite)?
        .ok_or_else(|| ApiError::not_found("COMMENT_NOT_FOUND", "Comment not found"))
}

async fn add(
    State(state): State<ApiState>,
    caller: Caller,
    path: IdPath,
    ValidatedJson(body): ValidatedJson<AddCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let sub_facts = require_submission_facts(&state, &path.id, &caller).await?;
    access::can_comment(&sub_facts, &caller)?;

    let row = comment::add_comment(
        &state.pool,
        &path.id,
        &caller.user_id,
        &body.content,
        body.line_number,
    )
    .await
    .map_err(ApiError::from_sqlite)?;

    tracing::debug!(
        comment_id = %row.id,
        submission_id = %path.id,
        inline = row.is_inline,
        "Comment added"
    );
    Ok((StatusCode::CREATED, Json(row)))
}

async fn list_for_submission(
    State(state): State<ApiState>,
    caller: Caller,
    path: IdPath,
) -> Result<Json<Vec<CommentWithReviewer>>, ApiError> {
    let sub_facts = require_submission_facts(&state, &path.id, &caller).await?;
    access::can_view_review_data(&sub_facts, &caller)?;

    let rows = comment::list_comments(&state.pool, &path.id)
        .await
        .map_err(ApiError::from_sqlite)?;
    Ok(Json(rows))
}

async fn update(
    State(state): State<ApiState>,
    caller: Caller,
    path: IdPath,
    ValidatedJson(body): ValidatedJson<UpdateCommentRequest>,
) -> Result<Json<CommentRow>, ApiError> {
    let comment_facts = require_comment_facts(&state, &path.id, &caller).await?;
    access::can_update_comment(&comment_facts, &caller)?;

    let row = comment::update_comment(&state.pool, &path.id, &body.content)
        .await
        .map_err(ApiError::from_sqlite)?
        .ok_or_else(|| ApiError::not_found("COMMENT_NOT_FOUND", "Comment not found"))?;
    Ok(Json(row))
}

async fn remove(
    State(state): State<ApiState>,
    caller: Caller,
    path: IdPath,
) -> Result<impl IntoResponse, ApiError> {
    let comment_facts = require_comment_facts(&state, &path.id, &caller).await?;
    access::can_delete_comment(&comment_facts, &caller)?;

    let deleted = comment::delete_comment(&state.pool, &path.id)
        .await
        .map_err(ApiError::from_sqlite)?;
    if !deleted {
        return Err(ApiError::not_found("COMMENT_NOT_FOUND", "Comment not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}
