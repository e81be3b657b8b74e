//! Review verdict endpoints

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use validator::Validate;

use super::submissions::require_facts as require_submission_facts;
use crate::api::extractors::{IdPath, ValidatedJson};
use crate::api::server::ApiState;
use crate::api::types::ApiError;
use crate::data::sqlite::repositories::review;
use crate::data::types::{ReviewWithReviewer, SubmissionRow};
use crate::domain::access::{self, Caller};

#[derive(Debug, Deserialize, Validate)]
pub struct VerdictRequest {
    #[validate(length(max = 5000, message = "Notes too long"))]
    pub notes: Option<String>,
}

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/submissions/{id}/approve", post(approve))
        .route("/submissions/{id}/request-changes", post(request_changes))
        .route("/submissions/{id}/reviews", get(history))
}

async fn approve(
    State(state): State<ApiState>,
    caller: Caller,
    path: IdPath,
    ValidatedJson(body): ValidatedJson<VerdictRequest>,
) -> Result<Json<SubmissionRow>, ApiError> {
    let sub_facts = require_submission_facts(&state, &path.id, &caller).await?;
    access::can_review(&sub_facts, &caller)?;

    let row = state
        .workflow
        .approve(&path.id, &caller.user_id, body.notes.as_deref())
        .await
        .map_err(ApiError::from_workflow)?;
    Ok(Json(row))
}

async fn request_changes(
    State(state): State<ApiState>,
    caller: Caller,
    path: IdPath,
    ValidatedJson(body): ValidatedJson<VerdictRequest>,
) -> Result<Json<SubmissionRow>, ApiError> {
    let sub_facts = require_submission_facts(&state, &path.id, &caller).await?;
    access::can_review(&sub_facts, &caller)?;

    let row = state
        .workflow
        .request_changes(&path.id, &caller.user_id, body.notes.as_deref())
        .await
        .map_err(ApiError::from_workflow)?;
    Ok(Json(row))
}

async fn history(
    State(state): State<ApiState>,
    caller: Caller,
    path: IdPath,
) -> Result<Json<Vec<ReviewWithReviewer>>, ApiError> {
    let sub_facts = require_submission_facts(&state, &path.id, &caller).await?;
    access::can_view_review_data(&sub_facts, &caller)?;

    let rows = review::list_reviews(&state.pool, &path.id)
        .await
        .map_err(ApiError::from_sqlite)?;
    Ok(Json(rows))
}
