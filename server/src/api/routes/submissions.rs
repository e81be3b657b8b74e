//! Submission endpoints

use std::str::FromStr;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::api::extractors::{IdPath, ValidatedJson};
use crate::api::server::ApiState;
use crate::api::types::ApiError;
use crate::data::sqlite::repositories::{access as facts, submission};
use crate::data::types::{SubmissionRow, SubmissionStatus};
use crate::domain::access::{self, Caller, SubmissionFacts};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubmissionRequest {
    #[validate(length(min = 1, max = 64, message = "project_id must be 1-64 characters"))]
    pub project_id: String,
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 100000, message = "Code content must be 1-100000 characters"))]
    pub code_content: String,
    #[validate(length(max = 255, message = "File name too long"))]
    pub file_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    #[validate(length(min = 1, message = "Status is required"))]
    pub status: String,
}

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/submissions", post(create))
        .route("/submissions/{id}", get(detail).delete(remove))
        .route("/submissions/{id}/status", put(update_status))
}

// Used by the comment and review routers too
pub(crate) async fn require_facts(
    state: &ApiState,
    submission_id: &str,
    caller: &Caller,
) -> Result<SubmissionFacts, ApiError> {
    facts::submission_facts(&state.pool, submission_id, &caller.user_id)
        .await
        .map_err(ApiError::from_sqlite)?
        .ok_or_else(|| ApiError::not_found("SUBMISSION_NOT_FOUND", "Submission not found"))
}

async fn create(
    State(state): State<ApiState>,
    caller: Caller,
    ValidatedJson(body): ValidatedJson<CreateSubmissionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let project_facts = facts::project_facts(&state.pool, &body.project_id, &caller.user_id)
        .await
        .map_err(ApiError::from_sqlite)?
        .ok_or_else(|| ApiError::not_found("PROJECT_NOT_FOUND", "Project not found"))?;
    access::can_create_submission(&project_facts, &caller)?;

    let row = submission::create_submission(
        &state.pool,
        &body.project_id,
        &caller.user_id,
        &body.title,
        &body.code_content,
        body.file_name.as_deref(),
    )
    .await
    .map_err(ApiError::from_sqlite)?;

    tracing::info!(submission_id = %row.id, project_id = %row.project_id, "Submission created");

    announce(&state, &row).await;

    Ok((StatusCode::CREATED, Json(row)))
}

/// Ephemeral event for connected project members; listing stays the durable
/// source of truth. The row is already committed, so a delivery failure is
/// logged and never surfaced to the caller.
async fn announce(state: &ApiState, row: &SubmissionRow) {
    let event = json!({
        "id": row.id,
        "project_id": row.project_id,
        "submitter_id": row.submitter_id,
        "title": row.title,
    });

    if let Err(e) = state
        .notifier
        .broadcast_to_project(&row.project_id, "new_submission", event)
        .await
    {
        tracing::warn!(
            submission_id = %row.id,
            error = %e,
            "Failed to announce submission to project connections"
        );
    }
}

async fn detail(
    State(state): State<ApiState>,
    caller: Caller,
    path: IdPath,
) -> Result<Json<SubmissionRow>, ApiError> {
    let sub_facts = require_facts(&state, &path.id, &caller).await?;
    access::can_view_project(&sub_facts.project, &caller)?;

    let row = submission::get_submission(&state.pool, &path.id)
        .await
        .map_err(ApiError::from_sqlite)?
        .ok_or_else(|| ApiError::not_found("SUBMISSION_NOT_FOUND", "Submission not found"))?;
    Ok(Json(row))
}

async fn update_status(
    State(state): State<ApiState>,
    caller: Caller,
    path: IdPath,
    ValidatedJson(body): ValidatedJson<UpdateStatusRequest>,
) -> Result<Json<SubmissionRow>, ApiError> {
    let status = SubmissionStatus::from_str(&body.status).map_err(|_| {
        ApiError::bad_request(
            "INVALID_STATUS",
            "Status must be one of: pending, in_review, approved, changes_requested",
        )
    })?;

    let sub_facts = require_facts(&state, &path.id, &caller).await?;
    access::can_update_status(&sub_facts, &caller)?;

    let row = state
        .workflow
        .set_status(&path.id, status)
        .await
        .map_err(ApiError::from_workflow)?;
    Ok(Json(row))
}

async fn remove(
    State(state): State<ApiState>,
    caller: Caller,
    path: IdPath,
) -> Result<impl IntoResponse, ApiError> {
    let sub_facts = require_facts(&state, &path.id, &caller).await?;
    access::can_delete_submission(&sub_facts, &caller)?;

    let deleted = submission::delete_submission(&state.pool, &path.id)
        .await
        .map_err(ApiError::from_sqlite)?;
    if !deleted {
        return Err(ApiError::not_found(
            "SUBMISSION_NOT_FOUND",
            "Submission not found",
        ));
    }

    tracing::info!(submission_id = %path.id, by = %caller.user_id, "Submission deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use sqlx::SqlitePool;

    use crate::data::sqlite::repositories::project::create_project;
    use crate::data::sqlite::repositories::submission::create_submission;
    use crate::data::sqlite::repositories::user::create_user;
    use crate::data::types::UserRole;
    use crate::domain::realtime::{ConnectionEvent, ConnectionRegistry, Notifier};
    use crate::domain::workflow::ReviewWorkflow;

    async fn setup_state() -> ApiState {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        sqlx::query(crate::data::sqlite::schema::SCHEMA)
            .execute(&pool)
            .await
            .unwrap();

        let registry = Arc::new(ConnectionRegistry::new(Duration::from_secs(30)));
        let notifier = Arc::new(Notifier::new(pool.clone(), Arc::clone(&registry)));
        let workflow = Arc::new(ReviewWorkflow::new(pool.clone(), Arc::clone(&notifier)));

        ApiState {
            pool,
            signing_key: vec![0u8; 32],
            registry,
            notifier,
            workflow,
        }
    }

    async fn seed_submission(state: &ApiState) -> (String, SubmissionRow) {
        let owner = create_user(&state.pool, "o@example.com", "hash", "O", UserRole::Submitter)
            .await
            .unwrap()
            .id;
        let project = create_project(&state.pool, "Core", None, &owner)
            .await
            .unwrap();
        let row = create_submission(&state.pool, &project.id, &owner, "Fix", "code", None)
            .await
            .unwrap();
        (owner, row)
    }

    #[tokio::test]
    async fn test_announce_delivers_to_project_connections() {
        let state = setup_state().await;
        let (owner, row) = seed_submission(&state).await;
        let (_id, mut rx) = state.registry.register(&owner);

        announce(&state, &row).await;

        let ConnectionEvent::Deliver(frame) = rx.try_recv().unwrap() else {
            panic!("expected a frame");
        };
        let parsed: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(parsed["type"], "new_submission");
        assert_eq!(parsed["data"]["id"], row.id.as_str());
    }

    #[tokio::test]
    async fn test_announce_swallows_store_failure() {
        let state = setup_state().await;
        let (owner, row) = seed_submission(&state).await;
        let (_id, mut rx) = state.registry.register(&owner);

        // The row is committed; a failing recipient lookup must not surface
        // an error to the request that created it
        state.pool.close().await;
        announce(&state, &row).await;

        assert!(rx.try_recv().is_err());
    }
}
