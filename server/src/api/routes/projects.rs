//! Project and membership endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::api::extractors::{IdPath, MemberPath, ValidatedJson};
use crate::api::server::ApiState;
use crate::api::types::ApiError;
use crate::data::sqlite::repositories::{access as facts, membership, project, stats, submission, user};
use crate::data::types::{MemberRole, ProjectRow, SubmissionRow};
use crate::domain::access::{self, Caller, ProjectFacts};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(max = 1000, message = "Description too long"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddMemberRequest {
    #[validate(length(min = 1, max = 64, message = "user_id must be 1-64 characters"))]
    pub user_id: String,
    /// Defaults to `reviewer`
    pub role: Option<MemberRole>,
}

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/projects", post(create).get(list))
        .route("/projects/{id}", get(detail))
        .route("/projects/{id}/members", post(add_member))
        .route("/projects/{id}/members/{user_id}", axum::routing::delete(remove_member))
        .route("/projects/{id}/submissions", get(list_submissions))
        .route("/projects/{id}/stats", get(project_stats))
}

/// Resolve project facts or 404. Existence is reported before access so the
/// two cases stay distinguishable only for projects the caller can address.
async fn require_facts(
    state: &ApiState,
    project_id: &str,
    caller: &Caller,
) -> Result<ProjectFacts, ApiError> {
    facts::project_facts(&state.pool, project_id, &caller.user_id)
        .await
        .map_err(ApiError::from_sqlite)?
        .ok_or_else(|| ApiError::not_found("PROJECT_NOT_FOUND", "Project not found"))
}

async fn create(
    State(state): State<ApiState>,
    caller: Caller,
    ValidatedJson(body): ValidatedJson<CreateProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let row = project::create_project(
        &state.pool,
        &body.name,
        body.description.as_deref(),
        &caller.user_id,
    )
    .await
    .map_err(ApiError::from_sqlite)?;

    tracing::info!(project_id = %row.id, owner = %caller.user_id, "Project created");
    Ok((StatusCode::CREATED, Json(row)))
}

async fn list(
    State(state): State<ApiState>,
    caller: Caller,
) -> Result<Json<Vec<ProjectRow>>, ApiError> {
    let rows = project::list_projects_for_user(&state.pool, &caller.user_id)
        .await
        .map_err(ApiError::from_sqlite)?;
    Ok(Json(rows))
}

async fn detail(
    State(state): State<ApiState>,
    caller: Caller,
    path: IdPath,
) -> Result<Json<serde_json::Value>, ApiError> {
    let project_facts = require_facts(&state, &path.id, &caller).await?;
    access::can_view_project(&project_facts, &caller)?;

    let row = project::get_project(&state.pool, &path.id)
        .await
        .map_err(ApiError::from_sqlite)?
        .ok_or_else(|| ApiError::not_found("PROJECT_NOT_FOUND", "Project not found"))?;
    let members = membership::list_members(&state.pool, &path.id)
        .await
        .map_err(ApiError::from_sqlite)?;

    Ok(Json(json!({
        "project": row,
        "members": members,
    })))
}

async fn add_member(
    State(state): State<ApiState>,
    caller: Caller,
    path: IdPath,
    ValidatedJson(body): ValidatedJson<AddMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let project_facts = require_facts(&state, &path.id, &caller).await?;
    access::can_manage_members(&project_facts, &caller)?;

    // The target must be a real account
    user::get_user(&state.pool, &body.user_id)
        .await
        .map_err(ApiError::from_sqlite)?
        .ok_or_else(|| ApiError::not_found("USER_NOT_FOUND", "User not found"))?;

    let role = body.role.unwrap_or(MemberRole::Reviewer);
    let row = membership::add_member(&state.pool, &path.id, &body.user_id, role)
        .await
        .map_err(|e| {
            if e.is_unique_violation() {
                ApiError::conflict("ALREADY_MEMBER", "User is already a member of this project")
            } else {
                ApiError::from_sqlite(e)
            }
        })?;

    tracing::info!(
        project_id = %path.id,
        user_id = %body.user_id,
        role = %role,
        "Member added"
    );
    Ok((StatusCode::CREATED, Json(row)))
}

async fn remove_member(
    State(state): State<ApiState>,
    caller: Caller,
    path: MemberPath,
) -> Result<impl IntoResponse, ApiError> {
    let project_facts = require_facts(&state, &path.project_id, &caller).await?;
    access::can_manage_members(&project_facts, &caller)?;

    if path.user_id == project_facts.owner_id {
        return Err(ApiError::bad_request(
            "CANNOT_REMOVE_OWNER",
            "The project owner cannot be removed",
        ));
    }

    let removed = membership::remove_member(&state.pool, &path.project_id, &path.user_id)
        .await
        .map_err(ApiError::from_sqlite)?;
    if !removed {
        return Err(ApiError::not_found(
            "MEMBER_NOT_FOUND",
            "User is not a member of this project",
        ));
    }

    tracing::info!(project_id = %path.project_id, user_id = %path.user_id, "Member removed");
    Ok(StatusCode::NO_CONTENT)
}

async fn list_submissions(
    State(state): State<ApiState>,
    caller: Caller,
    path: IdPath,
) -> Result<Json<Vec<SubmissionRow>>, ApiError> {
    let project_facts = require_facts(&state, &path.id, &caller).await?;
    access::can_view_project(&project_facts, &caller)?;

    let rows = submission::list_submissions_for_project(&state.pool, &path.id)
        .await
        .map_err(ApiError::from_sqlite)?;
    Ok(Json(rows))
}

async fn project_stats(
    State(state): State<ApiState>,
    caller: Caller,
    path: IdPath,
) -> Result<Json<stats::ProjectStats>, ApiError> {
    let project_facts = require_facts(&state, &path.id, &caller).await?;
    access::can_view_project(&project_facts, &caller)?;

    let report = stats::project_stats(&state.pool, &path.id)
        .await
        .map_err(ApiError::from_sqlite)?;
    Ok(Json(report))
}
