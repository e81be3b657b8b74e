//! Submission repository

use sqlx::SqlitePool;

use super::parse_column;
use crate::data::sqlite::SqliteError;
use crate::data::types::{SubmissionRow, SubmissionStatus};

type SubmissionTuple = (
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    String,
    i64,
    i64,
);

pub(crate) fn map_submission(row: SubmissionTuple) -> Result<SubmissionRow, SqliteError> {
    let (id, project_id, submitter_id, title, code_content, file_name, status, created_at, updated_at) =
        row;
    Ok(SubmissionRow {
        id,
        project_id,
        submitter_id,
        title,
        code_content,
        file_name,
        status: parse_column::<SubmissionStatus>(&status, "submissions.status")?,
        created_at,
        updated_at,
    })
}

const SUBMISSION_COLUMNS: &str =
    "id, project_id, submitter_id, title, code_content, file_name, status, created_at, updated_at";

/// Create a submission in `pending` state
pub async fn create_submission(
    pool: &SqlitePool,
    project_id: &str,
    submitter_id: &str,
    title: &str,
    code_content: &str,
    file_name: Option<&str>,
) -> Result<SubmissionRow, SqliteError> {
    let id = cuid2::create_id();
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO submissions
             (id, project_id, submitter_id, title, code_content, file_name, status, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, 'pending', ?, ?)",
    )
    .bind(&id)
    .bind(project_id)
    .bind(submitter_id)
    .bind(title)
    .bind(code_content)
    .bind(file_name)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(SubmissionRow {
        id,
        project_id: project_id.to_string(),
        submitter_id: submitter_id.to_string(),
        title: title.to_string(),
        code_content: code_content.to_string(),
        file_name: file_name.map(str::to_string),
        status: SubmissionStatus::Pending,
        created_at: now,
        updated_at: now,
    })
}

/// Get a submission by ID
pub async fn get_submission(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<SubmissionRow>, SqliteError> {
    let row = sqlx::query_as::<_, SubmissionTuple>(&format!(
        "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(map_submission).transpose()
}

/// List submissions for a project, newest first
pub async fn list_submissions_for_project(
    pool: &SqlitePool,
    project_id: &str,
) -> Result<Vec<SubmissionRow>, SqliteError> {
    let rows = sqlx::query_as::<_, SubmissionTuple>(&format!(
        "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE project_id = ? ORDER BY created_at DESC"
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(map_submission).collect()
}

/// Set a submission's status outside the review workflow (manual step, e.g.
/// marking `in_review`). Returns the updated row, or None if the submission
/// does not exist.
pub async fn set_status(
    pool: &SqlitePool,
    id: &str,
    status: SubmissionStatus,
) -> Result<Option<SubmissionRow>, SqliteError> {
    let now = chrono::Utc::now().timestamp();

    let result = sqlx::query("UPDATE submissions SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    get_submission(pool, id).await
}

/// Delete a submission (comments and history cascade)
pub async fn delete_submission(pool: &SqlitePool, id: &str) -> Result<bool, SqliteError> {
    let result = sqlx::query("DELETE FROM submissions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::repositories::project::create_project;
    use crate::data::sqlite::repositories::user::create_user;
    use crate::data::types::UserRole;

    async fn setup_test_pool() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        sqlx::query(crate::data::sqlite::schema::SCHEMA)
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    async fn seed_project(pool: &SqlitePool) -> (String, String) {
        let owner = create_user(pool, "o@example.com", "hash", "Owner", UserRole::Submitter)
            .await
            .unwrap()
            .id;
        let project = create_project(pool, "Core", None, &owner).await.unwrap();
        (project.id, owner)
    }

    #[tokio::test]
    async fn test_create_submission_starts_pending() {
        let pool = setup_test_pool().await;
        let (project_id, owner) = seed_project(&pool).await;

        let sub = create_submission(&pool, &project_id, &owner, "Fix", "code", Some("main.rs"))
            .await
            .unwrap();
        assert_eq!(sub.status, SubmissionStatus::Pending);
        assert_eq!(sub.file_name.as_deref(), Some("main.rs"));
    }

    #[tokio::test]
    async fn test_set_status() {
        let pool = setup_test_pool().await;
        let (project_id, owner) = seed_project(&pool).await;
        let sub = create_submission(&pool, &project_id, &owner, "Fix", "code", None)
            .await
            .unwrap();

        let updated = set_status(&pool, &sub.id, SubmissionStatus::InReview)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, SubmissionStatus::InReview);

        assert!(set_status(&pool, "missing", SubmissionStatus::Approved)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_submission_cascades() {
        let pool = setup_test_pool().await;
        let (project_id, owner) = seed_project(&pool).await;
        let sub = create_submission(&pool, &project_id, &owner, "Fix", "code", None)
            .await
            .unwrap();

        sqlx::query(
            "INSERT INTO comments (id, submission_id, reviewer_id, content, is_inline, created_at, updated_at)
             VALUES ('c1', ?, ?, 'note', 0, 0, 0)",
        )
        .bind(&sub.id)
        .bind(&owner)
        .execute(&pool)
        .await
        .unwrap();

        assert!(delete_submission(&pool, &sub.id).await.unwrap());

        let comments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(comments, 0);
    }
}
