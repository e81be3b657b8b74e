//! Comment repository

use sqlx::SqlitePool;

use crate::data::sqlite::SqliteError;
use crate::data::types::{CommentRow, CommentWithReviewer};

type CommentTuple = (
    String,
    String,
    String,
    String,
    Option<i64>,
    i64,
    i64,
    i64,
);

fn map_comment(row: CommentTuple) -> CommentRow {
    let (id, submission_id, reviewer_id, content, line_number, is_inline, created_at, updated_at) =
        row;
    CommentRow {
        id,
        submission_id,
        reviewer_id,
        content,
        line_number,
        is_inline: is_inline != 0,
        created_at,
        updated_at,
    }
}

const COMMENT_COLUMNS: &str =
    "id, submission_id, reviewer_id, content, line_number, is_inline, created_at, updated_at";

/// Add a comment. The comment is inline iff a line number is given.
pub async fn add_comment(
    pool: &SqlitePool,
    submission_id: &str,
    reviewer_id: &str,
    content: &str,
    line_number: Option<i64>,
) -> Result<CommentRow, SqliteError> {
    let id = cuid2::create_id();
    let now = chrono::Utc::now().timestamp();
    let is_inline = line_number.is_some();

    sqlx::query(
        "INSERT INTO comments
             (id, submission_id, reviewer_id, content, line_number, is_inline, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(submission_id)
    .bind(reviewer_id)
    .bind(content)
    .bind(line_number)
    .bind(is_inline)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(CommentRow {
        id,
        submission_id: submission_id.to_string(),
        reviewer_id: reviewer_id.to_string(),
        content: content.to_string(),
        line_number,
        is_inline,
        created_at: now,
        updated_at: now,
    })
}

/// Get a comment by ID
pub async fn get_comment(pool: &SqlitePool, id: &str) -> Result<Option<CommentRow>, SqliteError> {
    let row = sqlx::query_as::<_, CommentTuple>(&format!(
        "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(map_comment))
}

/// List comments for a submission, oldest first, joined with reviewer identity
pub async fn list_comments(
    pool: &SqlitePool,
    submission_id: &str,
) -> Result<Vec<CommentWithReviewer>, SqliteError> {
    type Joined = (
        String,
        String,
        String,
        String,
        Option<i64>,
        i64,
        i64,
        i64,
        String,
        String,
    );

    let rows = sqlx::query_as::<_, Joined>(
        "SELECT c.id, c.submission_id, c.reviewer_id, c.content, c.line_number, c.is_inline,
                c.created_at, c.updated_at, u.name, u.email
         FROM comments c
         JOIN users u ON c.reviewer_id = u.id
         WHERE c.submission_id = ?
         ORDER BY c.created_at ASC",
    )
    .bind(submission_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(a, b, c, d, e, f, g, h, reviewer_name, reviewer_email)| CommentWithReviewer {
            comment: map_comment((a, b, c, d, e, f, g, h)),
            reviewer_name,
            reviewer_email,
        })
        .collect())
}

/// Update a comment's content. Returns the updated row, or None if missing.
pub async fn update_comment(
    pool: &SqlitePool,
    id: &str,
    content: &str,
) -> Result<Option<CommentRow>, SqliteError> {
    let now = chrono::Utc::now().timestamp();

    let result = sqlx::query("UPDATE comments SET content = ?, updated_at = ? WHERE id = ?")
        .bind(content)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    get_comment(pool, id).await
}

/// Delete a comment
pub async fn delete_comment(pool: &SqlitePool, id: &str) -> Result<bool, SqliteError> {
    let result = sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::repositories::project::create_project;
    use crate::data::sqlite::repositories::submission::create_submission;
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

    async fn seed_submission(pool: &SqlitePool) -> (String, String) {
        let owner = create_user(pool, "o@example.com", "hash", "Owner", UserRole::Reviewer)
            .await
            .unwrap()
            .id;
        let project = create_project(pool, "Core", None, &owner).await.unwrap();
        let sub = create_submission(pool, &project.id, &owner, "Fix", "code", None)
            .await
            .unwrap();
        (sub.id, owner)
    }

    #[tokio::test]
    async fn test_inline_iff_line_number() {
        let pool = setup_test_pool().await;
        let (sub_id, reviewer) = seed_submission(&pool).await;

        let inline = add_comment(&pool, &sub_id, &reviewer, "tight loop", Some(12))
            .await
            .unwrap();
        assert!(inline.is_inline);
        assert_eq!(inline.line_number, Some(12));

        let general = add_comment(&pool, &sub_id, &reviewer, "overall fine", None)
            .await
            .unwrap();
        assert!(!general.is_inline);
        assert_eq!(general.line_number, None);
    }

    #[tokio::test]
    async fn test_list_comments_with_reviewer() {
        let pool = setup_test_pool().await;
        let (sub_id, reviewer) = seed_submission(&pool).await;
        add_comment(&pool, &sub_id, &reviewer, "first", None)
            .await
            .unwrap();
        add_comment(&pool, &sub_id, &reviewer, "second", None)
            .await
            .unwrap();

        let comments = list_comments(&pool, &sub_id).await.unwrap();
        assert_eq!(comments.len(), 2);
        let mut contents: Vec<_> = comments.iter().map(|c| c.comment.content.clone()).collect();
        contents.sort();
        assert_eq!(contents, vec!["first", "second"]);
        assert_eq!(comments[0].reviewer_email, "o@example.com");
    }

    #[tokio::test]
    async fn test_update_and_delete_comment() {
        let pool = setup_test_pool().await;
        let (sub_id, reviewer) = seed_submission(&pool).await;
        let comment = add_comment(&pool, &sub_id, &reviewer, "draft", None)
            .await
            .unwrap();

        let updated = update_comment(&pool, &comment.id, "final")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.content, "final");

        assert!(delete_comment(&pool, &comment.id).await.unwrap());
        assert!(get_comment(&pool, &comment.id).await.unwrap().is_none());
    }
}
