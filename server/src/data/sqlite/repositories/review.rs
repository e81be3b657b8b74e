//! Review history repository (append-only)

use sqlx::SqlitePool;

use crate::data::sqlite::SqliteError;
use crate::data::types::ReviewWithReviewer;

/// List review history for a submission, newest first, joined with reviewer
/// identity. History rows are written by the workflow engine inside its
/// transaction; this module only reads.
pub async fn list_reviews(
    pool: &SqlitePool,
    submission_id: &str,
) -> Result<Vec<ReviewWithReviewer>, SqliteError> {
    type Joined = (
        String,
        String,
        String,
        String,
        Option<String>,
        i64,
        String,
        String,
    );

    let rows = sqlx::query_as::<_, Joined>(
        "SELECT rh.id, rh.submission_id, rh.reviewer_id, rh.action, rh.notes, rh.created_at,
                u.name, u.email
         FROM review_history rh
         JOIN users u ON rh.reviewer_id = u.id
         WHERE rh.submission_id = ?
         ORDER BY rh.created_at DESC, rh.id DESC",
    )
    .bind(submission_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(
            |(id, submission_id, reviewer_id, action, notes, created_at, name, email)| {
                ReviewWithReviewer {
                    review: crate::data::types::ReviewHistoryRow {
                        id,
                        submission_id,
                        reviewer_id,
                        action,
                        notes,
                        created_at,
                    },
                    reviewer_name: name,
                    reviewer_email: email,
                }
            },
        )
        .collect())
}
