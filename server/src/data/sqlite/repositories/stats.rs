//! Project statistics
//!
//! Aggregates are computed on demand from the live tables. Review turnaround
//! measures submission creation to the first recorded verdict.

use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::SqlitePool;

use crate::data::sqlite::SqliteError;

#[derive(Debug, Default, Serialize)]
pub struct StatusCounts {
    pub pending: i64,
    pub in_review: i64,
    pub approved: i64,
    pub changes_requested: i64,
}

#[derive(Debug, Serialize)]
pub struct ReviewerActivity {
    pub reviewer_id: String,
    pub name: String,
    pub reviews: i64,
    pub comments: i64,
}

#[derive(Debug, Serialize)]
pub struct MostCommented {
    pub submission_id: String,
    pub title: String,
    pub comments: i64,
}

#[derive(Debug, Serialize)]
pub struct ProjectStats {
    pub total_submissions: i64,
    pub status_counts: StatusCounts,
    /// Share of submissions currently approved, 0.0 when the project is empty
    pub approval_rate: f64,
    /// Share of submissions currently in changes_requested
    pub rejection_rate: f64,
    /// Average hours from submission to first verdict, None if nothing has
    /// been reviewed yet
    pub avg_review_hours: Option<f64>,
    pub total_comments: i64,
    pub reviewer_activity: Vec<ReviewerActivity>,
    pub most_commented: Option<MostCommented>,
}

pub async fn project_stats(
    pool: &SqlitePool,
    project_id: &str,
) -> Result<ProjectStats, SqliteError> {
    let mut counts = StatusCounts::default();
    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT status, COUNT(*) FROM submissions WHERE project_id = ? GROUP BY status",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;
    for (status, count) in rows {
        match status.as_str() {
            "pending" => counts.pending = count,
            "in_review" => counts.in_review = count,
            "approved" => counts.approved = count,
            "changes_requested" => counts.changes_requested = count,
            other => {
                return Err(SqliteError::CorruptRow(format!(
                    "unexpected submissions.status '{other}'"
                )))
            }
        }
    }
    let total =
        counts.pending + counts.in_review + counts.approved + counts.changes_requested;

    let total_comments: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM comments c
         JOIN submissions s ON c.submission_id = s.id
         WHERE s.project_id = ?",
    )
    .bind(project_id)
    .fetch_one(pool)
    .await?;

    let avg_review_hours: Option<f64> = sqlx::query_scalar(
        "SELECT AVG((first_verdict - s.created_at) / 3600.0)
         FROM submissions s
         JOIN (SELECT submission_id, MIN(created_at) AS first_verdict
               FROM review_history GROUP BY submission_id) rh
           ON rh.submission_id = s.id
         WHERE s.project_id = ?",
    )
    .bind(project_id)
    .fetch_one(pool)
    .await?;

    let reviewer_activity = reviewer_activity(pool, project_id).await?;

    let most_commented = sqlx::query_as::<_, (String, String, i64)>(
        "SELECT s.id, s.title, COUNT(c.id) AS n
         FROM submissions s
         JOIN comments c ON c.submission_id = s.id
         WHERE s.project_id = ?
         GROUP BY s.id, s.title
         ORDER BY n DESC, s.id
         LIMIT 1",
    )
    .bind(project_id)
    .fetch_optional(pool)
    .await?
    .map(|(submission_id, title, comments)| MostCommented {
        submission_id,
        title,
        comments,
    });

    Ok(ProjectStats {
        total_submissions: total,
        approval_rate: rate(counts.approved, total),
        rejection_rate: rate(counts.changes_requested, total),
        status_counts: counts,
        avg_review_hours,
        total_comments,
        reviewer_activity,
        most_commented,
    })
}

fn rate(part: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

async fn reviewer_activity(
    pool: &SqlitePool,
    project_id: &str,
) -> Result<Vec<ReviewerActivity>, SqliteError> {
    let mut by_reviewer: BTreeMap<String, ReviewerActivity> = BTreeMap::new();

    let reviews = sqlx::query_as::<_, (String, String, i64)>(
        "SELECT rh.reviewer_id, u.name, COUNT(*)
         FROM review_history rh
         JOIN submissions s ON rh.submission_id = s.id
         JOIN users u ON rh.reviewer_id = u.id
         WHERE s.project_id = ?
         GROUP BY rh.reviewer_id, u.name",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;
    for (reviewer_id, name, n) in reviews {
        by_reviewer.insert(
            reviewer_id.clone(),
            ReviewerActivity {
                reviewer_id,
                name,
                reviews: n,
                comments: 0,
            },
        );
    }

    let comments = sqlx::query_as::<_, (String, String, i64)>(
        "SELECT c.reviewer_id, u.name, COUNT(*)
         FROM comments c
         JOIN submissions s ON c.submission_id = s.id
         JOIN users u ON c.reviewer_id = u.id
         WHERE s.project_id = ?
         GROUP BY c.reviewer_id, u.name",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;
    for (reviewer_id, name, n) in comments {
        by_reviewer
            .entry(reviewer_id.clone())
            .or_insert_with(|| ReviewerActivity {
                reviewer_id,
                name,
                reviews: 0,
                comments: 0,
            })
            .comments = n;
    }

    Ok(by_reviewer.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::repositories::comment::add_comment;
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

    #[tokio::test]
    async fn test_empty_project_stats() {
        let pool = setup_test_pool().await;
        let owner = create_user(&pool, "o@example.com", "hash", "O", UserRole::Submitter)
            .await
            .unwrap()
            .id;
        let project = create_project(&pool, "Core", None, &owner).await.unwrap();

        let stats = project_stats(&pool, &project.id).await.unwrap();
        assert_eq!(stats.total_submissions, 0);
        assert_eq!(stats.approval_rate, 0.0);
        assert!(stats.avg_review_hours.is_none());
        assert!(stats.most_commented.is_none());
        assert!(stats.reviewer_activity.is_empty());
    }

    #[tokio::test]
    async fn test_stats_aggregation() {
        let pool = setup_test_pool().await;
        let owner = create_user(&pool, "o@example.com", "hash", "O", UserRole::Submitter)
            .await
            .unwrap()
            .id;
        let reviewer = create_user(&pool, "r@example.com", "hash", "Rev", UserRole::Reviewer)
            .await
            .unwrap()
            .id;
        let project = create_project(&pool, "Core", None, &owner).await.unwrap();

        let s1 = create_submission(&pool, &project.id, &owner, "A", "code", None)
            .await
            .unwrap();
        let s2 = create_submission(&pool, &project.id, &owner, "B", "code", None)
            .await
            .unwrap();

        // One approved verdict an hour after creation
        sqlx::query("UPDATE submissions SET status = 'approved' WHERE id = ?")
            .bind(&s1.id)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO review_history (id, submission_id, reviewer_id, action, notes, created_at)
             VALUES ('rh1', ?, ?, 'approved', NULL, ?)",
        )
        .bind(&s1.id)
        .bind(&reviewer)
        .bind(s1.created_at + 3600)
        .execute(&pool)
        .await
        .unwrap();

        add_comment(&pool, &s2.id, &reviewer, "needs tests", Some(3))
            .await
            .unwrap();
        add_comment(&pool, &s2.id, &reviewer, "nit", None).await.unwrap();

        let stats = project_stats(&pool, &project.id).await.unwrap();
        assert_eq!(stats.total_submissions, 2);
        assert_eq!(stats.status_counts.approved, 1);
        assert_eq!(stats.status_counts.pending, 1);
        assert_eq!(stats.approval_rate, 0.5);
        assert_eq!(stats.rejection_rate, 0.0);
        assert_eq!(stats.avg_review_hours, Some(1.0));
        assert_eq!(stats.total_comments, 2);

        let most = stats.most_commented.unwrap();
        assert_eq!(most.submission_id, s2.id);
        assert_eq!(most.comments, 2);

        assert_eq!(stats.reviewer_activity.len(), 1);
        assert_eq!(stats.reviewer_activity[0].reviews, 1);
        assert_eq!(stats.reviewer_activity[0].comments, 2);
    }
}
