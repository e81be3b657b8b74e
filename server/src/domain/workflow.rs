//! Review workflow engine
//!
//! A review verdict mutates three tables as one unit: the submission's
//! status, an append-only history entry, and a durable notification for the
//! submitter. All three ride a single transaction; an uncommitted transaction
//! rolls back on drop, so an early return leaves no partial writes. The live
//! push happens only after commit.
//!
//! Transitions are permissive: any state can move to any state, and history
//! preserves the full sequence of verdicts. Re-review after changes is the
//! normal path, not an exception.

use std::sync::Arc;

use sqlx::SqlitePool;
use thiserror::Error;

use crate::core::constants::{NOTIFY_CHANGES_REQUESTED, NOTIFY_SUBMISSION_APPROVED};
use crate::data::sqlite::repositories::submission;
use crate::data::sqlite::SqliteError;
use crate::data::types::{ReviewAction, SubmissionRow, SubmissionStatus};
use crate::domain::realtime::Notifier;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Submission not found")]
    NotFound,
    #[error("review transaction failed: {0}")]
    Transaction(#[from] sqlx::Error),
    #[error(transparent)]
    Store(#[from] SqliteError),
}

/// The two verdicts a reviewer can record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Approve,
    RequestChanges,
}

impl Verdict {
    fn status(self) -> SubmissionStatus {
        match self {
            Self::Approve => SubmissionStatus::Approved,
            Self::RequestChanges => SubmissionStatus::ChangesRequested,
        }
    }

    fn action(self) -> ReviewAction {
        match self {
            Self::Approve => ReviewAction::Approved,
            Self::RequestChanges => ReviewAction::ChangesRequested,
        }
    }

    fn notification(self) -> (&'static str, &'static str, &'static str) {
        match self {
            Self::Approve => (
                NOTIFY_SUBMISSION_APPROVED,
                "Submission Approved",
                "Your submission has been approved by a reviewer",
            ),
            Self::RequestChanges => (
                NOTIFY_CHANGES_REQUESTED,
                "Changes Requested",
                "A reviewer has requested changes to your submission",
            ),
        }
    }
}

pub struct ReviewWorkflow {
    pool: SqlitePool,
    notifier: Arc<Notifier>,
}

impl ReviewWorkflow {
    pub fn new(pool: SqlitePool, notifier: Arc<Notifier>) -> Self {
        Self { pool, notifier }
    }

    pub async fn approve(
        &self,
        submission_id: &str,
        reviewer_id: &str,
        notes: Option<&str>,
    ) -> Result<SubmissionRow, WorkflowError> {
        self.record_verdict(submission_id, reviewer_id, notes, Verdict::Approve)
            .await
    }

    pub async fn request_changes(
        &self,
        submission_id: &str,
        reviewer_id: &str,
        notes: Option<&str>,
    ) -> Result<SubmissionRow, WorkflowError> {
        self.record_verdict(submission_id, reviewer_id, notes, Verdict::RequestChanges)
            .await
    }

    /// Manual status change outside the review workflow (e.g. marking a
    /// submission `in_review` when a reviewer picks it up). Writes no history
    /// and sends no notification.
    pub async fn set_status(
        &self,
        submission_id: &str,
        status: SubmissionStatus,
    ) -> Result<SubmissionRow, WorkflowError> {
        submission::set_status(&self.pool, submission_id, status)
            .await?
            .ok_or(WorkflowError::NotFound)
    }

    async fn record_verdict(
        &self,
        submission_id: &str,
        reviewer_id: &str,
        notes: Option<&str>,
        verdict: Verdict,
    ) -> Result<SubmissionRow, WorkflowError> {
        let status = verdict.status();
        let now = chrono::Utc::now().timestamp();

        let mut tx = self.pool.begin().await?;

        // The full row is read under the same transaction that mutates it, so
        // the returned submission always matches the committed state
        type Locked = (String, String, String, String, String, Option<String>, i64);
        let sub = sqlx::query_as::<_, Locked>(
            "SELECT id, project_id, submitter_id, title, code_content, file_name, created_at
             FROM submissions WHERE id = ?",
        )
        .bind(submission_id)
        .fetch_optional(&mut *tx)
        .await?
        .map(
            |(id, project_id, submitter_id, title, code_content, file_name, created_at)| {
                SubmissionRow {
                    id,
                    project_id,
                    submitter_id,
                    title,
                    code_content,
                    file_name,
                    status,
                    created_at,
                    updated_at: now,
                }
            },
        )
        .ok_or(WorkflowError::NotFound)?;

        sqlx::query("UPDATE submissions SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(now)
            .bind(submission_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO review_history (id, submission_id, reviewer_id, action, notes, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(cuid2::create_id())
        .bind(submission_id)
        .bind(reviewer_id)
        .bind(verdict.action().as_str())
        .bind(notes)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let (kind, title, message) = verdict.notification();
        let notification_id = cuid2::create_id();
        sqlx::query(
            "INSERT INTO notifications
                 (id, user_id, type, title, message, related_entity_type, related_entity_id, is_read, created_at)
             VALUES (?, ?, ?, ?, ?, 'submission', ?, 0, ?)",
        )
        .bind(&notification_id)
        .bind(&sub.submitter_id)
        .bind(kind)
        .bind(title)
        .bind(message)
        .bind(submission_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            submission_id,
            reviewer_id,
            status = %status,
            "Review verdict recorded"
        );

        // Live push is deliberately outside the transaction: the verdict is
        // durable, delivery is best-effort
        self.notifier.push_live(&crate::data::types::NotificationRow {
            id: notification_id,
            user_id: sub.submitter_id.clone(),
            kind: kind.to_string(),
            title: title.to_string(),
            message: message.to_string(),
            related_entity_type: Some("submission".to_string()),
            related_entity_id: Some(submission_id.to_string()),
            is_read: false,
            created_at: now,
        });

        Ok(sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::data::sqlite::repositories::project::create_project;
    use crate::data::sqlite::repositories::submission::create_submission;
    use crate::data::sqlite::repositories::user::create_user;
    use crate::data::types::UserRole;
    use crate::domain::realtime::{ConnectionEvent, ConnectionRegistry};

    async fn setup_test_pool() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        sqlx::query(crate::data::sqlite::schema::SCHEMA)
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    struct Fixture {
        pool: SqlitePool,
        workflow: ReviewWorkflow,
        registry: Arc<ConnectionRegistry>,
        submitter: String,
        reviewer: String,
        submission_id: String,
    }

    async fn fixture() -> Fixture {
        let pool = setup_test_pool().await;
        let owner = create_user(&pool, "o@example.com", "hash", "Owner", UserRole::Submitter)
            .await
            .unwrap()
            .id;
        let submitter = create_user(&pool, "s@example.com", "hash", "Sub", UserRole::Submitter)
            .await
            .unwrap()
            .id;
        let reviewer = create_user(&pool, "r@example.com", "hash", "Rev", UserRole::Reviewer)
            .await
            .unwrap()
            .id;
        let project = create_project(&pool, "Core", None, &owner).await.unwrap();
        let sub = create_submission(&pool, &project.id, &submitter, "Fix", "fn main() {}", None)
            .await
            .unwrap();

        let registry = Arc::new(ConnectionRegistry::new(Duration::from_secs(30)));
        let notifier = Arc::new(Notifier::new(pool.clone(), Arc::clone(&registry)));
        let workflow = ReviewWorkflow::new(pool.clone(), notifier);

        Fixture {
            pool,
            workflow,
            registry,
            submitter,
            reviewer,
            submission_id: sub.id,
        }
    }

    async fn history_rows(pool: &SqlitePool, submission_id: &str) -> Vec<(String, Option<String>)> {
        sqlx::query_as("SELECT action, notes FROM review_history WHERE submission_id = ?")
            .bind(submission_id)
            .fetch_all(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_approve_writes_status_history_and_notification() {
        let f = fixture().await;

        let updated = f
            .workflow
            .approve(&f.submission_id, &f.reviewer, Some("LGTM"))
            .await
            .unwrap();
        assert_eq!(updated.status, SubmissionStatus::Approved);
        assert_eq!(updated.code_content, "fn main() {}");

        let history = history_rows(&f.pool, &f.submission_id).await;
        assert_eq!(history, vec![("approved".to_string(), Some("LGTM".to_string()))]);

        let (user_id, kind, related): (String, String, Option<String>) = sqlx::query_as(
            "SELECT user_id, type, related_entity_id FROM notifications",
        )
        .fetch_one(&f.pool)
        .await
        .unwrap();
        assert_eq!(user_id, f.submitter);
        assert_eq!(kind, "submission_approved");
        assert_eq!(related.as_deref(), Some(f.submission_id.as_str()));
    }

    #[tokio::test]
    async fn test_request_changes_notifies_submitter_live() {
        let f = fixture().await;
        let (_id, mut rx) = f.registry.register(&f.submitter);

        let updated = f
            .workflow
            .request_changes(&f.submission_id, &f.reviewer, None)
            .await
            .unwrap();
        assert_eq!(updated.status, SubmissionStatus::ChangesRequested);
        // The row comes from the verdict transaction itself, never a refetch
        assert_eq!(updated.code_content, "fn main() {}");

        let ConnectionEvent::Deliver(frame) = rx.try_recv().unwrap() else {
            panic!("expected a frame");
        };
        let parsed: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(parsed["type"], "notification");
        assert_eq!(parsed["data"]["type"], "changes_requested");
        assert_eq!(
            parsed["data"]["related_entity_id"],
            f.submission_id.as_str()
        );
    }

    #[tokio::test]
    async fn test_re_review_after_changes_requested() {
        let f = fixture().await;

        f.workflow
            .request_changes(&f.submission_id, &f.reviewer, Some("fix naming"))
            .await
            .unwrap();
        let updated = f
            .workflow
            .approve(&f.submission_id, &f.reviewer, None)
            .await
            .unwrap();
        assert_eq!(updated.status, SubmissionStatus::Approved);

        // Both verdicts survive in history
        let history = history_rows(&f.pool, &f.submission_id).await;
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_submission_leaves_no_partial_writes() {
        let f = fixture().await;

        let err = f
            .workflow
            .approve("missing", &f.reviewer, None)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound));

        let history: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM review_history")
            .fetch_one(&f.pool)
            .await
            .unwrap();
        let notifications: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notifications")
            .fetch_one(&f.pool)
            .await
            .unwrap();
        assert_eq!(history, 0);
        assert_eq!(notifications, 0);
    }

    #[tokio::test]
    async fn test_set_status_writes_no_history() {
        let f = fixture().await;

        let updated = f
            .workflow
            .set_status(&f.submission_id, SubmissionStatus::InReview)
            .await
            .unwrap();
        assert_eq!(updated.status, SubmissionStatus::InReview);

        assert!(history_rows(&f.pool, &f.submission_id).await.is_empty());

        let err = f
            .workflow
            .set_status("missing", SubmissionStatus::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound));
    }
}
