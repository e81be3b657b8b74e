//! Notification repository

use sqlx::SqlitePool;

use crate::data::sqlite::SqliteError;
use crate::data::types::NotificationRow;

type NotificationTuple = (
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    i64,
    i64,
);

fn map_notification(row: NotificationTuple) -> NotificationRow {
    let (id, user_id, kind, title, message, related_entity_type, related_entity_id, is_read, created_at) =
        row;
    NotificationRow {
        id,
        user_id,
        kind,
        title,
        message,
        related_entity_type,
        related_entity_id,
        is_read: is_read != 0,
        created_at,
    }
}

const NOTIFICATION_COLUMNS: &str = "id, user_id, type, title, message, related_entity_type, related_entity_id, is_read, created_at";

/// Create a notification row addressed to one recipient
pub async fn create_notification(
    pool: &SqlitePool,
    user_id: &str,
    kind: &str,
    title: &str,
    message: &str,
    related: Option<(&str, &str)>,
) -> Result<NotificationRow, SqliteError> {
    let id = cuid2::create_id();
    let now = chrono::Utc::now().timestamp();
    let (related_type, related_id) = match related {
        Some((t, i)) => (Some(t), Some(i)),
        None => (None, None),
    };

    sqlx::query(
        "INSERT INTO notifications
             (id, user_id, type, title, message, related_entity_type, related_entity_id, is_read, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)",
    )
    .bind(&id)
    .bind(user_id)
    .bind(kind)
    .bind(title)
    .bind(message)
    .bind(related_type)
    .bind(related_id)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(NotificationRow {
        id,
        user_id: user_id.to_string(),
        kind: kind.to_string(),
        title: title.to_string(),
        message: message.to_string(),
        related_entity_type: related_type.map(str::to_string),
        related_entity_id: related_id.map(str::to_string),
        is_read: false,
        created_at: now,
    })
}

/// List notifications for a user, newest first, with a total count
pub async fn list_notifications(
    pool: &SqlitePool,
    user_id: &str,
    unread_only: bool,
    limit: u32,
    offset: u32,
) -> Result<(Vec<NotificationRow>, u64), SqliteError> {
    let filter = if unread_only { "AND is_read = 0" } else { "" };

    let rows = sqlx::query_as::<_, NotificationTuple>(&format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications
         WHERE user_id = ? {filter}
         ORDER BY created_at DESC
         LIMIT ? OFFSET ?"
    ))
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ? {filter}"
    ))
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok((
        rows.into_iter().map(map_notification).collect(),
        total as u64,
    ))
}

/// Flip a notification's is_read flag, scoped to the recipient. Returns the
/// updated row, or None when the id is unknown or owned by someone else.
pub async fn mark_read(
    pool: &SqlitePool,
    id: &str,
    user_id: &str,
) -> Result<Option<NotificationRow>, SqliteError> {
    let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    let row = sqlx::query_as::<_, NotificationTuple>(&format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(map_notification))
}

#[cfg(test)]
mod tests {
    use super::*;
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

    async fn seed_user(pool: &SqlitePool, email: &str) -> String {
        create_user(pool, email, "hash", "User", UserRole::Submitter)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let pool = setup_test_pool().await;
        let user = seed_user(&pool, "u@example.com").await;

        create_notification(
            &pool,
            &user,
            "submission_approved",
            "Submission Approved",
            "Your submission has been approved by a reviewer",
            Some(("submission", "s1")),
        )
        .await
        .unwrap();

        let (rows, total) = list_notifications(&pool, &user, false, 50, 0).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].kind, "submission_approved");
        assert_eq!(rows[0].related_entity_id.as_deref(), Some("s1"));
        assert!(!rows[0].is_read);
    }

    #[tokio::test]
    async fn test_unread_filter_and_mark_read() {
        let pool = setup_test_pool().await;
        let user = seed_user(&pool, "u@example.com").await;

        let n = create_notification(&pool, &user, "t", "T", "m", None)
            .await
            .unwrap();
        create_notification(&pool, &user, "t", "T", "m2", None)
            .await
            .unwrap();

        let marked = mark_read(&pool, &n.id, &user).await.unwrap().unwrap();
        assert!(marked.is_read);

        let (unread, total) = list_notifications(&pool, &user, true, 50, 0).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(unread.len(), 1);
    }

    #[tokio::test]
    async fn test_mark_read_scoped_to_recipient() {
        let pool = setup_test_pool().await;
        let user = seed_user(&pool, "u@example.com").await;
        let other = seed_user(&pool, "o@example.com").await;

        let n = create_notification(&pool, &user, "t", "T", "m", None)
            .await
            .unwrap();

        // Someone else's id does not match, behaves as not found
        assert!(mark_read(&pool, &n.id, &other).await.unwrap().is_none());
    }
}
