//! Real-time delivery
//!
//! The registry tracks live connections; the notifier pairs durable
//! notification rows with best-effort live frames. A notification is always
//! written to the store first, so offline recipients see it on their next
//! poll even when no frame could be delivered.

pub mod registry;

pub use registry::{ConnectionEvent, ConnectionRegistry};

use std::sync::Arc;

use serde_json::json;
use sqlx::SqlitePool;

use crate::data::sqlite::repositories::{membership, notification};
use crate::data::sqlite::SqliteError;
use crate::data::types::NotificationRow;

/// Durable-first notification delivery
pub struct Notifier {
    pool: SqlitePool,
    registry: Arc<ConnectionRegistry>,
}

impl Notifier {
    pub fn new(pool: SqlitePool, registry: Arc<ConnectionRegistry>) -> Self {
        Self { pool, registry }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Push an already-persisted notification to the recipient's live
    /// connections. Fire-and-forget.
    pub fn push_live(&self, row: &NotificationRow) {
        let frame = json!({
            "type": "notification",
            "data": {
                "id": row.id,
                "type": row.kind,
                "title": row.title,
                "message": row.message,
                "related_entity_type": row.related_entity_type,
                "related_entity_id": row.related_entity_id,
                "created_at": row.created_at,
            },
        });
        self.registry.send_to_user(&row.user_id, &frame.to_string());
    }

    /// Persist a notification and push it live
    pub async fn notify_user(
        &self,
        user_id: &str,
        kind: &str,
        title: &str,
        message: &str,
        related: Option<(&str, &str)>,
    ) -> Result<NotificationRow, SqliteError> {
        let row =
            notification::create_notification(&self.pool, user_id, kind, title, message, related)
                .await?;
        self.push_live(&row);
        Ok(row)
    }

    /// Send an ephemeral event frame to everyone with access to a project
    /// (owner and members, deduplicated). The recipient set is recomputed on
    /// every call so membership changes take effect immediately. Nothing is
    /// persisted.
    pub async fn broadcast_to_project(
        &self,
        project_id: &str,
        kind: &str,
        data: serde_json::Value,
    ) -> Result<(), SqliteError> {
        let recipients = membership::list_recipient_user_ids(&self.pool, project_id).await?;
        let frame = json!({ "type": kind, "data": data }).to_string();
        for user_id in &recipients {
            self.registry.send_to_user(user_id, &frame);
        }
        tracing::debug!(
            project_id,
            kind,
            recipients = recipients.len(),
            "Broadcast project event"
        );
        Ok(())
    }
}
