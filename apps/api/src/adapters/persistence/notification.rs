use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::notification::{
        NewNotification, NotificationProfile, NotificationRepoTrait,
    },
    domain::entities::notification::{NotificationKind, Recipient},
};

fn row_to_profile(row: sqlx::postgres::PgRow) -> NotificationProfile {
    let recipient: String = row.get("recipient");
    let metadata: Option<serde_json::Value> = row.get("metadata");
    NotificationProfile {
        id: row.get("id"),
        recipient: Recipient::from_db_value(&recipient),
        message: row.get("message"),
        kind: NotificationKind::from_str(row.get("kind")),
        read: row.get("read"),
        metadata: metadata.unwrap_or_default(),
        created_at: row.get("created_at"),
    }
}

fn recipient_values(recipients: &[Recipient]) -> Vec<String> {
    recipients.iter().map(Recipient::to_db_value).collect()
}

#[async_trait]
impl NotificationRepoTrait for PostgresPersistence {
    async fn create(&self, notification: &NewNotification) -> AppResult<NotificationProfile> {
        let metadata = (!notification.metadata.is_null()).then(|| notification.metadata.clone());
        let row = sqlx::query(
            r#"
                INSERT INTO notifications (id, recipient, message, kind, metadata)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, recipient, message, kind, read, metadata, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(notification.recipient.to_db_value())
        .bind(&notification.message)
        .bind(notification.kind.as_str())
        .bind(metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_profile(row))
    }

    async fn list_unread(
        &self,
        recipients: &[Recipient],
        limit: i64,
    ) -> AppResult<Vec<NotificationProfile>> {
        let rows = sqlx::query(
            r#"
                SELECT id, recipient, message, kind, read, metadata, created_at
                FROM notifications
                WHERE read = false AND recipient = ANY($1)
                ORDER BY created_at DESC
                LIMIT $2
            "#,
        )
        .bind(recipient_values(recipients))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.into_iter().map(row_to_profile).collect())
    }

    async fn mark_read(&self, id: Uuid, recipients: &[Recipient]) -> AppResult<bool> {
        let result =
            sqlx::query("UPDATE notifications SET read = true WHERE id = $1 AND recipient = ANY($2)")
                .bind(id)
                .bind(recipient_values(recipients))
                .execute(&self.pool)
                .await
                .map_err(AppError::from)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM notifications")
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected())
    }
}
