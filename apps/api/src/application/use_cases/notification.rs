use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::instrument;
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::application::use_cases::user::Principal;
use crate::domain::entities::notification::{NotificationKind, Recipient};
use crate::domain::entities::user::Role;

/// Newest-first page size for the unread list.
pub const UNREAD_LIMIT: i64 = 10;
const MAX_MESSAGE_LEN: usize = 500;

#[derive(Debug, Clone)]
pub struct NotificationProfile {
    pub id: Uuid,
    pub recipient: Recipient,
    pub message: String,
    pub kind: NotificationKind,
    pub read: bool,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient: Recipient,
    pub message: String,
    pub kind: NotificationKind,
    pub metadata: Value,
}

#[async_trait]
pub trait NotificationRepoTrait: Send + Sync {
    async fn create(&self, notification: &NewNotification) -> AppResult<NotificationProfile>;
    async fn list_unread(
        &self,
        recipients: &[Recipient],
        limit: i64,
    ) -> AppResult<Vec<NotificationProfile>>;
    /// Returns false when no notification with this id is addressed to `recipients`.
    async fn mark_read(&self, id: Uuid, recipients: &[Recipient]) -> AppResult<bool>;
    async fn delete_all(&self) -> AppResult<u64>;
}

#[derive(Clone)]
pub struct NotificationUseCases {
    repo: Arc<dyn NotificationRepoTrait>,
}

impl NotificationUseCases {
    pub fn new(repo: Arc<dyn NotificationRepoTrait>) -> Self {
        Self { repo }
    }

    #[instrument(skip(self))]
    pub async fn list_unread(&self, principal: &Principal) -> AppResult<Vec<NotificationProfile>> {
        self.repo
            .list_unread(&recipients_for(principal), UNREAD_LIMIT)
            .await
    }

    #[instrument(skip(self, message))]
    pub async fn create_for_self(
        &self,
        principal: &Principal,
        message: &str,
        kind: Option<NotificationKind>,
    ) -> AppResult<NotificationProfile> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::InvalidInput("Message is required".into()));
        }
        if message.chars().count() > MAX_MESSAGE_LEN {
            return Err(AppError::InvalidInput(format!(
                "Message must be at most {MAX_MESSAGE_LEN} characters"
            )));
        }

        self.repo
            .create(&NewNotification {
                recipient: Recipient::User(principal.user_id),
                message: message.to_string(),
                kind: kind.unwrap_or(NotificationKind::Info),
                metadata: Value::Null,
            })
            .await
    }

    #[instrument(skip(self))]
    pub async fn mark_read(&self, principal: &Principal, id: Uuid) -> AppResult<()> {
        if self.repo.mark_read(id, &recipients_for(principal)).await? {
            Ok(())
        } else {
            Err(AppError::NotFound)
        }
    }

    #[instrument(skip(self))]
    pub async fn clear_all(&self, principal: &Principal) -> AppResult<u64> {
        principal.require(Role::Admin)?;
        let deleted = self.repo.delete_all().await?;
        tracing::info!(deleted, "Cleared all notifications");
        Ok(deleted)
    }
}

/// Admins also read what is addressed to the administrative recipient.
fn recipients_for(principal: &Principal) -> Vec<Recipient> {
    let mut recipients = vec![Recipient::User(principal.user_id)];
    if principal.is_admin() {
        recipients.push(Recipient::Admins);
    }
    recipients
}
